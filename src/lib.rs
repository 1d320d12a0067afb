// src/lib.rs

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod query;
pub mod response;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::tasks::{create_task, delete_task, get_task, list_tasks, replace_task};
use crate::users::{create_user, delete_user, get_user, list_users, update_user};

/// Registers the task and user resources. `main` mounts this twice, once at
/// the root and once under `/api`, so both path styles serve the same routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(replace_task))
            .route("/{id}", web::delete().to(delete_task)),
    )
    .service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}
