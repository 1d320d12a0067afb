// src/main.rs

use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use task_tracker::app_state::AppState;
use task_tracker::config::Config;
use task_tracker::db::MongoDB;
use task_tracker::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let mongodb = Arc::new(MongoDB::init(&config.mongo_uri, &config.database_name).await);
    mongodb
        .ensure_indexes()
        .await
        .expect("Failed to create the unique email index");

    let frontend_origin = env::var("FRONTEND_ORIGIN")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("Server running at http://{}", config.bind_addr);
    println!("Allowed CORS Origin: {}", frontend_origin);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
            }))
            .configure(routes)
            .service(web::scope("/api").configure(routes))
    })
    .bind(bind_addr)?
    .run()
    .await
}
