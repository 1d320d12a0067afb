// src/users.rs
//
// User CRUD. Email uniqueness is the store's unique index; deleting a user
// deliberately leaves any tasks still pointing at it untouched.

use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;

use crate::app_state::AppState;
use crate::models::{User, UserPayload};
use crate::query::{self, ListOutcome, ListParams};
use crate::response::{self, entity_document, ApiError};

const USER_NOT_FOUND: &str = "user not found";

/// GET /users — list with where/sort/select/skip/limit/count.
pub async fn list_users(
    data: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let list_query = query::translate(&params, User::FIELDS)?;
    let collection = data.mongodb.db.collection::<Document>("users");
    match query::execute(&collection, list_query).await? {
        ListOutcome::Documents(users) => Ok(response::ok("OK", users)),
        ListOutcome::Count(total) => Ok(response::ok("OK", total)),
    }
}

/// POST /users — create. A duplicate email violates the unique index and
/// surfaces as a store failure.
pub async fn create_user(
    data: web::Data<AppState>,
    payload: web::Json<UserPayload>,
) -> Result<HttpResponse, ApiError> {
    let mut user = payload.into_inner().into_user()?;

    let collection = data.mongodb.db.collection::<User>("users");
    let inserted = collection.insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    info!("user created: {:?}", user.id);
    Ok(response::created(
        "user created successfully",
        entity_document(&user)?,
    ))
}

/// GET /users/{id} — fetch one user.
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_oid = query::parse_object_id(&path, USER_NOT_FOUND)?;

    let collection = data.mongodb.db.collection::<User>("users");
    match collection.find_one(doc! { "_id": user_oid }).await? {
        Some(user) => Ok(response::ok("OK", entity_document(&user)?)),
        None => Err(ApiError::NotFound(USER_NOT_FOUND)),
    }
}

/// PUT /users/{id} — partial merge: only supplied fields are written,
/// unlike the full-replace semantics on tasks.
pub async fn update_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UserPayload>,
) -> Result<HttpResponse, ApiError> {
    let user_oid = query::parse_object_id(&path, USER_NOT_FOUND)?;
    let set = payload.set_document()?;

    let collection = data.mongodb.db.collection::<User>("users");
    let updated = collection
        .find_one_and_update(doc! { "_id": user_oid }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;

    info!("user updated: {}", user_oid);
    Ok(response::ok(
        "user updated successfully",
        entity_document(&updated)?,
    ))
}

/// DELETE /users/{id} — unconditional. Tasks still assigned to this user
/// keep their `assignedUser` reference; nothing cascades.
pub async fn delete_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_oid = query::parse_object_id(&path, USER_NOT_FOUND)?;

    let collection = data.mongodb.db.collection::<User>("users");
    let deleted = collection
        .find_one_and_delete(doc! { "_id": user_oid })
        .await?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;

    info!("user deleted: {}", user_oid);
    Ok(response::ok(
        "user deleted successfully",
        entity_document(&deleted)?,
    ))
}
