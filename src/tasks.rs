// src/tasks.rs
//
// Task CRUD, plus the upkeep of the inverse relationship on users: every
// mutation that touches `assignedUser` also repairs the matching
// `pendingTasks` entry and the cached `assignedUserName`. Only the initial
// insert is transaction-scoped; the follow-up user writes are best-effort.

use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

use crate::app_state::AppState;
use crate::models::{Task, TaskPayload, User};
use crate::query::{self, ListOutcome, ListParams, SelectParams};
use crate::response::{self, entity_document, with_string_id, ApiError};

const TASK_NOT_FOUND: &str = "task not found";

/// GET /tasks — list with where/sort/select/skip/limit/count.
pub async fn list_tasks(
    data: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let list_query = query::translate(&params, Task::FIELDS)?;
    let collection = data.mongodb.db.collection::<Document>("tasks");
    match query::execute(&collection, list_query).await? {
        ListOutcome::Documents(tasks) => Ok(response::ok("OK", tasks)),
        ListOutcome::Count(total) => Ok(response::ok("OK", total)),
    }
}

/// POST /tasks — create, then link the task into the assignee's
/// pendingTasks and cache the assignee's name.
pub async fn create_task(
    data: web::Data<AppState>,
    payload: web::Json<TaskPayload>,
) -> Result<HttpResponse, ApiError> {
    let mut task = payload.into_inner().into_task("invalid new task")?;

    let collection = data.mongodb.db.collection::<Task>("tasks");

    // Insert inside a single-document transaction so the id exists before
    // any relationship write references it.
    let mut session = data.mongodb.client.start_session().await?;
    session.start_transaction().await?;
    let inserted = collection.insert_one(&task).session(&mut session).await?;
    session.commit_transaction().await?;
    task.id = inserted.inserted_id.as_object_id();

    if !task.assigned_user.is_empty() {
        if let Some(task_oid) = task.id {
            // An assignee that doesn't resolve to a user is kept as
            // submitted: the task stays dangling and the request succeeds.
            if let Some(assignee) = link_assignee(&data, &task.assigned_user, task_oid).await? {
                task.assigned_user_name = assignee.name;
                collection
                    .replace_one(doc! { "_id": task_oid }, &task)
                    .await?;
            }
        }
    }

    info!("task created: {:?}", task.id);
    Ok(response::created(
        "task created successfully",
        entity_document(&task)?,
    ))
}

/// GET /tasks/{id} — fetch one task, optionally projected via `select`.
pub async fn get_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<SelectParams>,
) -> Result<HttpResponse, ApiError> {
    let task_oid = query::parse_object_id(&path, TASK_NOT_FOUND)?;

    let collection = data.mongodb.db.collection::<Document>("tasks");
    let mut find = collection.find_one(doc! { "_id": task_oid });
    if let Some(raw) = params.select.as_deref() {
        find = find.projection(query::parse_select(raw, Task::FIELDS)?);
    }

    match find.await? {
        Some(task) => Ok(response::ok("OK", with_string_id(task))),
        None => Err(ApiError::NotFound(TASK_NOT_FOUND)),
    }
}

/// PUT /tasks/{id} — full replace. The stored document is overwritten
/// wholesale, so omitted fields revert to their schema defaults. When the
/// assignee changes, the old link is removed before the new one is added.
pub async fn replace_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<TaskPayload>,
) -> Result<HttpResponse, ApiError> {
    let task_oid = query::parse_object_id(&path, TASK_NOT_FOUND)?;

    let collection = data.mongodb.db.collection::<Task>("tasks");
    let old_task = collection
        .find_one(doc! { "_id": task_oid })
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;

    let mut new_task = payload.into_inner().into_task("task validation failed")?;
    new_task.id = Some(task_oid);

    let old_assignee = old_task.assigned_user;
    let new_assignee = new_task.assigned_user.clone();

    if old_assignee != new_assignee {
        if !old_assignee.is_empty() {
            unlink_assignee(&data, &old_assignee, task_oid).await?;
        }
        if !new_assignee.is_empty() {
            if let Some(assignee) = link_assignee(&data, &new_assignee, task_oid).await? {
                new_task.assigned_user_name = assignee.name;
            }
        }
    }

    let replaced = collection
        .find_one_and_replace(doc! { "_id": task_oid }, &new_task)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;

    info!("task replaced: {}", task_oid);
    Ok(response::ok(
        "task updated successfully",
        entity_document(&replaced)?,
    ))
}

/// DELETE /tasks/{id} — unlink from the assignee, then delete. Responds
/// with the task's prior state.
pub async fn delete_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task_oid = query::parse_object_id(&path, TASK_NOT_FOUND)?;

    let collection = data.mongodb.db.collection::<Task>("tasks");
    let task = collection
        .find_one(doc! { "_id": task_oid })
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;

    if !task.assigned_user.is_empty() {
        unlink_assignee(&data, &task.assigned_user, task_oid).await?;
    }

    collection.delete_one(doc! { "_id": task_oid }).await?;

    info!("task deleted: {}", task_oid);
    Ok(response::ok(
        "task deleted successfully",
        entity_document(&task)?,
    ))
}

/// Adds the task id to a user's pendingTasks (`$addToSet`, so repeated
/// assignment never duplicates the entry) and returns the updated user.
/// An id that doesn't parse or doesn't match a document yields `None`.
async fn link_assignee(
    data: &web::Data<AppState>,
    assignee: &str,
    task_oid: ObjectId,
) -> Result<Option<User>, ApiError> {
    let user_oid = match ObjectId::parse_str(assignee) {
        Ok(oid) => oid,
        Err(_) => return Ok(None),
    };
    let user = users_collection(data)
        .find_one_and_update(
            doc! { "_id": user_oid },
            doc! { "$addToSet": { "pendingTasks": task_oid.to_hex() } },
        )
        .return_document(ReturnDocument::After)
        .await?;
    Ok(user)
}

/// Pulls the task id out of a user's pendingTasks. Missing users and
/// unparseable ids are ignored.
async fn unlink_assignee(
    data: &web::Data<AppState>,
    assignee: &str,
    task_oid: ObjectId,
) -> Result<(), ApiError> {
    let user_oid = match ObjectId::parse_str(assignee) {
        Ok(oid) => oid,
        Err(_) => return Ok(()),
    };
    users_collection(data)
        .update_one(
            doc! { "_id": user_oid },
            doc! { "$pull": { "pendingTasks": task_oid.to_hex() } },
        )
        .await?;
    Ok(())
}

fn users_collection(data: &web::Data<AppState>) -> Collection<User> {
    data.mongodb.db.collection::<User>("users")
}
