use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::response::ApiError;

/// A user document as stored in the `users` collection. `pending_tasks`
/// holds the ids of tasks currently assigned to this user, as plain strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    pub date_created: DateTime<Utc>,
}

impl User {
    /// Fields a `where`/`sort`/`select` parameter may reference.
    pub const FIELDS: &'static [&'static str] =
        &["_id", "name", "email", "pendingTasks", "dateCreated"];
}

/// Incoming user body, shared by create (all required fields checked) and
/// update (partial merge of whatever was supplied).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pending_tasks: Option<Vec<String>>,
}

impl UserPayload {
    pub fn into_user(self) -> Result<User, ApiError> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ApiError::ValidationFailed("invalid new user")),
        };
        let email = match self.email {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(ApiError::ValidationFailed("invalid new user")),
        };

        Ok(User {
            id: None,
            name,
            email,
            pending_tasks: self.pending_tasks.unwrap_or_default(),
            date_created: Utc::now(),
        })
    }

    /// `$set` document for a partial update; only supplied fields appear.
    pub fn set_document(&self) -> Result<Document, ApiError> {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name);
        }
        if let Some(email) = &self.email {
            set.insert("email", email);
        }
        if let Some(pending_tasks) = &self.pending_tasks {
            set.insert("pendingTasks", pending_tasks.clone());
        }
        if set.is_empty() {
            return Err(ApiError::ValidationFailed("user validation failed"));
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn create_requires_name_and_email() {
        let missing_email = UserPayload {
            name: Some("Ann".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_email.into_user(),
            Err(ApiError::ValidationFailed("invalid new user"))
        ));

        let blank_name = UserPayload {
            name: Some("".to_string()),
            email: Some("ann@x.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            blank_name.into_user(),
            Err(ApiError::ValidationFailed("invalid new user"))
        ));
    }

    #[test]
    fn create_defaults_pending_tasks_to_empty() {
        let user = UserPayload {
            name: Some("Ann".to_string()),
            email: Some("ann@x.com".to_string()),
            ..Default::default()
        }
        .into_user()
        .unwrap();
        assert!(user.pending_tasks.is_empty());
        assert!(user.id.is_none());
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let set = UserPayload {
            email: Some("ann@y.com".to_string()),
            ..Default::default()
        }
        .set_document()
        .unwrap();
        assert_eq!(set, doc! { "email": "ann@y.com" });
    }

    #[test]
    fn update_with_no_fields_is_rejected() {
        assert!(matches!(
            UserPayload::default().set_document(),
            Err(ApiError::ValidationFailed("user validation failed"))
        ));
    }
}
