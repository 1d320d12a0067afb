use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::response::ApiError;

/// A task document as stored in the `tasks` collection.
///
/// `assigned_user` holds the assignee's id as a plain string, `""` when
/// unassigned; `assigned_user_name` is a cached copy of that user's name and
/// is only refreshed when the assignment itself changes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub completed: bool,
    pub assigned_user: String,
    pub assigned_user_name: String,
    pub date_created: DateTime<Utc>,
}

impl Task {
    /// Fields a `where`/`sort`/`select` parameter may reference.
    pub const FIELDS: &'static [&'static str] = &[
        "_id",
        "name",
        "description",
        "deadline",
        "completed",
        "assignedUser",
        "assignedUserName",
        "dateCreated",
    ];
}

/// Incoming task body. Everything is optional at the parsing layer;
/// `into_task` enforces the required fields and fills schema defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub completed: Option<bool>,
    pub assigned_user: Option<String>,
    pub assigned_user_name: Option<String>,
}

impl TaskPayload {
    /// Builds a complete task document: `name` and `deadline` are required,
    /// every other field falls back to its schema default. Used for both
    /// create and full replace, so an omitted field never survives a PUT.
    pub fn into_task(self, invalid: &'static str) -> Result<Task, ApiError> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ApiError::ValidationFailed(invalid)),
        };
        let deadline = self
            .deadline
            .as_deref()
            .and_then(parse_deadline)
            .ok_or(ApiError::ValidationFailed(invalid))?;

        Ok(Task {
            id: None,
            name,
            description: self
                .description
                .unwrap_or_else(|| "description required".to_string()),
            deadline,
            completed: self.completed.unwrap_or(false),
            assigned_user: self.assigned_user.unwrap_or_default(),
            assigned_user_name: self
                .assigned_user_name
                .unwrap_or_else(|| "unassigned".to_string()),
            date_created: Utc::now(),
        })
    }
}

/// Deadlines arrive either as a full RFC 3339 timestamp or as a bare
/// `YYYY-MM-DD`, which reads as midnight UTC.
fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        if let Some(start_of_day) = date.and_hms_opt(0, 0, 0) {
            return Some(Utc.from_utc_datetime(&start_of_day));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: Option<&str>, deadline: Option<&str>) -> TaskPayload {
        TaskPayload {
            name: name.map(String::from),
            deadline: deadline.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_applied() {
        let task = payload(Some("Write spec"), Some("2024-01-01"))
            .into_task("invalid new task")
            .unwrap();
        assert_eq!(task.description, "description required");
        assert!(!task.completed);
        assert_eq!(task.assigned_user, "");
        assert_eq!(task.assigned_user_name, "unassigned");
        assert!(task.id.is_none());
    }

    #[test]
    fn name_is_required_and_non_empty() {
        assert!(matches!(
            payload(None, Some("2024-01-01")).into_task("invalid new task"),
            Err(ApiError::ValidationFailed("invalid new task"))
        ));
        assert!(matches!(
            payload(Some("   "), Some("2024-01-01")).into_task("invalid new task"),
            Err(ApiError::ValidationFailed("invalid new task"))
        ));
    }

    #[test]
    fn deadline_is_required_and_must_parse() {
        assert!(matches!(
            payload(Some("Write spec"), None).into_task("task validation failed"),
            Err(ApiError::ValidationFailed("task validation failed"))
        ));
        assert!(matches!(
            payload(Some("Write spec"), Some("next tuesday")).into_task("task validation failed"),
            Err(ApiError::ValidationFailed("task validation failed"))
        ));
    }

    #[test]
    fn deadline_accepts_dates_and_timestamps() {
        let from_date = payload(Some("a"), Some("2024-01-01"))
            .into_task("invalid new task")
            .unwrap();
        assert_eq!(from_date.deadline.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let from_timestamp = payload(Some("a"), Some("2024-01-01T12:30:00-05:00"))
            .into_task("invalid new task")
            .unwrap();
        assert_eq!(
            from_timestamp.deadline.to_rfc3339(),
            "2024-01-01T17:30:00+00:00"
        );
    }

    #[test]
    fn submitted_fields_win_over_defaults() {
        let task = TaskPayload {
            name: Some("Write spec".to_string()),
            deadline: Some("2024-01-01".to_string()),
            description: Some("draft the outline".to_string()),
            completed: Some(true),
            assigned_user: Some("507f1f77bcf86cd799439011".to_string()),
            assigned_user_name: Some("Ann".to_string()),
        }
        .into_task("invalid new task")
        .unwrap();
        assert_eq!(task.description, "draft the outline");
        assert!(task.completed);
        assert_eq!(task.assigned_user, "507f1f77bcf86cd799439011");
        assert_eq!(task.assigned_user_name, "Ann");
    }
}
