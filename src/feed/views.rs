//! View projections over the raw task collection
//!
//! Two independent views are derived from one fetched collection: a public
//! projection that hides store internals, and an admin projection that keeps
//! every column the store returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two subscriber-facing views of the task collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Public projection: id, title, completed flag
    Public,
    /// Admin projection: raw rows, every column included
    Admin,
}

impl View {
    /// All views, in the order they are evaluated each tick
    pub const ALL: [View; 2] = [View::Public, View::Admin];

    /// Short name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Public => "tasks",
            View::Admin => "admin",
        }
    }

    /// Compute this view's projection of the fetched collection
    pub fn project(&self, rows: &[Value]) -> Value {
        match self {
            View::Public => {
                let tasks: Vec<PublicTask> = rows.iter().map(PublicTask::from_row).collect();
                serde_json::json!(tasks)
            }
            View::Admin => Value::Array(rows.to_vec()),
        }
    }
}

/// A task as exposed to public subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicTask {
    pub id: i64,
    pub title: String,
    /// True iff the stored status is "done"
    pub completed: bool,
}

impl PublicTask {
    /// Project a raw store row into the public shape
    pub fn from_row(row: &Value) -> Self {
        Self {
            id: row.get("id").and_then(Value::as_i64).unwrap_or_default(),
            title: row
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            completed: row.get("status").and_then(Value::as_str) == Some("done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_public_projection_maps_status_to_completed() {
        let rows = vec![
            json!({"id": 1, "title": "A", "status": "open"}),
            json!({"id": 2, "title": "B", "status": "done"}),
        ];

        let projected = View::Public.project(&rows);
        assert_eq!(
            projected,
            json!([
                {"id": 1, "title": "A", "completed": false},
                {"id": 2, "title": "B", "completed": true},
            ])
        );
    }

    #[test]
    fn test_public_projection_hides_extra_columns() {
        let rows = vec![json!({
            "id": 7,
            "title": "secret-bearing",
            "status": "open",
            "internal_note": "only admins see this",
        })];

        let projected = View::Public.project(&rows);
        assert!(projected.to_string().find("internal_note").is_none());
    }

    #[test]
    fn test_admin_projection_keeps_raw_rows() {
        let rows = vec![json!({"id": 1, "title": "A", "status": "open", "owner": "pat"})];

        let projected = View::Admin.project(&rows);
        assert_eq!(projected, json!([{"id": 1, "title": "A", "status": "open", "owner": "pat"}]));
    }

    #[test]
    fn test_projection_of_empty_collection() {
        assert_eq!(View::Public.project(&[]), json!([]));
        assert_eq!(View::Admin.project(&[]), json!([]));
    }

    #[test]
    fn test_missing_fields_default() {
        let task = PublicTask::from_row(&json!({"title": "untracked"}));
        assert_eq!(task.id, 0);
        assert_eq!(task.title, "untracked");
        assert!(!task.completed);
    }
}
