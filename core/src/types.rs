//! Domain DTOs for the todo resource.
//!
//! # Design
//! `Todo` is the single flat record the backend stores. The id is opaque:
//! the backend may hand out integers or strings (UUIDs), and local-only mode
//! uses millisecond timestamps, so `TodoId` accepts either shape and only
//! promises `Display` for building `id=eq.<id>` filters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a todo record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Number(n) => f.pad(&n.to_string()),
            TodoId::Text(s) => f.pad(s),
        }
    }
}

impl From<i64> for TodoId {
    fn from(n: i64) -> Self {
        TodoId::Number(n)
    }
}

impl From<&str> for TodoId {
    /// Numeric strings become `Number` so ids typed on a command line match
    /// ids the backend returned as JSON integers.
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => TodoId::Number(n),
            Err(_) => TodoId::Text(s.to_string()),
        }
    }
}

/// A single todo record as held in the record store and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a todo. The backend assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTodo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl NewTodo {
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            created_at,
        }
    }

    /// Attach an id, producing the record the store keeps.
    pub fn with_id(self, id: TodoId) -> Todo {
        Todo {
            id,
            text: self.text,
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// Partial update payload. Only the fields present in the JSON are applied;
/// omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }
}
