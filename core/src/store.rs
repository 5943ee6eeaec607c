//! In-memory record store.
//!
//! # Design
//! The store is an ordered `Vec<Todo>` with the newest record at the head.
//! Snapshots are plain value clones: the list is small, and a clone never
//! aliases the live state, so restoring one cannot be disturbed by mutations
//! made after it was taken.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::types::{Todo, TodoId};

/// An immutable copy of the store contents at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<Todo>);

impl Snapshot {
    pub fn todos(&self) -> &[Todo] {
        &self.0
    }
}

/// Ordered collection of the todo records currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    todos: Vec<Todo>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn as_slice(&self) -> &[Todo] {
        &self.todos
    }

    pub fn find(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TodoId) -> bool {
        self.find(id).is_some()
    }

    pub fn prepend(&mut self, todo: Todo) {
        self.todos.insert(0, todo);
    }

    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
    }

    /// Returns false when no record has this id.
    pub fn set_completed(&mut self, id: &TodoId, completed: bool) -> bool {
        self.update(id, |t| t.completed = completed)
    }

    /// Returns false when no record has this id.
    pub fn set_text(&mut self, id: &TodoId, text: &str) -> bool {
        self.update(id, |t| t.text = text.to_string())
    }

    /// Removes the record and hands it back, if present.
    pub fn remove(&mut self, id: &TodoId) -> Option<Todo> {
        let pos = self.todos.iter().position(|t| &t.id == id)?;
        Some(self.todos.remove(pos))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.todos.clone())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.todos = snapshot.0;
    }

    pub fn filtered(&self, filter: Filter) -> impl Iterator<Item = &Todo> {
        self.todos.iter().filter(move |t| filter.matches(t))
    }

    pub fn stats(&self) -> Stats {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        Stats {
            active: self.todos.len() - completed,
            completed,
            total: self.todos.len(),
        }
    }

    fn update(&mut self, id: &TodoId, apply: impl FnOnce(&mut Todo)) -> bool {
        match self.todos.iter_mut().find(|t| &t.id == id) {
            Some(todo) => {
                apply(todo);
                true
            }
            None => false,
        }
    }
}

/// View filter over completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(format!("unknown filter '{other}' (expected all, active or completed)")),
        }
    }
}

/// Record counts by completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} active  {} completed  {} total",
            self.active, self.completed, self.total
        )
    }
}

/// Id source for records created in local-only mode.
///
/// Ids are the creation time in milliseconds, bumped by one whenever the
/// clock has not advanced, so two records created in the same millisecond
/// still get distinct ids.
#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    last: i64,
}

impl LocalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> TodoId {
        let id = now.timestamp_millis().max(self.last + 1);
        self.last = id;
        TodoId::Number(id)
    }
}
