//! Client core for a todo list kept in sync with a PostgREST-style backend.
//!
//! # Overview
//! Holds the ordered list of todo records, applies user intents to it
//! optimistically, and mirrors them to the remote `todos` collection when a
//! backend is configured. Without configuration everything stays in memory.
//!
//! # Design
//! - `RestClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `TodoState` splits each intent into `begin_*` (optimistic write plus the
//!   request to send) and `complete` (confirm or roll back), so the failure
//!   paths are testable with canned responses.
//! - `Reconciler` ties `TodoState` to an async `Transport` for hosts that just
//!   want to run intents one after another.
//! - `SyncMode` is decided once from the environment and passed in.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod sync;
pub mod types;

pub use client::RestClient;
pub use config::{RemoteConfig, SyncMode};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use store::{Filter, RecordStore, Snapshot, Stats};
pub use sync::{Operation, PendingSync, Reconciler, SyncOutcome, TodoState, Transport};
pub use types::{NewTodo, Todo, TodoId, TodoPatch};
