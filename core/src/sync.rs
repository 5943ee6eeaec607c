//! Optimistic reconciliation between the record store and the remote backend.
//!
//! # Design
//! Every intent runs in two halves. `begin_*` validates the intent, applies
//! the optimistic part to the store, captures the snapshot taken just before
//! that write and returns a `PendingSync` holding the request to send. Once
//! the round-trip finishes, `complete` confirms the write or restores the
//! snapshot. `None` from `begin_*` means nothing has to go over the wire: the
//! intent was rejected, or local-only mode applied it in full.
//!
//! Rollback restores the whole captured snapshot, not the single record. If
//! two intents overlap and the first one fails, its snapshot discards the
//! second one's already-applied write. `Reconciler` drives one intent at a
//! time through a `Transport`, so it never overlaps; hosts that interleave
//! `PendingSync` values get the race described above.
//!
//! Remote failures never escape as errors: they clear the connectivity flag,
//! set a user-facing message and come back as a `SyncOutcome`.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::RestClient;
use crate::config::SyncMode;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::store::{Filter, LocalIdGenerator, RecordStore, Snapshot, Stats};
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

const LOAD_FAILED: &str = "Failed to load todos";
const CREATE_FAILED: &str = "Failed to create todo";
const UPDATE_FAILED: &str = "Failed to update todo";
const DELETE_FAILED: &str = "Failed to delete todo";

/// Executes HTTP requests on behalf of the reconciler.
///
/// Implementations return non-2xx responses as `Ok`; only a missing response
/// is an `Err`, reported as `ApiError::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Which intent a `PendingSync` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    Create,
    Toggle,
    Edit,
    Remove,
}

impl Operation {
    fn failure_message(&self) -> &'static str {
        match self {
            Operation::Refresh => LOAD_FAILED,
            Operation::Create => CREATE_FAILED,
            Operation::Toggle | Operation::Edit => UPDATE_FAILED,
            Operation::Remove => DELETE_FAILED,
        }
    }

    /// Whether the intent wrote to the store before the request went out.
    fn is_optimistic(&self) -> bool {
        matches!(self, Operation::Toggle | Operation::Edit | Operation::Remove)
    }

    /// Whether the intent holds the loading indicator while in flight.
    fn shows_loading(&self) -> bool {
        matches!(self, Operation::Refresh | Operation::Create)
    }
}

/// An intent whose remote half is still outstanding.
#[derive(Debug)]
#[must_use = "a pending sync must be completed or its rollback is lost"]
pub struct PendingSync {
    operation: Operation,
    request: HttpRequest,
    snapshot: Snapshot,
}

impl PendingSync {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Store contents from immediately before the optimistic write.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

/// How a pending intent ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The backend accepted the change.
    Confirmed,
    /// The backend rejected an optimistic write and the store was restored.
    Reverted(ApiError),
    /// A non-optimistic call failed; the store was left as it was.
    Failed(ApiError),
}

impl SyncOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SyncOutcome::Confirmed)
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            SyncOutcome::Confirmed => None,
            SyncOutcome::Reverted(e) | SyncOutcome::Failed(e) => Some(e),
        }
    }
}

/// Client-side todo state: the record store plus the advisory indicators
/// shown next to it.
#[derive(Debug)]
pub struct TodoState {
    store: RecordStore,
    client: Option<RestClient>,
    connected: bool,
    error: Option<String>,
    loads_in_flight: usize,
    ids: LocalIdGenerator,
}

impl TodoState {
    pub fn new(mode: &SyncMode) -> Self {
        Self {
            store: RecordStore::new(),
            client: mode.remote().map(RestClient::new),
            connected: true,
            error: None,
            loads_in_flight: 0,
            ids: LocalIdGenerator::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn todos(&self) -> &[Todo] {
        self.store.as_slice()
    }

    pub fn visible(&self, filter: Filter) -> Vec<&Todo> {
        self.store.filtered(filter).collect()
    }

    pub fn stats(&self) -> Stats {
        self.store.stats()
    }

    /// Whether the last remote call succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loads_in_flight > 0
    }

    /// Add a todo. Blank text is rejected. Local-only mode prepends the
    /// record right away; remote mode prepends it once the backend returns
    /// it with its id.
    pub fn begin_add(&mut self, text: &str) -> Option<PendingSync> {
        let text = text.trim();
        if text.is_empty() {
            debug!("begin_add: blank text rejected");
            return None;
        }
        let now = Utc::now();
        let input = NewTodo::new(text, now);

        let Some(client) = &self.client else {
            let todo = input.with_id(self.ids.next_id(now));
            debug!(id = %todo.id, "begin_add: created local todo");
            self.store.prepend(todo);
            return None;
        };

        let snapshot = self.store.snapshot();
        let request = client.build_create(&input);
        self.dispatch(Operation::Create, request, snapshot)
    }

    /// Flip `completed` on a todo. Unknown ids are ignored.
    pub fn begin_toggle(&mut self, id: &TodoId) -> Option<PendingSync> {
        let completed = !self.store.find(id)?.completed;
        let snapshot = self.store.snapshot();
        self.store.set_completed(id, completed);
        debug!(%id, completed, "begin_toggle: applied");

        let request = self
            .client
            .as_ref()?
            .build_update(id, &TodoPatch::completed(completed));
        self.dispatch(Operation::Toggle, request, snapshot)
    }

    /// Replace a todo's text. Blank text and unknown ids are ignored.
    pub fn begin_edit(&mut self, id: &TodoId, text: &str) -> Option<PendingSync> {
        let text = text.trim();
        if text.is_empty() || !self.store.contains(id) {
            debug!(%id, "begin_edit: rejected");
            return None;
        }
        let snapshot = self.store.snapshot();
        self.store.set_text(id, text);
        debug!(%id, "begin_edit: applied");

        let request = self.client.as_ref()?.build_update(id, &TodoPatch::text(text));
        self.dispatch(Operation::Edit, request, snapshot)
    }

    /// Remove a todo. Unknown ids are ignored.
    pub fn begin_remove(&mut self, id: &TodoId) -> Option<PendingSync> {
        let snapshot = self.store.snapshot();
        self.store.remove(id)?;
        debug!(%id, "begin_remove: applied");

        let request = self.client.as_ref()?.build_delete(id);
        self.dispatch(Operation::Remove, Ok(request), snapshot)
    }

    /// Reload the whole list from the backend. Does nothing in local-only
    /// mode.
    pub fn begin_refresh(&mut self) -> Option<PendingSync> {
        let request = self.client.as_ref()?.build_list();
        self.error = None;
        let snapshot = self.store.snapshot();
        self.dispatch(Operation::Refresh, Ok(request), snapshot)
    }

    /// Apply the result of a pending intent's round-trip.
    pub fn complete(
        &mut self,
        pending: PendingSync,
        response: Result<HttpResponse, ApiError>,
    ) -> SyncOutcome {
        let PendingSync {
            operation,
            snapshot,
            ..
        } = pending;
        if operation.shows_loading() {
            self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        }

        match response.and_then(|r| self.confirm(operation, r)) {
            Ok(()) => {
                self.connected = true;
                info!(?operation, "sync confirmed");
                SyncOutcome::Confirmed
            }
            Err(err) => self.fail(operation, snapshot, err),
        }
    }

    /// Parse a response and apply what it carries. Only refresh and create
    /// change the store here; the other writes were applied up front.
    fn confirm(&mut self, operation: Operation, response: HttpResponse) -> Result<(), ApiError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ApiError::Transport("remote sync is not configured".to_string()))?;
        match operation {
            Operation::Refresh => {
                let todos = client.parse_list(response)?;
                debug!(count = todos.len(), "confirm: replacing store");
                self.store.replace_all(todos);
            }
            Operation::Create => {
                let todo = client.parse_create(response)?;
                if self.store.contains(&todo.id) {
                    debug!(id = %todo.id, "confirm: created row already loaded");
                } else {
                    self.store.prepend(todo);
                }
            }
            Operation::Toggle | Operation::Edit => {
                client.parse_update(response)?;
            }
            Operation::Remove => client.parse_delete(response)?,
        }
        Ok(())
    }

    fn fail(&mut self, operation: Operation, snapshot: Snapshot, err: ApiError) -> SyncOutcome {
        self.connected = false;
        self.error = Some(operation.failure_message().to_string());
        if operation.is_optimistic() {
            warn!(?operation, error = %err, "remote call failed, reverting store");
            self.store.restore(snapshot);
            SyncOutcome::Reverted(err)
        } else {
            warn!(?operation, error = %err, "remote call failed");
            SyncOutcome::Failed(err)
        }
    }

    /// Hand out a pending sync, or settle immediately when the request could
    /// not even be built. A build failure is recorded like a failed
    /// round-trip, so `error()` is set even though `begin_*` returns `None`.
    /// Serializing `NewTodo` and `TodoPatch` does not fail in practice.
    fn dispatch(
        &mut self,
        operation: Operation,
        request: Result<HttpRequest, ApiError>,
        snapshot: Snapshot,
    ) -> Option<PendingSync> {
        match request {
            Ok(request) => {
                if operation.shows_loading() {
                    self.loads_in_flight += 1;
                }
                debug!(?operation, method = %request.method, url = %request.url, "dispatch: request ready");
                Some(PendingSync {
                    operation,
                    request,
                    snapshot,
                })
            }
            Err(err) => {
                let outcome = self.fail(operation, snapshot, err);
                debug!(?outcome, "dispatch: request could not be built");
                None
            }
        }
    }
}

/// Drives intents through `TodoState` and a `Transport`, one at a time.
pub struct Reconciler<T> {
    state: TodoState,
    transport: T,
}

impl<T: Transport> Reconciler<T> {
    pub fn new(mode: &SyncMode, transport: T) -> Self {
        Self {
            state: TodoState::new(mode),
            transport,
        }
    }

    pub fn state(&self) -> &TodoState {
        &self.state
    }

    pub fn todos(&self) -> &[Todo] {
        self.state.todos()
    }

    pub fn clear_error(&mut self) {
        self.state.clear_error();
    }

    pub async fn add(&mut self, text: &str) -> Option<SyncOutcome> {
        let pending = self.state.begin_add(text)?;
        Some(self.drive(pending).await)
    }

    pub async fn toggle(&mut self, id: &TodoId) -> Option<SyncOutcome> {
        let pending = self.state.begin_toggle(id)?;
        Some(self.drive(pending).await)
    }

    pub async fn edit(&mut self, id: &TodoId, text: &str) -> Option<SyncOutcome> {
        let pending = self.state.begin_edit(id, text)?;
        Some(self.drive(pending).await)
    }

    pub async fn remove(&mut self, id: &TodoId) -> Option<SyncOutcome> {
        let pending = self.state.begin_remove(id)?;
        Some(self.drive(pending).await)
    }

    pub async fn refresh(&mut self) -> Option<SyncOutcome> {
        let pending = self.state.begin_refresh()?;
        Some(self.drive(pending).await)
    }

    async fn drive(&mut self, pending: PendingSync) -> SyncOutcome {
        let response = self.transport.execute(pending.request().clone()).await;
        self.state.complete(pending, response)
    }
}
