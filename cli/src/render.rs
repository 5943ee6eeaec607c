//! Plain-text rendering of the todo state.

use std::fmt::Write;

use todo_core::{Filter, TodoState};

/// Render the connectivity line, any error, the filtered list and the
/// stats line.
pub fn render(state: &TodoState, filter: Filter) -> String {
    let mut out = String::new();

    let status = match (state.is_configured(), state.is_connected()) {
        (false, _) => "Local only (not persisted)",
        (true, true) => "Connected",
        (true, false) => "Offline",
    };
    let _ = writeln!(out, "{status}");
    if let Some(error) = state.error() {
        let _ = writeln!(out, "error: {error}");
    }

    let visible = state.visible(filter);
    if visible.is_empty() {
        let _ = writeln!(out, "No todos yet");
    }
    for todo in visible {
        let mark = if todo.completed { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{mark}] {id:<38} {text}  ({created})",
            id = todo.id,
            text = todo.text,
            created = todo.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    let _ = writeln!(out, "{}", state.stats());
    out
}
