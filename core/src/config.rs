//! Sync mode selection.
//!
//! # Design
//! Whether the remote backend is used is decided once, at startup, from two
//! settings: the project URL and the access key. Missing either one is not an
//! error; the application degrades to local-only mode. The result is an
//! explicit `SyncMode` value handed to `TodoState` rather than a flag checked
//! ad hoc on every call.

use tracing::{debug, warn};

/// Environment variable holding the backend project URL.
pub const URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the access key.
pub const KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Connection settings for the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        }
    }

    /// Root of the REST surface; the `todos` collection lives under it.
    pub fn rest_base(&self) -> String {
        format!("{}/rest/v1", self.base_url)
    }
}

/// Whether state changes are mirrored to a remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Remote(RemoteConfig),
    LocalOnly,
}

impl SyncMode {
    /// Read the mode from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the mode from an arbitrary key lookup. Empty values count as
    /// absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        match (present(URL_VAR), present(KEY_VAR)) {
            (Some(url), Some(key)) => {
                debug!(%url, "from_lookup: remote sync configured");
                SyncMode::Remote(RemoteConfig::new(&url, &key))
            }
            (None, None) => {
                debug!("from_lookup: no remote configured, local-only");
                SyncMode::LocalOnly
            }
            (url, _) => {
                let missing = if url.is_none() { URL_VAR } else { KEY_VAR };
                warn!(missing, "incomplete remote configuration, falling back to local-only mode");
                SyncMode::LocalOnly
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, SyncMode::Remote(_))
    }

    pub fn remote(&self) -> Option<&RemoteConfig> {
        match self {
            SyncMode::Remote(config) => Some(config),
            SyncMode::LocalOnly => None,
        }
    }
}
