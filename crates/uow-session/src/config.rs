use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name recorded on the session's log lines.
    pub label: Option<String>,
    /// Expected number of tracked objects, used to presize the tracker and
    /// identity map.
    pub capacity: usize,
    /// Whether a key deleted (or forgotten) in this session may be inserted
    /// again before the session is dropped.
    pub allow_reinsert: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            label: None,
            capacity: 16,
            allow_reinsert: true,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        toml::from_str(source).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_allow_reinsert(mut self, allow: bool) -> Self {
        self.allow_reinsert = allow;
        self
    }

    /// The label, or `"session"` when none is set.
    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or("session")
    }
}
