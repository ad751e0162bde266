//! Price refresh domain: the background market-price refresh job.

pub mod client;

use crate::shared::serde_util::timestamp_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/prices/refresh/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshStatus {
    pub running: bool,
    /// Job summary, or `{"error": ...}` when the last run failed.
    #[serde(default)]
    pub last_result: Option<Value>,
    #[serde(default, deserialize_with = "timestamp_opt::deserialize")]
    pub last_run_at: Option<DateTime<Utc>>,
}

impl RefreshStatus {
    /// Error message of the last run, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_result.as_ref()?.get("error")?.as_str()
    }
}

/// Outcome of asking the server to start a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStart {
    Started,
    /// A refresh was already in progress; nothing new was scheduled.
    AlreadyRunning,
}
