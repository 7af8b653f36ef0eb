//! Generation backend port
//!
//! A backend accepts a request made of ordered message strings, hands back a
//! handle, and is polled until the response is terminal. Backends hold the
//! conversation state that links consecutive turns; `reset` starts a new
//! conversation. Every failure degrades to `None` so a round can continue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Validating,
    InProgress,
    Finalizing,
    Cancelling,
    Queued,
    Failed,
    Cancelled,
    Incomplete,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ResponseStatus {
    /// Whether polling should stop.
    pub const fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Validating | Self::InProgress | Self::Finalizing | Self::Cancelling | Self::Queued
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Validating => "validating",
            Self::InProgress => "in_progress",
            Self::Finalizing => "finalizing",
            Self::Cancelling => "cancelling",
            Self::Queued => "queued",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Incomplete => "incomplete",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHandle {
    pub id: String,
    pub status: ResponseStatus,
}

impl ResponseHandle {
    pub fn new(id: impl Into<String>, status: ResponseStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }
}

/// Which tool a backend instance will serve; selects per-tool request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendProfile {
    ErrorLineFinder,
    NegativeTests,
    PositiveTests,
}

/// Remote text generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Send the messages as one request continuing the current conversation.
    async fn submit(&self, messages: &[String]) -> Option<ResponseHandle>;

    /// Wait until the response is terminal and return its text if it completed.
    async fn poll(&self, handle: &ResponseHandle) -> Option<String>;

    /// Forget the conversation so the next submit starts fresh.
    async fn reset(&self);
}

/// Creates backends with independent conversation state.
pub trait BackendFactory: Send + Sync {
    type Backend: GenerationBackend;

    fn create(&self, profile: BackendProfile) -> Self::Backend;
}
