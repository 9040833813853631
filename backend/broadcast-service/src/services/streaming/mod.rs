//! Live session lifecycle
//!
//! - `session_manager.rs` - state machine, viewers, credentials, health check
//! - `redis_counter.rs` - atomic viewer counters in Redis
//!
//! The manager hands ended sessions to the recording pipeline through
//! [`RecordingHandoff`]; it never sees recording internals.

pub mod redis_counter;
pub mod session_manager;

pub use redis_counter::RedisViewerCounter;
pub use session_manager::{EndedSession, SessionManager};

use crate::error::Result;
use crate::models::SessionSnapshot;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// What happened to the recording side when a session ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RecordingDecision {
    Created { recording_id: Uuid },
    /// A recording synthesized from an early webhook was attributed to this session
    Adopted { recording_id: Uuid },
    AlreadyExists { recording_id: Uuid },
    /// Shorter than the minimum recordable duration; no recording by policy
    SkippedTooShort {
        duration_secs: i64,
        min_duration_secs: i64,
    },
    /// Force-deleted sessions keep no recording
    Discarded,
    /// Session ended but the pipeline could not be reached; a later webhook
    /// will still be kept as a synthesized recording
    HandoffFailed { error: String },
}

#[async_trait]
pub trait RecordingHandoff: Send + Sync {
    async fn session_ended(&self, snapshot: &SessionSnapshot) -> Result<RecordingDecision>;
}
