//! Business logic
//!
//! - `access` - view predicates for streams and recordings
//! - `credentials` - stream keys and identifiers
//! - `provider` - external ingest/transcode gateway
//! - `streaming` - live session lifecycle and viewer counting
//! - `recordings` - recording pipeline and webhook reconciliation
//! - `webhooks` - provider delivery routing and audit

pub mod access;
pub mod credentials;
pub mod provider;
pub mod recordings;
pub mod streaming;
pub mod webhooks;

pub use recordings::RecordingCoordinator;
pub use streaming::SessionManager;
pub use webhooks::{ProcessingResult, WebhookProcessor};
