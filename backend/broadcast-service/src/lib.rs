//! Live broadcast sessions and their recordings
//!
//! A creator opens a session, the provider ingests it, viewers join and
//! leave, and on end a recording is created and later finalized from
//! provider webhooks. See `services` for the moving parts and `db` for the
//! persistence seam.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use services::{RecordingCoordinator, SessionManager, WebhookProcessor};
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub recordings: Arc<RecordingCoordinator>,
    pub webhooks: Arc<WebhookProcessor>,
    /// Inbound webhook signatures are checked only when set
    pub webhook_secret: Option<String>,
}
