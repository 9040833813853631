//! Data models for sessions, recordings and provider webhooks
//!
//! These are the contract between handlers, services and stores.

pub mod recording;
pub mod session;
pub mod webhook;

pub use recording::{Attribution, Recording, RecordingPatch, RecordingStatus, RecordingView};
pub use session::{
    BroadcastMode, CreateSessionRequest, CreateSessionResponse, CredentialRotation,
    IngestCredential, JoinSessionResponse, SessionHealth, SessionSnapshot, SessionStatus,
    SessionView, StreamSession, ViewerCounts, ViewerJoin, Visibility,
};
pub use webhook::{AssetPayload, WebhookEventKind, WebhookPayload};
