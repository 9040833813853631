//! Recording pipeline
//!
//! - `coordinator.rs` - pending creation, webhook reconciliation, moderation
//! - `correlation.rs` - matching provider events to recordings
//! - `sweeper.rs` - optional background failing of stuck recordings

pub mod coordinator;
pub mod correlation;
pub mod sweeper;

pub use coordinator::{PendingOutcome, ReconcileOutcome, RecordingCoordinator};
pub use correlation::MatchStrategy;
pub use sweeper::start_stuck_recording_sweeper;
