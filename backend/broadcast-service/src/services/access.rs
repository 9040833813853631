//! Access predicates
//!
//! Pure functions deciding whether a caller may watch a live session or a
//! recording. No I/O, no panics: every input combination yields a decision.

use crate::models::{Recording, RecordingStatus, StreamSession, Visibility};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    Free,
    Supporter,
    Premium,
}

impl MembershipTier {
    pub const LOWEST: MembershipTier = MembershipTier::Free;

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "supporter" => Some(Self::Supporter),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    #[default]
    User,
    Admin,
}

impl ViewerRole {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

/// Reason codes returned with a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenial {
    NotAuthenticated,
    Suspended,
    MembersOnly,
    Processing,
    Failed,
    /// Recording exists but has no asset yet
    Unavailable,
    Deleted,
    Private,
}

impl AccessDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::Suspended => "suspended",
            Self::MembersOnly => "members_only",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Unavailable => "unavailable",
            Self::Deleted => "deleted",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity as supplied by the upstream gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewer {
    pub user_id: Option<Uuid>,
    pub tier: Option<MembershipTier>,
    pub role: ViewerRole,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: Uuid, tier: Option<MembershipTier>) -> Self {
        Self {
            user_id: Some(user_id),
            tier,
            role: ViewerRole::User,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            tier: None,
            role: ViewerRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ViewerRole::Admin
    }
}

fn visibility_rule(
    visibility: Visibility,
    viewer_id: Option<Uuid>,
    tier: Option<MembershipTier>,
) -> Result<(), AccessDenial> {
    match visibility {
        Visibility::Public => Ok(()),
        Visibility::Members => match (viewer_id, tier) {
            (None, _) => Err(AccessDenial::NotAuthenticated),
            (Some(_), Some(tier)) if tier > MembershipTier::LOWEST => Ok(()),
            (Some(_), _) => Err(AccessDenial::MembersOnly),
        },
        // Invitations are not implemented
        Visibility::Private => Err(AccessDenial::Private),
    }
}

/// Stream rule with the denial reason attached
pub fn stream_access(
    session: &StreamSession,
    viewer_id: Option<Uuid>,
    tier: Option<MembershipTier>,
) -> Result<(), AccessDenial> {
    if session.is_suspended {
        return Err(AccessDenial::Suspended);
    }
    visibility_rule(session.visibility, viewer_id, tier)
}

pub fn can_view_stream(
    session: &StreamSession,
    viewer_id: Option<Uuid>,
    tier: Option<MembershipTier>,
) -> bool {
    stream_access(session, viewer_id, tier).is_ok()
}

/// Recording rule. Order: admin, deleted, hidden, status, owner, visibility.
pub fn can_view_recording(
    recording: &Recording,
    viewer_id: Option<Uuid>,
    tier: Option<MembershipTier>,
    role: ViewerRole,
) -> (bool, Option<AccessDenial>) {
    if role == ViewerRole::Admin {
        return (true, None);
    }
    if recording.is_deleted() {
        return (false, Some(AccessDenial::Deleted));
    }
    if recording.is_hidden {
        return (false, Some(AccessDenial::Suspended));
    }
    match recording.status {
        RecordingStatus::Ready => {}
        RecordingStatus::Processing => return (false, Some(AccessDenial::Processing)),
        RecordingStatus::Failed => return (false, Some(AccessDenial::Failed)),
        RecordingStatus::Pending => return (false, Some(AccessDenial::Unavailable)),
        RecordingStatus::Deleted => return (false, Some(AccessDenial::Deleted)),
    }
    if viewer_id.is_some_and(|id| recording.is_owned_by(id)) {
        return (true, None);
    }
    match visibility_rule(recording.visibility, viewer_id, tier) {
        Ok(()) => (true, None),
        Err(reason) => (false, Some(reason)),
    }
}

/// Convenience wrapper taking a [`Viewer`]
pub fn recording_access(recording: &Recording, viewer: &Viewer) -> Result<(), AccessDenial> {
    match can_view_recording(recording, viewer.user_id, viewer.tier, viewer.role) {
        (true, _) => Ok(()),
        (false, reason) => Err(reason.unwrap_or(AccessDenial::Private)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BroadcastMode, SessionStatus};
    use chrono::Utc;

    fn session(visibility: Visibility, creator_id: Uuid) -> StreamSession {
        StreamSession {
            id: "ls_test".into(),
            provider_session_id: "prov_test".into(),
            creator_id,
            title: "t".into(),
            description: None,
            visibility,
            mode: BroadcastMode::Video,
            avatar_ref: None,
            ingest_url: "rtmp://ingest".into(),
            playback_url: "https://play".into(),
            status: SessionStatus::Live,
            current_viewers: 0,
            peak_viewers: 0,
            total_viewers: 0,
            is_suspended: false,
            suspension_reason: None,
            degraded: false,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    fn recording(visibility: Visibility, creator_id: Uuid, status: RecordingStatus) -> Recording {
        let now = Utc::now();
        Recording {
            id: Uuid::new_v4(),
            session_id: Some("ls_test".into()),
            provider_session_id: None,
            provider_asset_id: None,
            provider_playback_id: None,
            creator_id: Some(creator_id),
            needs_attribution: false,
            title: "t".into(),
            description: None,
            visibility,
            status,
            failure_reason: None,
            playback_url: Some("https://play/x.m3u8".into()),
            download_url: None,
            duration_secs: Some(120.0),
            file_size_bytes: None,
            resolution: None,
            peak_viewers: 0,
            total_viewers: 0,
            is_hidden: false,
            hidden_reason: None,
            deleted_by: None,
            deletion_reason: None,
            session_started_at: None,
            session_ended_at: None,
            created_at: now,
            updated_at: now,
            ready_at: Some(now),
            failed_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_stream_visibility_rules() {
        let creator = Uuid::new_v4();
        let viewer = Uuid::new_v4();

        assert!(can_view_stream(&session(Visibility::Public, creator), None, None));
        assert!(!can_view_stream(&session(Visibility::Members, creator), None, None));
        assert!(!can_view_stream(
            &session(Visibility::Members, creator),
            Some(viewer),
            Some(MembershipTier::Free)
        ));
        assert!(can_view_stream(
            &session(Visibility::Members, creator),
            Some(viewer),
            Some(MembershipTier::Supporter)
        ));
        assert!(!can_view_stream(
            &session(Visibility::Private, creator),
            Some(creator),
            Some(MembershipTier::Premium)
        ));
    }

    #[test]
    fn test_suspended_stream_is_hidden() {
        let mut s = session(Visibility::Public, Uuid::new_v4());
        s.is_suspended = true;
        assert_eq!(stream_access(&s, None, None), Err(AccessDenial::Suspended));
    }

    #[test]
    fn test_recording_status_reasons() {
        let creator = Uuid::new_v4();
        let cases = [
            (RecordingStatus::Pending, AccessDenial::Unavailable),
            (RecordingStatus::Processing, AccessDenial::Processing),
            (RecordingStatus::Failed, AccessDenial::Failed),
            (RecordingStatus::Deleted, AccessDenial::Deleted),
        ];
        for (status, reason) in cases {
            let r = recording(Visibility::Public, creator, status);
            assert_eq!(
                can_view_recording(&r, Some(creator), None, ViewerRole::User),
                (false, Some(reason))
            );
        }
    }

    #[test]
    fn test_hidden_recording_reports_suspended() {
        let creator = Uuid::new_v4();
        let mut r = recording(Visibility::Public, creator, RecordingStatus::Ready);
        r.is_hidden = true;
        assert_eq!(
            can_view_recording(&r, Some(creator), None, ViewerRole::User),
            (false, Some(AccessDenial::Suspended))
        );
        assert_eq!(
            can_view_recording(&r, None, None, ViewerRole::Admin),
            (true, None)
        );
    }

    #[test]
    fn test_owner_sees_private_recording() {
        let creator = Uuid::new_v4();
        let r = recording(Visibility::Private, creator, RecordingStatus::Ready);
        assert_eq!(
            can_view_recording(&r, Some(creator), None, ViewerRole::User),
            (true, None)
        );
        assert_eq!(
            can_view_recording(&r, Some(Uuid::new_v4()), None, ViewerRole::User),
            (false, Some(AccessDenial::Private))
        );
    }

    #[test]
    fn test_predicates_are_total() {
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let visibilities = [Visibility::Public, Visibility::Members, Visibility::Private];
        let tiers = [
            None,
            Some(MembershipTier::Free),
            Some(MembershipTier::Supporter),
            Some(MembershipTier::Premium),
        ];
        let statuses = [
            RecordingStatus::Pending,
            RecordingStatus::Processing,
            RecordingStatus::Ready,
            RecordingStatus::Failed,
            RecordingStatus::Deleted,
        ];

        for visibility in visibilities {
            for authenticated in [false, true] {
                for is_owner in [false, true] {
                    for role in [ViewerRole::User, ViewerRole::Admin] {
                        for tier in tiers {
                            let viewer_id = match (authenticated, is_owner) {
                                (false, _) => None,
                                (true, true) => Some(creator),
                                (true, false) => Some(stranger),
                            };

                            let s = session(visibility, creator);
                            let first = can_view_stream(&s, viewer_id, tier);
                            assert_eq!(first, can_view_stream(&s, viewer_id, tier));

                            for status in statuses {
                                let r = recording(visibility, creator, status);
                                let (allowed, reason) =
                                    can_view_recording(&r, viewer_id, tier, role);
                                assert_eq!(allowed, reason.is_none());
                                if role == ViewerRole::Admin {
                                    assert!(allowed);
                                }
                                if status != RecordingStatus::Ready && role == ViewerRole::User {
                                    assert!(!allowed);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!(MembershipTier::parse("Premium"), Some(MembershipTier::Premium));
        assert_eq!(MembershipTier::parse("gold"), None);
        assert_eq!(ViewerRole::parse("ADMIN"), ViewerRole::Admin);
        assert_eq!(ViewerRole::parse("moderator"), ViewerRole::User);
    }
}
