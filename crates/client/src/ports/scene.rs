//! Scene port - the rendering side of remote actors.
//!
//! The registry owns every handle it is given exclusively and releases
//! them deterministically on remove/clear. Hit-candidacy mirrors the
//! scene's dynamic-collider set: a dead actor is both invisible and
//! excluded from hitscan candidates.

use glam::Vec3;

use tacops_protocol::ParticipantId;

/// Opaque handle to a spawned visual proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// Visual-proxy operations the registry drives.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ActorScene {
    /// Create a visual proxy for a remote participant at the origin.
    fn spawn(&mut self, participant_id: &ParticipantId, display_name: &str) -> VisualHandle;

    fn set_visible(&mut self, handle: VisualHandle, visible: bool);

    fn set_transform(&mut self, handle: VisualHandle, position: Vec3, yaw: f32);

    /// Include or exclude the proxy from hit-detection candidacy.
    fn set_hit_candidate(&mut self, handle: VisualHandle, active: bool);

    /// Release the proxy and all its resources.
    fn despawn(&mut self, handle: VisualHandle);
}
