//! Remote actor registry.
//!
//! Owns the visual proxies for every non-local participant: creates and
//! destroys them, tracks aliveness, and smooths authoritative pose
//! updates into rendered motion. State-update delivery from the wire is
//! neither ordered nor deduplicated, so target application is
//! idempotent; applying the same pose twice changes nothing.

use std::collections::HashMap;

use glam::Vec3;
use tracing::debug;

use tacops_protocol::ParticipantId;

use crate::ports::{ActorScene, VisualHandle};

/// Smoothing time constant: roughly 63% of the remaining distance is
/// covered per `SMOOTHING_TAU` of elapsed time, independent of frame
/// rate.
const SMOOTHING_TAU: f32 = 0.1;

/// A remote participant's interpolation state.
#[derive(Debug)]
pub struct RemoteActor {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub current_position: Vec3,
    pub target_position: Vec3,
    pub current_yaw: f32,
    pub target_yaw: f32,
    pub alive: bool,
    visual: VisualHandle,
}

/// The set of visual proxies for other participants.
pub struct RemoteActorRegistry {
    actors: HashMap<ParticipantId, RemoteActor>,
    scene: Box<dyn ActorScene>,
}

impl RemoteActorRegistry {
    pub fn new(scene: Box<dyn ActorScene>) -> Self {
        Self {
            actors: HashMap::new(),
            scene,
        }
    }

    /// Register a remote participant. No-op when the id already exists,
    /// so a replayed add event cannot create a duplicate proxy.
    pub fn add_actor(&mut self, participant_id: &ParticipantId, display_name: &str) {
        if self.actors.contains_key(participant_id) {
            return;
        }
        debug!(%participant_id, display_name, "spawning remote actor");
        let visual = self.scene.spawn(participant_id, display_name);
        self.actors.insert(
            participant_id.clone(),
            RemoteActor {
                participant_id: participant_id.clone(),
                display_name: display_name.to_string(),
                current_position: Vec3::ZERO,
                target_position: Vec3::ZERO,
                current_yaw: 0.0,
                target_yaw: 0.0,
                alive: true,
                visual,
            },
        );
    }

    /// Remove a participant and release its visual. No-op for unknown ids.
    pub fn remove_actor(&mut self, participant_id: &ParticipantId) {
        if let Some(actor) = self.actors.remove(participant_id) {
            debug!(%participant_id, "despawning remote actor");
            self.scene.despawn(actor.visual);
        }
    }

    /// Toggle aliveness. Death hides the proxy and removes it from
    /// hit-candidacy; interpolation is suspended until revival. Revival
    /// resynchronizes the stale target to the current position so the
    /// actor glides from where it died toward its next update instead of
    /// snapping.
    pub fn set_alive(&mut self, participant_id: &ParticipantId, alive: bool) {
        let Some(actor) = self.actors.get_mut(participant_id) else {
            return;
        };
        if actor.alive == alive {
            return;
        }
        actor.alive = alive;
        self.scene.set_visible(actor.visual, alive);
        self.scene.set_hit_candidate(actor.visual, alive);
        if alive {
            actor.target_position = actor.current_position;
            actor.target_yaw = actor.current_yaw;
        }
    }

    /// Apply an authoritative pose. Only target fields move; `tick`
    /// does the smoothing. Updates for dead actors are dropped so a
    /// stale pre-death target can never be interpolated toward.
    pub fn update_target(&mut self, participant_id: &ParticipantId, position: Vec3, yaw: f32) {
        let Some(actor) = self.actors.get_mut(participant_id) else {
            return;
        };
        if !actor.alive {
            return;
        }
        actor.target_position = position;
        actor.target_yaw = yaw;
    }

    /// Per-frame interpolation pass. Safe with zero actors; dead actors
    /// are skipped.
    pub fn tick(&mut self, dt_seconds: f32) {
        if dt_seconds <= 0.0 {
            return;
        }
        let alpha = 1.0 - (-dt_seconds / SMOOTHING_TAU).exp();
        for actor in self.actors.values_mut() {
            if !actor.alive {
                continue;
            }
            actor.current_position = actor
                .current_position
                .lerp(actor.target_position, alpha);

            // Shortest-arc yaw blend.
            let delta = wrap_angle(actor.target_yaw - actor.current_yaw);
            actor.current_yaw = wrap_angle(actor.current_yaw + delta * alpha);

            self.scene
                .set_transform(actor.visual, actor.current_position, actor.current_yaw);
        }
    }

    /// Tear down every actor and release all visuals.
    pub fn clear(&mut self) {
        for (_, actor) in self.actors.drain() {
            self.scene.despawn(actor.visual);
        }
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.actors.contains_key(participant_id)
    }

    pub fn get(&self, participant_id: &ParticipantId) -> Option<&RemoteActor> {
        self.actors.get(participant_id)
    }
}

/// Wrap an angle to (-pi, pi].
fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::PI;
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::ports::scene::MockActorScene;

    /// Scene double that records spawn/despawn balance and the last
    /// transform per handle.
    #[derive(Debug, Default)]
    struct RecordingScene {
        state: Rc<RefCell<SceneState>>,
    }

    #[derive(Debug, Default)]
    struct SceneState {
        next_handle: u64,
        live: Vec<u64>,
        visible: HashMap<u64, bool>,
        hit_candidates: HashMap<u64, bool>,
        transforms: HashMap<u64, (Vec3, f32)>,
    }

    impl RecordingScene {
        fn new() -> (Self, Rc<RefCell<SceneState>>) {
            let state = Rc::new(RefCell::new(SceneState::default()));
            (
                Self {
                    state: Rc::clone(&state),
                },
                state,
            )
        }
    }

    impl ActorScene for RecordingScene {
        fn spawn(&mut self, _id: &ParticipantId, _name: &str) -> VisualHandle {
            let mut s = self.state.borrow_mut();
            let handle = s.next_handle;
            s.next_handle += 1;
            s.live.push(handle);
            s.visible.insert(handle, true);
            s.hit_candidates.insert(handle, true);
            VisualHandle(handle)
        }

        fn set_visible(&mut self, handle: VisualHandle, visible: bool) {
            self.state.borrow_mut().visible.insert(handle.0, visible);
        }

        fn set_transform(&mut self, handle: VisualHandle, position: Vec3, yaw: f32) {
            self.state
                .borrow_mut()
                .transforms
                .insert(handle.0, (position, yaw));
        }

        fn set_hit_candidate(&mut self, handle: VisualHandle, active: bool) {
            self.state
                .borrow_mut()
                .hit_candidates
                .insert(handle.0, active);
        }

        fn despawn(&mut self, handle: VisualHandle) {
            self.state.borrow_mut().live.retain(|h| *h != handle.0);
        }
    }

    fn registry() -> (RemoteActorRegistry, Rc<RefCell<SceneState>>) {
        let (scene, state) = RecordingScene::new();
        (RemoteActorRegistry::new(Box::new(scene)), state)
    }

    fn id(s: &str) -> ParticipantId {
        s.to_string()
    }

    #[test]
    fn test_actor_count_tracks_distinct_adds_minus_removes() {
        let (mut reg, _) = registry();
        reg.add_actor(&id("a"), "A");
        reg.add_actor(&id("b"), "B");
        reg.add_actor(&id("a"), "A again"); // replayed add
        assert_eq!(reg.len(), 2);

        reg.remove_actor(&id("a"));
        reg.remove_actor(&id("a")); // unknown id: no-op
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_duplicate_add_keeps_original_proxy() {
        let (mut reg, state) = registry();
        reg.add_actor(&id("a"), "A");
        reg.add_actor(&id("a"), "A");
        assert_eq!(state.borrow().live.len(), 1);
        assert_eq!(reg.get(&id("a")).unwrap().display_name, "A");
    }

    #[test]
    fn test_clear_releases_every_visual() {
        let (mut reg, state) = registry();
        reg.add_actor(&id("a"), "A");
        reg.add_actor(&id("b"), "B");
        reg.clear();
        assert!(reg.is_empty());
        assert!(state.borrow().live.is_empty());
    }

    #[test]
    fn test_tick_converges_on_target() {
        let (mut reg, _) = registry();
        reg.add_actor(&id("a"), "A");
        let target = Vec3::new(10.0, 0.0, 5.0);
        reg.update_target(&id("a"), target, 1.0);

        // Two seconds of 60 Hz frames is 20 time constants; the actor
        // must be essentially at the target.
        for _ in 0..120 {
            reg.tick(1.0 / 60.0);
        }
        let actor = reg.get(&id("a")).unwrap();
        assert!(actor.current_position.distance(target) < 1e-3);
        assert!((actor.current_yaw - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_tick_is_frame_rate_independent() {
        let (mut reg_fast, _) = registry();
        let (mut reg_slow, _) = registry();
        for reg in [&mut reg_fast, &mut reg_slow] {
            reg.add_actor(&id("a"), "A");
            reg.update_target(&id("a"), Vec3::new(8.0, 0.0, 0.0), 0.0);
        }

        // Same total elapsed time, different frame sizes.
        for _ in 0..100 {
            reg_fast.tick(0.01);
        }
        for _ in 0..10 {
            reg_slow.tick(0.1);
        }

        let fast = reg_fast.get(&id("a")).unwrap().current_position;
        let slow = reg_slow.get(&id("a")).unwrap().current_position;
        // Exponential smoothing composes: both land near the analytic
        // 1 - e^(-t/tau) fraction of the distance.
        assert!(fast.distance(slow) < 0.3);
    }

    #[test]
    fn test_repeated_identical_target_is_idempotent() {
        let (mut reg_once, _) = registry();
        let (mut reg_twice, _) = registry();
        let target = Vec3::new(4.0, 0.0, 4.0);
        for reg in [&mut reg_once, &mut reg_twice] {
            reg.add_actor(&id("a"), "A");
        }
        reg_once.update_target(&id("a"), target, 0.5);
        reg_twice.update_target(&id("a"), target, 0.5);
        reg_twice.update_target(&id("a"), target, 0.5);

        reg_once.tick(0.016);
        reg_twice.tick(0.016);

        assert_eq!(
            reg_once.get(&id("a")).unwrap().current_position,
            reg_twice.get(&id("a")).unwrap().current_position
        );
    }

    #[test]
    fn test_death_hides_and_disables_hit_candidacy() {
        let (mut reg, state) = registry();
        reg.add_actor(&id("a"), "A");
        reg.set_alive(&id("a"), false);

        let s = state.borrow();
        assert_eq!(s.visible.get(&0), Some(&false));
        assert_eq!(s.hit_candidates.get(&0), Some(&false));
    }

    #[test]
    fn test_dead_actor_ignores_updates_and_interpolation() {
        let (mut reg, _) = registry();
        reg.add_actor(&id("a"), "A");
        reg.update_target(&id("a"), Vec3::new(2.0, 0.0, 0.0), 0.0);
        for _ in 0..60 {
            reg.tick(1.0 / 60.0);
        }
        let at_death = reg.get(&id("a")).unwrap().current_position;

        reg.set_alive(&id("a"), false);
        reg.update_target(&id("a"), Vec3::new(50.0, 0.0, 50.0), 0.0);
        reg.tick(0.1);

        assert_eq!(reg.get(&id("a")).unwrap().current_position, at_death);
    }

    #[test]
    fn test_revival_does_not_snap_from_a_stale_target() {
        let (mut reg, _) = registry();
        reg.add_actor(&id("a"), "A");
        reg.update_target(&id("a"), Vec3::new(3.0, 0.0, 0.0), 0.0);
        for _ in 0..30 {
            reg.tick(1.0 / 60.0);
        }
        let at_death = reg.get(&id("a")).unwrap().current_position;

        reg.set_alive(&id("a"), false);
        reg.set_alive(&id("a"), true);
        reg.update_target(&id("a"), Vec3::new(3.5, 0.0, 0.0), 0.0);
        reg.tick(1.0 / 60.0);

        // No discontinuity beyond a single interpolation step.
        let after = reg.get(&id("a")).unwrap().current_position;
        let max_step = at_death.distance(Vec3::new(3.5, 0.0, 0.0));
        assert!(after.distance(at_death) <= max_step);
        assert!(after.distance(at_death) < 0.1);
    }

    #[test]
    fn test_tick_with_no_actors_is_a_no_op() {
        let (mut reg, _) = registry();
        reg.tick(0.016);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_yaw_takes_the_shortest_arc() {
        use std::f32::consts::PI;
        let (mut reg, _) = registry();
        reg.add_actor(&id("a"), "A");
        // From just below +pi toward just above -pi: the short way is
        // through the seam, not back across zero.
        {
            let actor = reg.actors.get_mut(&id("a")).unwrap();
            actor.current_yaw = PI - 0.1;
        }
        reg.update_target(&id("a"), Vec3::ZERO, -PI + 0.1);
        reg.tick(0.016);

        let yaw = reg.get(&id("a")).unwrap().current_yaw;
        // Still near the seam, not dragged toward zero.
        assert!(yaw.abs() > PI - 0.2);
    }

    #[test]
    fn test_mock_scene_despawn_expectation() {
        let mut scene = MockActorScene::new();
        scene.expect_spawn().return_const(VisualHandle(7));
        scene
            .expect_despawn()
            .withf(|h| *h == VisualHandle(7))
            .times(1)
            .return_const(());

        let mut reg = RemoteActorRegistry::new(Box::new(scene));
        reg.add_actor(&id("a"), "A");
        reg.remove_actor(&id("a"));
    }
}
