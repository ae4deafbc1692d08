//! Session bootstrap: the state machine tying transport, registry and
//! kill feedback together.
//!
//! One active room session per client. Joining subscribes to transport
//! events and forwards them into the registry; leaving drops the
//! subscription before the registry is cleared, so no buffered event
//! ever mutates a cleared registry. The host loop drives everything
//! through `pump` (events + outbound flush) followed by `tick`
//! (interpolation), in that order.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use tacops_protocol::{
    JoinTarget, MemberInfo, ParticipantId, Pose, RoomConfig, RoomEvent, RoomInfo,
};

use crate::actors::RemoteActorRegistry;
use crate::error::TransportError;
use crate::hits::LastHitTracker;
use crate::identity::ClientIdentity;
use crate::ports::{RoomTransport, Subscription};

/// Outbound pose sends are coalesced to at most one per interval.
pub const MIN_SEND_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    InLobby,
    InRoom,
}

/// Events the session surfaces to the host (HUD, audio cues).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    MemberJoined(MemberInfo),
    MemberLeft(ParticipantId),
    /// A remote death matched our last hit within the window.
    KillConfirmed {
        participant_id: ParticipantId,
        headshot: bool,
    },
    Disconnected { reason: String },
}

/// Latest local pose waiting to go out, rate-limited.
#[derive(Debug, Default)]
struct PendingOutboundState {
    pending: Option<Pose>,
    last_sent: Option<Instant>,
}

impl PendingOutboundState {
    /// Replace whatever was queued; only the newest pose matters.
    fn set(&mut self, pose: Pose) {
        self.pending = Some(pose);
    }

    fn take_due(&mut self, now: Instant) -> Option<Pose> {
        self.pending?;
        if let Some(last) = self.last_sent {
            if now.duration_since(last) < MIN_SEND_INTERVAL {
                return None;
            }
        }
        self.last_sent = Some(now);
        self.pending.take()
    }

    fn reset(&mut self) {
        self.pending = None;
        self.last_sent = None;
    }
}

pub struct SessionBootstrap {
    transport: Box<dyn RoomTransport>,
    registry: RemoteActorRegistry,
    hits: LastHitTracker,
    state: SessionState,
    local_id: Option<ParticipantId>,
    members: HashMap<ParticipantId, MemberInfo>,
    subscription: Option<Subscription>,
    outbound: PendingOutboundState,
    notices: Vec<SessionNotice>,
}

impl SessionBootstrap {
    pub fn new(transport: Box<dyn RoomTransport>, registry: RemoteActorRegistry) -> Self {
        Self {
            transport,
            registry,
            hits: LastHitTracker::new(),
            state: SessionState::Idle,
            local_id: None,
            members: HashMap::new(),
            subscription: None,
            outbound: PendingOutboundState::default(),
            notices: Vec::new(),
        }
    }

    pub fn initialize(&mut self, identity: &ClientIdentity) -> Result<(), TransportError> {
        self.transport.initialize(identity)?;
        if self.state == SessionState::Idle {
            self.state = SessionState::InLobby;
        }
        Ok(())
    }

    pub async fn create_room(&mut self, config: RoomConfig) -> Result<(), TransportError> {
        self.teardown_current_session().await;
        self.state = SessionState::Connecting;
        match self.transport.create_room(config).await {
            Ok(session) => {
                self.enter(session.local_participant_id, session.members);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "room create rejected");
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    pub async fn join_room(&mut self, target: JoinTarget) -> Result<(), TransportError> {
        self.teardown_current_session().await;
        self.state = SessionState::Connecting;
        match self.transport.join_room(target).await {
            Ok(session) => {
                self.enter(session.local_participant_id, session.members);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "room join rejected");
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn enter(&mut self, local_id: ParticipantId, roster: Vec<MemberInfo>) {
        // Registry population waits for the membership snapshot event;
        // the roster here is only the initial member listing.
        self.members = roster
            .into_iter()
            .map(|m| (m.participant_id.clone(), m))
            .collect();
        self.local_id = Some(local_id);
        self.subscription = Some(self.transport.subscribe());
        self.state = SessionState::InRoom;
    }

    pub async fn leave_room(&mut self) {
        self.teardown_current_session().await;
        self.state = SessionState::Idle;
    }

    async fn teardown_current_session(&mut self) {
        if self.subscription.is_none() && self.local_id.is_none() {
            return;
        }
        info!("leaving room");
        // Subscription first: once dropped, nothing can reach the
        // registry we are about to clear.
        self.subscription = None;
        self.transport.leave_room().await;
        self.registry.clear();
        self.members.clear();
        self.local_id = None;
        self.hits.clear();
        self.outbound.reset();
    }

    /// Best-effort lobby listing; transport failure degrades to empty.
    pub async fn list_rooms(&mut self) -> Vec<RoomInfo> {
        match self.transport.list_rooms().await {
            Ok(rooms) => rooms,
            Err(err) => {
                warn!(%err, "room listing failed");
                Vec::new()
            }
        }
    }

    /// Queue the local pose; actually sent on the next `pump`, at most
    /// once per [`MIN_SEND_INTERVAL`].
    pub fn set_local_pose(&mut self, pose: Pose) {
        self.outbound.set(pose);
    }

    /// Record a local weapon hit for later kill confirmation.
    pub fn record_hit(&mut self, target_id: ParticipantId, headshot: bool, now: Instant) {
        self.hits.record_hit(target_id, headshot, now);
    }

    /// One frame of network work: poll the transport, apply room events
    /// to the registry and roster, then flush the outbound pose. Runs
    /// before `tick` so membership changes land before interpolation.
    pub fn pump(&mut self, now: Instant) {
        self.transport.pump();

        let mut events = Vec::new();
        if let Some(sub) = &mut self.subscription {
            while let Some(event) = sub.poll_event() {
                events.push(event);
            }
        }
        let mut disconnected = None;
        for event in events {
            match event {
                RoomEvent::Disconnected { reason } => {
                    disconnected = Some(reason);
                    break;
                }
                other => self.apply_event(other, now),
            }
        }
        if let Some(reason) = disconnected {
            self.handle_disconnect(reason);
            return;
        }

        if self.state == SessionState::InRoom {
            if let Some(pose) = self.outbound.take_due(now) {
                self.transport.send_local_state(&pose);
            }
        }
    }

    /// Advance interpolation. Call after `pump`.
    pub fn tick(&mut self, dt: f32) {
        self.registry.tick(dt);
    }

    fn apply_event(&mut self, event: RoomEvent, now: Instant) {
        match event {
            RoomEvent::MembershipSnapshot(roster) => {
                self.members = roster
                    .iter()
                    .map(|m| (m.participant_id.clone(), m.clone()))
                    .collect();
                for member in roster {
                    if self.is_local(&member.participant_id) {
                        continue;
                    }
                    self.registry
                        .add_actor(&member.participant_id, &member.display_name);
                    if !member.alive {
                        self.registry.set_alive(&member.participant_id, false);
                    }
                }
            }
            RoomEvent::MemberJoined(member) => {
                if !self.is_local(&member.participant_id) {
                    self.registry
                        .add_actor(&member.participant_id, &member.display_name);
                    // A participant can arrive already dead (joined and
                    // died between two snapshots); mirror that.
                    if !member.alive {
                        self.registry.set_alive(&member.participant_id, false);
                    }
                }
                self.members
                    .insert(member.participant_id.clone(), member.clone());
                self.notices.push(SessionNotice::MemberJoined(member));
            }
            RoomEvent::MemberLeft(id) => {
                self.registry.remove_actor(&id);
                self.members.remove(&id);
                self.notices.push(SessionNotice::MemberLeft(id));
            }
            RoomEvent::AliveChanged {
                participant_id,
                alive,
            } => {
                if let Some(member) = self.members.get_mut(&participant_id) {
                    member.alive = alive;
                }
                self.registry.set_alive(&participant_id, alive);
                if !alive {
                    if let Some(headshot) = self.hits.confirm_kill(&participant_id, now) {
                        self.notices.push(SessionNotice::KillConfirmed {
                            participant_id,
                            headshot,
                        });
                    }
                }
            }
            RoomEvent::StateUpdate(update) => {
                if !self.is_local(&update.participant_id) {
                    self.registry.update_target(
                        &update.participant_id,
                        update.pose.position,
                        update.pose.yaw,
                    );
                }
            }
            RoomEvent::Disconnected { .. } => unreachable!("handled in pump"),
        }
    }

    fn handle_disconnect(&mut self, reason: String) {
        warn!(reason, "room session dropped");
        self.subscription = None;
        self.registry.clear();
        self.members.clear();
        self.local_id = None;
        self.hits.clear();
        self.outbound.reset();
        self.state = SessionState::Idle;
        self.notices.push(SessionNotice::Disconnected { reason });
    }

    fn is_local(&self, id: &ParticipantId) -> bool {
        self.local_id.as_deref() == Some(id.as_str())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_participant_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    /// Current roster, local participant included.
    pub fn members(&self) -> Vec<MemberInfo> {
        let mut members: Vec<MemberInfo> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        members
    }

    pub fn registry(&self) -> &RemoteActorRegistry {
        &self.registry
    }

    /// Drain surfaced notices (HUD feed, kill confirmations).
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;

    use tacops_protocol::RemoteStateUpdate;

    use crate::ports::{ActorScene, RoomSession, VisualHandle};
    use crate::transport::EventFan;

    #[derive(Default)]
    struct TransportScript {
        fan: EventFan,
        sent: Vec<Pose>,
        leaves: u32,
        reject_join: bool,
    }

    struct FakeTransport {
        script: Rc<RefCell<TransportScript>>,
    }

    #[async_trait::async_trait(?Send)]
    impl RoomTransport for FakeTransport {
        fn initialize(&mut self, _: &ClientIdentity) -> Result<(), TransportError> {
            Ok(())
        }

        async fn create_room(&mut self, config: RoomConfig) -> Result<RoomSession, TransportError> {
            Ok(RoomSession {
                room_id: "r-created".to_string(),
                name: config.room_name,
                local_participant_id: "local".to_string(),
                members: Vec::new(),
            })
        }

        async fn join_room(&mut self, _: JoinTarget) -> Result<RoomSession, TransportError> {
            if self.script.borrow().reject_join {
                return Err(TransportError::connection("refused"));
            }
            Ok(RoomSession {
                room_id: "r-1".to_string(),
                name: "arena".to_string(),
                local_participant_id: "local".to_string(),
                members: vec![MemberInfo::new("local", "Me")],
            })
        }

        async fn leave_room(&mut self) {
            self.script.borrow_mut().leaves += 1;
        }

        fn send_local_state(&mut self, pose: &Pose) {
            self.script.borrow_mut().sent.push(*pose);
        }

        async fn list_rooms(&mut self) -> Result<Vec<RoomInfo>, TransportError> {
            Err(TransportError::connection("lobby down"))
        }

        fn subscribe(&mut self) -> Subscription {
            self.script.borrow_mut().fan.subscribe()
        }

        fn pump(&mut self) {
            self.script.borrow_mut().fan.flush();
        }

        fn local_participant_id(&self) -> Option<ParticipantId> {
            Some("local".to_string())
        }
    }

    /// Scene stub counting live visuals.
    #[derive(Default)]
    struct CountingScene {
        live: Rc<RefCell<i32>>,
    }

    impl ActorScene for CountingScene {
        fn spawn(&mut self, _: &ParticipantId, _: &str) -> VisualHandle {
            *self.live.borrow_mut() += 1;
            VisualHandle(*self.live.borrow() as u64)
        }

        fn set_visible(&mut self, _: VisualHandle, _: bool) {}
        fn set_transform(&mut self, _: VisualHandle, _: Vec3, _: f32) {}
        fn set_hit_candidate(&mut self, _: VisualHandle, _: bool) {}

        fn despawn(&mut self, _: VisualHandle) {
            *self.live.borrow_mut() -= 1;
        }
    }

    struct Harness {
        script: Rc<RefCell<TransportScript>>,
        live_visuals: Rc<RefCell<i32>>,
        session: SessionBootstrap,
    }

    fn harness() -> Harness {
        let script = Rc::new(RefCell::new(TransportScript::default()));
        let live = Rc::new(RefCell::new(0));
        let transport = FakeTransport {
            script: Rc::clone(&script),
        };
        let registry = RemoteActorRegistry::new(Box::new(CountingScene {
            live: Rc::clone(&live),
        }));
        let mut session = SessionBootstrap::new(Box::new(transport), registry);
        session.initialize(&ClientIdentity::new("local")).unwrap();
        Harness {
            script,
            live_visuals: live,
            session,
        }
    }

    fn queue(h: &Harness, event: RoomEvent) {
        h.script.borrow_mut().fan.queue(event);
    }

    fn snapshot_abc() -> RoomEvent {
        RoomEvent::MembershipSnapshot(vec![
            MemberInfo::new("a", "A"),
            MemberInfo::new("b", "B"),
            MemberInfo::new("local", "Me"),
        ])
    }

    async fn joined(h: &mut Harness) {
        h.session
            .join_room(JoinTarget::RoomId("r-1".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_join_moves_through_connecting_into_in_room() {
        let mut h = harness();
        assert_eq!(h.session.state(), SessionState::InLobby);
        joined(&mut h).await;
        assert_eq!(h.session.state(), SessionState::InRoom);
        assert_eq!(h.session.local_participant_id().map(String::as_str), Some("local"));
    }

    #[tokio::test]
    async fn test_rejected_join_falls_back_to_idle() {
        let mut h = harness();
        h.script.borrow_mut().reject_join = true;
        let result = h.session.join_room(JoinTarget::RoomId("r-1".to_string())).await;
        assert!(result.is_err());
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_membership_snapshot_populates_remote_actors_only() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        h.session.pump(Instant::now());

        // Two remote visuals; the local participant gets none.
        assert_eq!(h.session.registry().len(), 2);
        assert_eq!(*h.live_visuals.borrow(), 2);
        // Roster keeps all three.
        assert_eq!(h.session.members().len(), 3);
    }

    #[tokio::test]
    async fn test_membership_events_update_registry_and_roster() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        queue(&h, RoomEvent::MemberJoined(MemberInfo::new("c", "C")));
        queue(&h, RoomEvent::MemberLeft("a".to_string()));
        h.session.pump(Instant::now());

        assert_eq!(h.session.registry().len(), 2); // b and c
        assert!(h.session.registry().contains(&"c".to_string()));
        assert!(!h.session.registry().contains(&"a".to_string()));

        let notices = h.session.take_notices();
        assert!(notices
            .iter()
            .any(|n| matches!(n, SessionNotice::MemberJoined(m) if m.participant_id == "c")));
        assert!(notices
            .iter()
            .any(|n| matches!(n, SessionNotice::MemberLeft(id) if id == "a")));
    }

    #[tokio::test]
    async fn test_member_joining_already_dead_is_marked_dead() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        queue(
            &h,
            RoomEvent::MemberJoined(MemberInfo {
                alive: false,
                ..MemberInfo::new("c", "C")
            }),
        );
        h.session.pump(Instant::now());

        let actor = h.session.registry().get(&"c".to_string()).unwrap();
        assert!(!actor.alive);
        let member = h
            .session
            .members()
            .into_iter()
            .find(|m| m.participant_id == "c")
            .unwrap();
        assert!(!member.alive);
    }

    #[tokio::test]
    async fn test_state_updates_drive_interpolation_targets() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        queue(
            &h,
            RoomEvent::StateUpdate(RemoteStateUpdate {
                participant_id: "a".to_string(),
                pose: Pose::new(Vec3::new(10.0, 0.0, 0.0), 0.0),
                sent_at_ms: 1,
            }),
        );
        h.session.pump(Instant::now());

        // A full second of ticking converges onto the target.
        for _ in 0..60 {
            h.session.tick(1.0 / 60.0);
        }
        let actor = h.session.registry().get(&"a".to_string()).unwrap();
        assert!((actor.current_position.x - 10.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_death_within_the_window_confirms_the_kill() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        let now = Instant::now();
        h.session.pump(now);

        h.session.record_hit("a".to_string(), true, now);
        queue(
            &h,
            RoomEvent::AliveChanged {
                participant_id: "a".to_string(),
                alive: false,
            },
        );
        h.session.pump(now + Duration::from_secs(1));

        let notices = h.session.take_notices();
        assert!(notices.iter().any(|n| matches!(
            n,
            SessionNotice::KillConfirmed { participant_id, headshot: true } if participant_id == "a"
        )));
        // Roster reflects the death.
        let member = h
            .session
            .members()
            .into_iter()
            .find(|m| m.participant_id == "a")
            .unwrap();
        assert!(!member.alive);
    }

    #[tokio::test]
    async fn test_outbound_poses_are_rate_limited() {
        let mut h = harness();
        joined(&mut h).await;
        let t0 = Instant::now();

        h.session.set_local_pose(Pose::new(Vec3::X, 0.1));
        h.session.pump(t0);
        h.session.set_local_pose(Pose::new(Vec3::Y, 0.2));
        h.session.pump(t0 + Duration::from_millis(10)); // inside the window
        h.session.pump(t0 + Duration::from_millis(60)); // past it

        let sent = h.script.borrow().sent.clone();
        assert_eq!(sent.len(), 2);
        // Only the newest queued pose goes out after the window.
        assert_eq!(sent[1].position, Vec3::Y);
    }

    #[tokio::test]
    async fn test_leave_clears_registry_and_releases_visuals() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        h.session.pump(Instant::now());
        assert_eq!(*h.live_visuals.borrow(), 2);

        h.session.leave_room().await;

        assert_eq!(h.session.state(), SessionState::Idle);
        assert_eq!(h.session.registry().len(), 0);
        assert_eq!(*h.live_visuals.borrow(), 0);
        assert_eq!(h.script.borrow().leaves, 1);
        // Events raced in after teardown must not resurrect anything.
        queue(&h, RoomEvent::MemberJoined(MemberInfo::new("z", "Z")));
        h.session.pump(Instant::now());
        assert_eq!(h.session.registry().len(), 0);
    }

    #[tokio::test]
    async fn test_second_join_tears_down_the_first_session() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        h.session.pump(Instant::now());

        joined(&mut h).await;
        assert_eq!(h.script.borrow().leaves, 1);
        assert_eq!(h.session.registry().len(), 0);
        assert_eq!(h.session.state(), SessionState::InRoom);
    }

    #[tokio::test]
    async fn test_disconnect_event_resets_to_idle_and_notifies() {
        let mut h = harness();
        joined(&mut h).await;
        queue(&h, snapshot_abc());
        h.session.pump(Instant::now());

        queue(
            &h,
            RoomEvent::Disconnected {
                reason: "timeout".to_string(),
            },
        );
        h.session.pump(Instant::now());

        assert_eq!(h.session.state(), SessionState::Idle);
        assert_eq!(h.session.registry().len(), 0);
        assert!(h.session.take_notices().iter().any(|n| matches!(
            n,
            SessionNotice::Disconnected { reason } if reason == "timeout"
        )));
    }

    #[tokio::test]
    async fn test_room_listing_degrades_to_empty_on_failure() {
        let mut h = harness();
        assert!(h.session.list_rooms().await.is_empty());
    }
}
