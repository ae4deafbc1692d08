//! Synchronized-room-state adapter.
//!
//! The backend pushes full authoritative room snapshots; this adapter
//! diffs each snapshot against the membership it already knows and
//! emits normalized add/remove/alive events, plus a `StateUpdate` per
//! remote participant. The first snapshot after a join becomes the
//! `MembershipSnapshot`, emitted before any diff event, so downstream
//! code never double-adds a pre-existing participant.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use tacops_protocol::{
    ClientMessage, JoinTarget, MemberInfo, ParticipantId, Pose, RemoteStateUpdate, RoomConfig,
    RoomEvent, RoomInfo,
};

use crate::config::MultiplayerConfig;
use crate::error::TransportError;
use crate::identity::ClientIdentity;
use crate::ports::{
    RoomSession, RoomTransport, Subscription, SyncRoomDriver, SyncRoomHandle, SyncRoomSignal,
};
use crate::transport::EventFan;

pub struct SyncRoomTransport {
    config: MultiplayerConfig,
    driver: Box<dyn SyncRoomDriver>,
    identity: Option<ClientIdentity>,
    room: Option<Box<dyn SyncRoomHandle>>,
    /// Membership as of the last processed snapshot.
    known: HashMap<ParticipantId, MemberInfo>,
    snapshot_emitted: bool,
    fan: EventFan,
}

impl SyncRoomTransport {
    pub fn new(config: MultiplayerConfig, driver: Box<dyn SyncRoomDriver>) -> Self {
        Self {
            config,
            driver,
            identity: None,
            room: None,
            known: HashMap::new(),
            snapshot_emitted: false,
            fan: EventFan::new(),
        }
    }

    fn identity(&self) -> Result<&ClientIdentity, TransportError> {
        self.identity.as_ref().ok_or(TransportError::NotInitialized)
    }

    /// Common post-join wiring: announce ourselves, reset diff state.
    fn enter_room(&mut self, room: Box<dyn SyncRoomHandle>) -> Result<RoomSession, TransportError> {
        let identity = self.identity()?.clone();
        let mut room = room;
        let join = ClientMessage::Join {
            display_name: identity.display_name.clone(),
            equipment: identity.equipment,
        };
        if let Err(err) = room.send(&join) {
            warn!(%err, "failed to send join announcement");
        }

        let session = RoomSession {
            room_id: room.room_id(),
            name: room.room_name(),
            local_participant_id: room.local_session_id(),
            members: Vec::new(),
        };
        info!(room_id = %session.room_id, "joined sync room");

        self.known.clear();
        self.snapshot_emitted = false;
        self.fan.discard_queued();
        self.room = Some(room);
        Ok(session)
    }

    fn process_signal(&mut self, signal: SyncRoomSignal, local_id: &ParticipantId) {
        match signal {
            SyncRoomSignal::State(snapshot) => {
                let fresh: HashMap<ParticipantId, MemberInfo> = snapshot
                    .players
                    .iter()
                    .map(|p| {
                        (
                            p.session_id.clone(),
                            MemberInfo {
                                participant_id: p.session_id.clone(),
                                display_name: p.display_name.clone(),
                                team: None,
                                alive: p.alive,
                            },
                        )
                    })
                    .collect();

                if !self.snapshot_emitted {
                    self.snapshot_emitted = true;
                    let mut members: Vec<MemberInfo> = fresh.values().cloned().collect();
                    members.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
                    self.fan.queue(RoomEvent::MembershipSnapshot(members));
                } else {
                    for (id, member) in &fresh {
                        match self.known.get(id) {
                            None => self.fan.queue(RoomEvent::MemberJoined(member.clone())),
                            Some(previous) if previous.alive != member.alive => {
                                self.fan.queue(RoomEvent::AliveChanged {
                                    participant_id: id.clone(),
                                    alive: member.alive,
                                });
                            }
                            Some(_) => {}
                        }
                    }
                    for id in self.known.keys() {
                        if !fresh.contains_key(id) {
                            self.fan.queue(RoomEvent::MemberLeft(id.clone()));
                        }
                    }
                }

                // Full-state pose fan-out for every remote participant.
                // Re-applying an unchanged pose downstream is harmless.
                let now_ms = Utc::now().timestamp_millis() as u64;
                for player in &snapshot.players {
                    if &player.session_id == local_id {
                        continue;
                    }
                    self.fan.queue(RoomEvent::StateUpdate(RemoteStateUpdate {
                        participant_id: player.session_id.clone(),
                        pose: Pose::new(player.position, player.yaw),
                        sent_at_ms: now_ms,
                    }));
                }

                self.known = fresh;
            }
            SyncRoomSignal::PlayerState {
                session_id,
                position,
                yaw,
                sent_at_ms,
            } => {
                if &session_id != local_id {
                    self.fan.queue(RoomEvent::StateUpdate(RemoteStateUpdate {
                        participant_id: session_id,
                        pose: Pose::new(position, yaw),
                        sent_at_ms,
                    }));
                }
            }
            SyncRoomSignal::Error { code, message } => {
                warn!(code, message, "room error");
            }
            SyncRoomSignal::Left { reason } => {
                info!(reason, "server closed the room session");
                self.room = None;
                self.known.clear();
                self.snapshot_emitted = false;
                self.fan.queue(RoomEvent::Disconnected { reason });
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl RoomTransport for SyncRoomTransport {
    fn initialize(&mut self, identity: &ClientIdentity) -> Result<(), TransportError> {
        if self.identity.is_some() {
            return Ok(());
        }
        self.driver
            .connect(&self.config.server_url, &identity.token)?;
        info!(server_url = %self.config.server_url, user_id = %identity.token, "sync-room client ready");
        self.identity = Some(identity.clone());
        Ok(())
    }

    async fn create_room(&mut self, config: RoomConfig) -> Result<RoomSession, TransportError> {
        self.identity()?;
        if self.room.is_some() {
            self.leave_room().await;
        }
        let room = self.driver.create(&config).await?;
        self.enter_room(room)
    }

    async fn join_room(&mut self, target: JoinTarget) -> Result<RoomSession, TransportError> {
        self.identity()?;
        if self.room.is_some() {
            self.leave_room().await;
        }
        let room = match &target {
            JoinTarget::RoomId(id) if !id.is_empty() => self.driver.join_by_id(id).await?,
            JoinTarget::RoomName(name) if !name.is_empty() => {
                self.driver.join_by_name(name).await?
            }
            _ => return Err(TransportError::MissingRoomIdentifier),
        };
        self.enter_room(room)
    }

    async fn leave_room(&mut self) {
        // Dropping the handle releases the connection even when the
        // remote leave call fails.
        if let Some(mut room) = self.room.take() {
            if let Err(err) = room.leave() {
                warn!(%err, "remote leave failed; releasing connection anyway");
            }
        }
        self.known.clear();
        self.snapshot_emitted = false;
        self.fan.discard_queued();
    }

    fn send_local_state(&mut self, pose: &Pose) {
        let Some(room) = &mut self.room else {
            debug!("not in a room; dropping local state");
            return;
        };
        if let Err(err) = room.send(&ClientMessage::from_pose(pose)) {
            warn!(%err, "failed to send local state");
        }
    }

    async fn list_rooms(&mut self) -> Result<Vec<RoomInfo>, TransportError> {
        // The sync-room SDK exposes no lobby listing; degrade to empty.
        warn!("room listing unsupported on the sync-room backend; returning an empty list");
        Ok(Vec::new())
    }

    fn subscribe(&mut self) -> Subscription {
        self.fan.subscribe()
    }

    fn pump(&mut self) {
        let local_id = match &self.room {
            Some(room) => room.local_session_id(),
            None => {
                self.fan.flush();
                return;
            }
        };
        let mut signals = Vec::new();
        if let Some(room) = &mut self.room {
            while let Some(signal) = room.poll() {
                signals.push(signal);
            }
        }
        for signal in signals {
            self.process_signal(signal, &local_id);
        }
        self.fan.flush();
    }

    fn local_participant_id(&self) -> Option<ParticipantId> {
        self.room.as_ref().map(|r| r.local_session_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use glam::Vec3;

    use crate::ports::drivers::{MockSyncRoomDriver, PlayerSnapshot, RoomStateSnapshot};

    /// Scripted room handle: signals queued from the test, sent
    /// messages recorded for assertions. The shared state is
    /// `Arc<Mutex<..>>` so the handle can cross the `Send` bound the
    /// generated mock puts on its returned values.
    struct FakeRoom {
        signals: Arc<Mutex<VecDeque<SyncRoomSignal>>>,
        sent: Arc<Mutex<Vec<ClientMessage>>>,
        leave_calls: Arc<Mutex<u32>>,
        fail_leave: bool,
    }

    impl SyncRoomHandle for FakeRoom {
        fn room_id(&self) -> String {
            "room-1".to_string()
        }

        fn room_name(&self) -> String {
            "arena".to_string()
        }

        fn local_session_id(&self) -> ParticipantId {
            "C".to_string()
        }

        fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn poll(&mut self) -> Option<SyncRoomSignal> {
            self.signals.lock().unwrap().pop_front()
        }

        fn leave(&mut self) -> Result<(), TransportError> {
            *self.leave_calls.lock().unwrap() += 1;
            if self.fail_leave {
                Err(TransportError::connection("leave rejected"))
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        signals: Arc<Mutex<VecDeque<SyncRoomSignal>>>,
        sent: Arc<Mutex<Vec<ClientMessage>>>,
        leave_calls: Arc<Mutex<u32>>,
        transport: SyncRoomTransport,
    }

    fn harness(fail_leave: bool) -> Harness {
        let signals = Arc::new(Mutex::new(VecDeque::new()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let leave_calls = Arc::new(Mutex::new(0));

        let room = FakeRoom {
            signals: Arc::clone(&signals),
            sent: Arc::clone(&sent),
            leave_calls: Arc::clone(&leave_calls),
            fail_leave,
        };

        let mut driver = MockSyncRoomDriver::new();
        driver.expect_connect().returning(|_, _| Ok(()));
        driver
            .expect_join_by_id()
            .return_once(move |_| Ok(Box::new(room) as Box<dyn SyncRoomHandle>));

        let transport = SyncRoomTransport::new(MultiplayerConfig::default(), Box::new(driver));
        Harness {
            signals,
            sent,
            leave_calls,
            transport,
        }
    }

    fn player(id: &str, alive: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            session_id: id.to_string(),
            display_name: id.to_string(),
            position: Vec3::ZERO,
            yaw: 0.0,
            alive,
        }
    }

    fn snapshot(players: Vec<PlayerSnapshot>) -> SyncRoomSignal {
        SyncRoomSignal::State(RoomStateSnapshot {
            room_name: "arena".to_string(),
            players,
        })
    }

    fn drain(sub: &mut Subscription) -> Vec<RoomEvent> {
        std::iter::from_fn(|| sub.poll_event()).collect()
    }

    async fn joined(h: &mut Harness) {
        h.transport
            .initialize(&ClientIdentity::new("user_c"))
            .unwrap();
        h.transport
            .join_room(JoinTarget::RoomId("room-1".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let mut driver = MockSyncRoomDriver::new();
        driver.expect_connect().times(1).returning(|_, _| Ok(()));
        let mut transport =
            SyncRoomTransport::new(MultiplayerConfig::default(), Box::new(driver));

        let identity = ClientIdentity::new("user_c");
        transport.initialize(&identity).unwrap();
        transport.initialize(&identity).unwrap();
    }

    #[tokio::test]
    async fn test_join_requires_initialize() {
        let driver = MockSyncRoomDriver::new();
        let mut transport =
            SyncRoomTransport::new(MultiplayerConfig::default(), Box::new(driver));
        let result = transport
            .join_room(JoinTarget::RoomId("room-1".to_string()))
            .await;
        assert_eq!(result.unwrap_err(), TransportError::NotInitialized);
    }

    #[tokio::test]
    async fn test_empty_identifier_is_rejected() {
        let mut h = harness(false);
        h.transport
            .initialize(&ClientIdentity::new("user_c"))
            .unwrap();
        let result = h.transport.join_room(JoinTarget::RoomId(String::new())).await;
        assert_eq!(result.unwrap_err(), TransportError::MissingRoomIdentifier);
    }

    #[tokio::test]
    async fn test_join_announces_identity_and_equipment() {
        let mut h = harness(false);
        joined(&mut h).await;

        let sent = h.sent.lock().unwrap();
        assert!(matches!(
            &sent[0],
            ClientMessage::Join { display_name, .. } if display_name == "Player"
        ));
    }

    #[tokio::test]
    async fn test_first_snapshot_becomes_membership_snapshot_before_diffs() {
        let mut h = harness(false);
        joined(&mut h).await;
        let mut sub = h.transport.subscribe();

        h.signals
            .lock().unwrap()
            .push_back(snapshot(vec![player("A", true), player("B", true), player("C", true)]));
        h.transport.pump();

        let events = drain(&mut sub);
        match &events[0] {
            RoomEvent::MembershipSnapshot(members) => {
                let ids: Vec<&str> =
                    members.iter().map(|m| m.participant_id.as_str()).collect();
                assert_eq!(ids, vec!["A", "B", "C"]);
            }
            other => panic!("expected membership snapshot first, got {other:?}"),
        }
        // No MemberJoined may accompany the initial snapshot.
        assert!(!events
            .iter()
            .any(|e| matches!(e, RoomEvent::MemberJoined(_))));
        // Remote poses follow; the local participant is excluded.
        let update_ids: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                RoomEvent::StateUpdate(u) => Some(u.participant_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(update_ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_redundant_snapshot_produces_no_membership_events() {
        let mut h = harness(false);
        joined(&mut h).await;
        let mut sub = h.transport.subscribe();

        let players = vec![player("A", true), player("B", true), player("C", true)];
        h.signals.lock().unwrap().push_back(snapshot(players.clone()));
        h.transport.pump();
        drain(&mut sub);

        h.signals.lock().unwrap().push_back(snapshot(players));
        h.transport.pump();
        let events = drain(&mut sub);
        assert!(events.iter().all(|e| matches!(e, RoomEvent::StateUpdate(_))));
    }

    #[tokio::test]
    async fn test_snapshot_diff_emits_join_leave_and_alive_changes() {
        let mut h = harness(false);
        joined(&mut h).await;
        let mut sub = h.transport.subscribe();

        h.signals
            .lock().unwrap()
            .push_back(snapshot(vec![player("A", true), player("C", true)]));
        h.transport.pump();
        drain(&mut sub);

        // A dies, B joins, and in a later snapshot A leaves.
        h.signals
            .lock().unwrap()
            .push_back(snapshot(vec![player("A", false), player("B", true), player("C", true)]));
        h.signals
            .lock().unwrap()
            .push_back(snapshot(vec![player("B", true), player("C", true)]));
        h.transport.pump();

        let events = drain(&mut sub);
        assert!(events.iter().any(|e| matches!(
            e,
            RoomEvent::AliveChanged { participant_id, alive: false } if participant_id == "A"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            RoomEvent::MemberJoined(m) if m.participant_id == "B"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, RoomEvent::MemberLeft(id) if id == "A")));
    }

    #[tokio::test]
    async fn test_relayed_player_state_is_forwarded() {
        let mut h = harness(false);
        joined(&mut h).await;
        let mut sub = h.transport.subscribe();

        h.signals.lock().unwrap().push_back(SyncRoomSignal::PlayerState {
            session_id: "A".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            yaw: 0.7,
            sent_at_ms: 42,
        });
        h.transport.pump();

        let events = drain(&mut sub);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RoomEvent::StateUpdate(u) if u.participant_id == "A" && u.sent_at_ms == 42
        ));
    }

    #[tokio::test]
    async fn test_leave_without_session_is_a_no_op() {
        let mut driver = MockSyncRoomDriver::new();
        driver.expect_connect().returning(|_, _| Ok(()));
        let mut transport =
            SyncRoomTransport::new(MultiplayerConfig::default(), Box::new(driver));
        transport.leave_room().await; // must not panic or error
        assert!(transport.local_participant_id().is_none());
    }

    #[tokio::test]
    async fn test_failed_remote_leave_still_releases_the_connection() {
        let mut h = harness(true);
        joined(&mut h).await;

        h.transport.leave_room().await;
        assert_eq!(*h.leave_calls.lock().unwrap(), 1);
        assert!(h.transport.local_participant_id().is_none());
        // Sending after teardown is a silent drop, not a panic.
        h.transport.send_local_state(&Pose::ORIGIN);
    }

    #[tokio::test]
    async fn test_room_list_degrades_to_empty() {
        let mut h = harness(false);
        h.transport
            .initialize(&ClientIdentity::new("user_c"))
            .unwrap();
        assert!(h.transport.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_side_disconnect_is_surfaced() {
        let mut h = harness(false);
        joined(&mut h).await;
        let mut sub = h.transport.subscribe();

        h.signals.lock().unwrap().push_back(SyncRoomSignal::Left {
            reason: "kicked".to_string(),
        });
        h.transport.pump();

        let events = drain(&mut sub);
        assert!(events
            .iter()
            .any(|e| matches!(e, RoomEvent::Disconnected { reason } if reason == "kicked")));
        assert!(h.transport.local_participant_id().is_none());
    }
}
