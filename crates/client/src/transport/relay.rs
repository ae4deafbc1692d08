//! Event-relay adapter.
//!
//! Unlike the sync-room backend there is no authoritative state object:
//! membership and poses arrive as discrete relayed events, and the
//! roster at join time comes from the room status returned by the SDK.
//! That status seeds the `MembershipSnapshot`; everything after is a
//! one-to-one translation of relay signals into normalized events.
//!
//! The relay keys participants by the identity token we connect with,
//! so the local participant id is known the moment a room is entered.

use chrono::Utc;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tacops_protocol::{
    JoinTarget, MemberInfo, ParticipantId, Pose, RemoteStateUpdate, RoomConfig, RoomEvent,
    RoomInfo,
};

use crate::config::MultiplayerConfig;
use crate::error::TransportError;
use crate::identity::ClientIdentity;
use crate::ports::{
    RelayDriver, RelayRoomStatus, RelaySignal, RoomSession, RoomTransport, Subscription,
    RELAY_EVENT_ALIVE, RELAY_EVENT_PLAYER_STATE,
};
use crate::transport::EventFan;

/// Relayed pose broadcast, event code [`RELAY_EVENT_PLAYER_STATE`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerStatePayload {
    player_id: ParticipantId,
    pos: Vec3,
    rot_y: f32,
    #[serde(default)]
    ts: u64,
}

/// Relayed aliveness toggle, event code [`RELAY_EVENT_ALIVE`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlivePayload {
    player_id: ParticipantId,
    alive: bool,
}

pub struct RelayTransport {
    config: MultiplayerConfig,
    driver: Box<dyn RelayDriver>,
    identity: Option<ClientIdentity>,
    connected: bool,
    local_id: Option<ParticipantId>,
    /// Last lobby listing pushed by the relay.
    room_list: Vec<RoomInfo>,
    fan: EventFan,
}

impl RelayTransport {
    pub fn new(config: MultiplayerConfig, driver: Box<dyn RelayDriver>) -> Self {
        Self {
            config,
            driver,
            identity: None,
            connected: false,
            local_id: None,
            room_list: Vec::new(),
            fan: EventFan::new(),
        }
    }

    /// Leaving tears the connection down, so create/join may have to
    /// re-establish it from the stored identity.
    fn ensure_connected(&mut self) -> Result<(), TransportError> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(TransportError::NotInitialized)?
            .clone();
        if self.connected {
            return Ok(());
        }
        self.driver
            .connect(&self.config.app_id, &self.config.region, &identity.token)?;
        self.driver.set_display_name(&identity.display_name);
        self.connected = true;
        Ok(())
    }

    fn enter_room(&mut self, status: RelayRoomStatus) -> Result<RoomSession, TransportError> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(TransportError::NotInitialized)?;
        let local_id = identity.token.clone();

        let mut members = status.actors.clone();
        members.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        info!(room_id = %status.room_id, actors = members.len(), "joined relay room");

        self.fan.discard_queued();
        self.fan
            .queue(RoomEvent::MembershipSnapshot(members.clone()));
        self.local_id = Some(local_id.clone());

        Ok(RoomSession {
            room_id: status.room_id,
            name: status.name,
            local_participant_id: local_id,
            members,
        })
    }

    fn process_signal(&mut self, signal: RelaySignal) {
        match signal {
            RelaySignal::RoomList(list) => {
                self.room_list = list;
            }
            RelaySignal::ActorJoined {
                participant_id,
                display_name,
            } => {
                if Some(&participant_id) != self.local_id.as_ref() {
                    self.fan
                        .queue(RoomEvent::MemberJoined(MemberInfo::new(
                            participant_id,
                            display_name,
                        )));
                }
            }
            RelaySignal::ActorLeft { participant_id } => {
                if Some(&participant_id) != self.local_id.as_ref() {
                    self.fan.queue(RoomEvent::MemberLeft(participant_id));
                }
            }
            RelaySignal::Custom { code, payload } => self.process_custom(code, payload),
            RelaySignal::Disconnected { reason } => {
                info!(reason, "relay connection lost");
                self.connected = false;
                self.local_id = None;
                self.fan.queue(RoomEvent::Disconnected { reason });
            }
        }
    }

    fn process_custom(&mut self, code: u8, payload: serde_json::Value) {
        match code {
            RELAY_EVENT_PLAYER_STATE => {
                let state: PlayerStatePayload = match serde_json::from_value(payload) {
                    Ok(state) => state,
                    Err(err) => {
                        warn!(%err, "malformed player-state payload; dropping");
                        return;
                    }
                };
                if Some(&state.player_id) == self.local_id.as_ref() {
                    return;
                }
                self.fan.queue(RoomEvent::StateUpdate(RemoteStateUpdate {
                    participant_id: state.player_id,
                    pose: Pose::new(state.pos, state.rot_y),
                    sent_at_ms: state.ts,
                }));
            }
            RELAY_EVENT_ALIVE => {
                let state: AlivePayload = match serde_json::from_value(payload) {
                    Ok(state) => state,
                    Err(err) => {
                        warn!(%err, "malformed aliveness payload; dropping");
                        return;
                    }
                };
                if Some(&state.player_id) == self.local_id.as_ref() {
                    return;
                }
                self.fan.queue(RoomEvent::AliveChanged {
                    participant_id: state.player_id,
                    alive: state.alive,
                });
            }
            other => debug!(code = other, "ignoring unknown relay event code"),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl RoomTransport for RelayTransport {
    fn initialize(&mut self, identity: &ClientIdentity) -> Result<(), TransportError> {
        if self.identity.is_some() {
            return Ok(());
        }
        self.identity = Some(identity.clone());
        self.ensure_connected().inspect_err(|_| {
            self.identity = None;
        })?;
        info!(region = %self.config.region, user_id = %identity.token, "relay client ready");
        Ok(())
    }

    async fn create_room(&mut self, config: RoomConfig) -> Result<RoomSession, TransportError> {
        self.ensure_connected()?;
        if self.driver.in_room() {
            self.leave_room().await;
            self.ensure_connected()?;
        }
        let status = self
            .driver
            .create_room(&config.room_name, config.max_players)
            .await?;
        self.enter_room(status)
    }

    async fn join_room(&mut self, target: JoinTarget) -> Result<RoomSession, TransportError> {
        self.ensure_connected()?;
        if self.driver.in_room() {
            self.leave_room().await;
            self.ensure_connected()?;
        }
        let room_id = match &target {
            JoinTarget::RoomId(id) if !id.is_empty() => id.clone(),
            // The relay joins by id only; named joins resolve against
            // the lobby listing.
            JoinTarget::RoomName(name) if !name.is_empty() => self
                .room_list
                .iter()
                .find(|room| room.name == *name)
                .map(|room| room.room_id.clone())
                .ok_or_else(|| {
                    TransportError::connection(format!("no joinable room named '{name}'"))
                })?,
            _ => return Err(TransportError::MissingRoomIdentifier),
        };
        let status = self.driver.join_room(&room_id).await?;
        self.enter_room(status)
    }

    async fn leave_room(&mut self) {
        if !self.connected && self.local_id.is_none() {
            return;
        }
        self.driver.disconnect();
        self.connected = false;
        self.local_id = None;
        self.fan.discard_queued();
    }

    fn send_local_state(&mut self, pose: &Pose) {
        let Some(local_id) = self.local_id.clone() else {
            debug!("not in a room; dropping local state");
            return;
        };
        let payload = PlayerStatePayload {
            player_id: local_id,
            pos: pose.position,
            rot_y: pose.yaw,
            ts: Utc::now().timestamp_millis() as u64,
        };
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(err) = self.driver.raise_event(RELAY_EVENT_PLAYER_STATE, value) {
                    warn!(%err, "failed to relay local state");
                }
            }
            Err(err) => warn!(%err, "failed to encode local state"),
        }
    }

    async fn list_rooms(&mut self) -> Result<Vec<RoomInfo>, TransportError> {
        self.ensure_connected()?;
        // The lobby pushes listings asynchronously; serve the latest.
        Ok(self.room_list.clone())
    }

    fn subscribe(&mut self) -> Subscription {
        self.fan.subscribe()
    }

    fn pump(&mut self) {
        while let Some(signal) = self.driver.poll() {
            self.process_signal(signal);
        }
        self.fan.flush();
    }

    fn local_participant_id(&self) -> Option<ParticipantId> {
        self.local_id.clone()
    }
}
