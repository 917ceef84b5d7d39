//! Message types exchanged between clients and the authoritative service.
//!
//! All message types derive `Serialize` and `Deserialize` for MessagePack
//! transport. The caller identity for remote actions travels in the
//! [`headers::IDENTITY`] NATS header, not in the payload.

use std::fmt;

use arena_input::{ControlState, TransformSnapshot};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table holding one row per registered player.
pub const PLAYER_TABLE: &str = "player";

/// Subscription query every client issues after connecting.
pub const PLAYER_QUERY: &str = "SELECT * FROM player";

// ── Identity ────────────────────────────────────────────────────────────────

/// Stable identity assigned to a connection by the service at handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(pub Uuid);

impl Identity {
    /// Mint a fresh random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The short hex prefix used in logs and status text.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Player rows ─────────────────────────────────────────────────────────────

/// Playable character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Wizard,
    Paladin,
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wizard => "Wizard",
            Self::Paladin => "Paladin",
        })
    }
}

/// Authoritative per-player row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub identity: Identity,
    pub username: String,
    pub character_class: CharacterClass,
    pub position: Vec3,
    /// Euler rotation in radians, `y` is yaw.
    pub rotation: Vec3,
    pub current_animation: String,
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    /// Highest input sequence the service has accepted for this player.
    pub last_input_seq: u32,
}

impl PlayerRecord {
    /// A freshly registered player at `position` with full stats.
    #[must_use]
    pub fn spawned(
        identity: Identity,
        username: impl Into<String>,
        character_class: CharacterClass,
        position: Vec3,
    ) -> Self {
        Self {
            identity,
            username: username.into(),
            character_class,
            position,
            rotation: Vec3::ZERO,
            current_animation: "idle".to_string(),
            health: 100,
            max_health: 100,
            mana: 100,
            max_mana: 100,
            last_input_seq: 0,
        }
    }

    /// The row's pose as a transform snapshot.
    #[must_use]
    pub fn transform(&self) -> TransformSnapshot {
        TransformSnapshot::new(self.position, self.rotation)
    }
}

// ── Session establishment ───────────────────────────────────────────────────

/// Opens a session. Published on [`subjects::handshake`](crate::subjects::handshake).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Logical database the client wants to join.
    pub database: String,
    /// Whether reads should wait for durable confirmation.
    pub confirmed_reads: bool,
}

/// Reply to a [`HandshakeRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAccepted {
    pub identity: Identity,
}

/// Issues the subscription query. Published on
/// [`subjects::subscribe`](crate::subjects::subscribe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub identity: Identity,
    pub query: String,
}

/// Reply to a [`SubscribeRequest`]; `Applied` carries the backfill rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubscriptionReply {
    Applied { rows: Vec<PlayerRecord> },
    Error { reason: String },
}

/// Announces a local teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disconnect {
    pub identity: Identity,
}

// ── Remote actions ──────────────────────────────────────────────────────────

/// Argument of the `register_player` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPlayer {
    pub username: String,
    pub character_class: CharacterClass,
}

/// Argument of the `update_player_input` action: the sequenced input plus
/// the client's locally predicted pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerInput {
    pub input: ControlState,
    pub client_pos: Vec3,
    pub client_rot: Vec3,
    pub client_animation: String,
}

/// A named remote action with its single structured argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReducerCall {
    RegisterPlayer(RegisterPlayer),
    UpdatePlayerInput(UpdatePlayerInput),
}

impl ReducerCall {
    /// Action name, used as the last subject token.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterPlayer(_) => "register_player",
            Self::UpdatePlayerInput(_) => "update_player_input",
        }
    }
}

/// Reply to a [`ReducerCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReducerOutcome {
    Ok,
    Rejected { reason: String },
}

// ── Table changes ───────────────────────────────────────────────────────────

/// A row change pushed to every subscribed client, in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableEvent {
    Insert(PlayerRecord),
    Update {
        old: PlayerRecord,
        new: PlayerRecord,
    },
    Delete(PlayerRecord),
}

impl TableEvent {
    /// Identity of the row this event touches.
    #[must_use]
    pub fn identity(&self) -> Identity {
        match self {
            Self::Insert(row) | Self::Delete(row) => row.identity,
            Self::Update { new, .. } => new.identity,
        }
    }
}

// ── NATS header keys ────────────────────────────────────────────────────────

/// NATS header keys used for routing metadata.
pub mod headers {
    /// Identity of the connection invoking a remote action.
    pub const IDENTITY: &str = "arena-identity";
}
