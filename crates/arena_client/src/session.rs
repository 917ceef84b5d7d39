//! Connection session state machine.
//!
//! [`Session`] holds everything one logical client knows about its
//! connection: lifecycle state, identity, sequencer, send throttle, and the
//! reconciliation store. It performs no I/O; the runner feeds it network
//! outcomes and timer firings and transmits whatever it hands back.
//!
//! ```text
//! Idle ─handshake─▶ Connecting ─identity─▶ Unregistered ─registered─▶ Registered
//!                        │                       │                        │
//!                        └───────────────────────┴────────────────────────┴─▶ Disconnected
//! ```
//!
//! `Disconnected` is terminal: reconnecting means building a new session.

use arena_input::{ControlState, Sequencer, TransformSnapshot};
use arena_net::messages::{
    HandshakeRequest, ReducerCall, RegisterPlayer, SubscribeRequest, UpdatePlayerInput,
};
use arena_net::{CharacterClass, Identity, PlayerRecord, TableEvent};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::status::ConnectionStatus;
use crate::store::{PlayerView, ReconciliationStore, StoreChange};
use crate::tick::TickThrottle;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, handshake not started.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Identity assigned, player not registered yet.
    Unregistered,
    /// Player registered; ticks transmit.
    Registered,
    /// Torn down. Terminal.
    Disconnected,
}

/// Proof that the handshake completed. Table listeners must be attached
/// before calling [`AttachListeners::attached`], which is the only way to
/// obtain the subscription request; otherwise backfill rows are missed.
#[derive(Debug)]
#[must_use = "attach table listeners, then call `attached` to get the subscription request"]
pub struct AttachListeners {
    identity: Identity,
    query: String,
}

impl AttachListeners {
    /// Identity the listeners are attached for.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Confirm the listeners are attached and build the subscription request.
    pub fn attached(self) -> SubscribeRequest {
        SubscribeRequest {
            identity: self.identity,
            query: self.query,
        }
    }
}

/// State for one logical client connection.
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    state: SessionState,
    identity: Option<Identity>,
    sequencer: Sequencer,
    throttle: TickThrottle,
    store: ReconciliationStore,
    status: watch::Sender<ConnectionStatus>,
    last_error: Option<String>,
    ticks_attempted: u64,
    transmissions: u64,
}

impl Session {
    /// Create an idle session.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::idle());
        let throttle = TickThrottle::new(config.tick_interval);
        Self {
            config,
            state: SessionState::Idle,
            identity: None,
            sequencer: Sequencer::new(),
            throttle,
            store: ReconciliationStore::new(),
            status,
            last_error: None,
            ticks_attempted: 0,
            transmissions: 0,
        }
    }

    fn require(&self, expected: SessionState) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status.send_replace(ConnectionStatus {
            state: self.state,
            identity: self.identity,
            last_error: self.last_error.clone(),
        });
    }

    fn note_error(&mut self, reason: String) {
        self.last_error = Some(reason);
        self.publish_status();
    }

    /// Start the handshake: `Idle → Connecting`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless the session is idle.
    pub fn begin_handshake(&mut self) -> Result<HandshakeRequest, ClientError> {
        self.require(SessionState::Idle)?;
        info!(database = %self.config.database, "handshake started");
        self.transition(SessionState::Connecting);
        Ok(HandshakeRequest {
            database: self.config.database.clone(),
            confirmed_reads: self.config.confirmed_reads,
        })
    }

    /// Handshake succeeded: `Connecting → Unregistered`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless a handshake is in flight.
    pub fn on_connected(&mut self, identity: Identity) -> Result<AttachListeners, ClientError> {
        self.require(SessionState::Connecting)?;
        info!(%identity, "connected");
        self.identity = Some(identity);
        self.store.set_local_identity(identity);
        self.transition(SessionState::Unregistered);
        Ok(AttachListeners {
            identity,
            query: self.config.query.clone(),
        })
    }

    /// Merge the backfill delivered with the applied subscription.
    pub fn on_subscription_applied(&mut self, rows: Vec<PlayerRecord>) -> StoreChange {
        if !self.is_connected() {
            return StoreChange::Unchanged;
        }
        info!(rows = rows.len(), "subscription applied");
        self.store.backfill(rows)
    }

    /// The subscription was refused; the session stays up.
    pub fn on_subscription_error(&mut self, reason: String) {
        warn!(%reason, "subscription error");
        self.note_error(format!("subscription error: {reason}"));
    }

    /// Build the registration action.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless connected and unregistered.
    pub fn registration(
        &self,
        username: impl Into<String>,
        character_class: CharacterClass,
    ) -> Result<ReducerCall, ClientError> {
        self.require(SessionState::Unregistered)?;
        Ok(ReducerCall::RegisterPlayer(RegisterPlayer {
            username: username.into(),
            character_class,
        }))
    }

    /// Registration accepted: `Unregistered → Registered`. Arms the tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidState`] unless connected and unregistered.
    pub fn on_registered(&mut self) -> Result<(), ClientError> {
        self.require(SessionState::Unregistered)?;
        info!(identity = ?self.identity, "player registered");
        self.throttle.reset();
        self.transition(SessionState::Registered);
        Ok(())
    }

    /// A remote action was refused. Logged; the session carries on.
    pub fn on_action_rejected(&mut self, action: &str, reason: &str) {
        warn!(action, reason, "action rejected");
        self.note_error(format!("{action} rejected: {reason}"));
    }

    /// A transmission failed mid-session. Logged; ticking carries on.
    pub fn on_send_failed(&mut self, error: &str) {
        warn!(error, "failed to send input");
        self.note_error(format!("send failed: {error}"));
    }

    /// Apply a table-change notification to the store.
    pub fn on_table_event(&mut self, event: TableEvent) -> StoreChange {
        if !self.is_connected() {
            trace!("dropping table event for a session that is not connected");
            return StoreChange::Unchanged;
        }
        self.store.apply(event)
    }

    /// One tick-source firing.
    ///
    /// No-op unless registered (this is the liveness guard) and unless the
    /// throttle allows a send. Otherwise stamps the next sequence into
    /// `control`, runs the gate, and returns the action to transmit.
    pub fn tick(
        &mut self,
        now: Instant,
        control: &mut ControlState,
        pose: TransformSnapshot,
    ) -> Option<UpdatePlayerInput> {
        if self.state != SessionState::Registered {
            trace!(state = ?self.state, "tick ignored");
            return None;
        }
        if !self.throttle.ready(now) {
            return None;
        }
        self.ticks_attempted += 1;
        let input = self.sequencer.stamp_and_gate(control)?;
        self.transmissions += 1;
        trace!(sequence = input.sequence, "input gated for send");
        Some(UpdatePlayerInput {
            input,
            client_pos: pose.position,
            client_rot: pose.rotation,
            client_animation: input.animation().to_string(),
        })
    }

    /// Tear the session down: stops ticking and clears every cached row.
    ///
    /// Returns `false` if the session was already disconnected.
    pub fn disconnect(&mut self, reason: Option<String>) -> bool {
        if self.state == SessionState::Disconnected {
            return false;
        }
        info!(identity = ?self.identity, reason = reason.as_deref().unwrap_or("local"), "disconnected");
        if let Some(reason) = reason {
            self.last_error = Some(reason);
        }
        self.store.clear();
        self.throttle.reset();
        self.transition(SessionState::Disconnected);
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity assigned at handshake.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Whether the handshake completed and the session is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            SessionState::Unregistered | SessionState::Registered
        )
    }

    /// Whether ticks transmit.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.state == SessionState::Registered
    }

    /// The reconciliation store.
    #[must_use]
    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    /// Read handle for the render layer.
    #[must_use]
    pub fn players(&self) -> PlayerView {
        self.store.view()
    }

    /// Status updates for the UI layer.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Last error reason, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The last snapshot that went out.
    #[must_use]
    pub fn last_sent(&self) -> Option<&ControlState> {
        self.sequencer.last_sent()
    }

    /// Ticks that passed the throttle while registered.
    #[must_use]
    pub fn ticks_attempted(&self) -> u64 {
        self.ticks_attempted
    }

    /// Inputs handed out for transmission.
    #[must_use]
    pub fn transmissions(&self) -> u64 {
        self.transmissions
    }

    /// The configuration this session was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
