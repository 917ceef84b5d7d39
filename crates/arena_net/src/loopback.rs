//! In-process authoritative service.
//!
//! [`LoopbackService`] implements [`Transport`] without a network. It keeps
//! the player table, applies remote actions the way the hosted service does,
//! and pushes table-change events to every attached listener in commit order.
//! Cloning the service shares the same table.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use glam::Vec3;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::NetError;
use crate::messages::{
    HandshakeAccepted, HandshakeRequest, Identity, PLAYER_TABLE, PlayerRecord, ReducerCall,
    RegisterPlayer, SubscribeRequest, TableEvent, UpdatePlayerInput,
};
use crate::transport::{EventStream, Transport};

/// Half-width of the square arena; accepted positions are clamped into it.
pub const ARENA_HALF_EXTENT: f32 = 100.0;

/// Accepted sequences retained per identity for inspection.
pub const ACCEPTED_LOG_CAPACITY: usize = 64;

/// Inputs accepted from one identity: a running total and the most recent
/// sequences.
#[derive(Debug, Default)]
struct AcceptedLog {
    count: u64,
    recent: VecDeque<u32>,
}

impl AcceptedLog {
    fn push(&mut self, sequence: u32) {
        self.count += 1;
        if self.recent.len() == ACCEPTED_LOG_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(sequence);
    }
}

#[derive(Debug, Default)]
struct Tables {
    connected: HashSet<Identity>,
    players: HashMap<Identity, PlayerRecord>,
    listeners: HashMap<Identity, mpsc::UnboundedSender<TableEvent>>,
    accepted: HashMap<Identity, AcceptedLog>,
    stalled_handshakes: usize,
}

impl Tables {
    fn broadcast(&mut self, event: &TableEvent) {
        self.listeners
            .retain(|_, tx| tx.unbounded_send(event.clone()).is_ok());
    }

    fn register(&mut self, identity: Identity, args: RegisterPlayer) -> Result<(), String> {
        if args.username.trim().is_empty() {
            return Err("username must not be empty".into());
        }
        if self.players.contains_key(&identity) {
            return Err("player already registered".into());
        }
        let row = PlayerRecord::spawned(identity, args.username, args.character_class, Vec3::ZERO);
        info!(%identity, username = %row.username, "player registered");
        self.players.insert(identity, row.clone());
        self.broadcast(&TableEvent::Insert(row));
        Ok(())
    }

    fn apply_input(&mut self, identity: Identity, args: UpdatePlayerInput) -> Result<(), String> {
        let Some(old) = self.players.get(&identity).cloned() else {
            return Err("player not registered".into());
        };
        if args.input.sequence <= old.last_input_seq {
            return Err(format!(
                "stale input sequence {} (last {})",
                args.input.sequence, old.last_input_seq
            ));
        }
        let mut new = old.clone();
        new.position = clamp_to_arena(args.client_pos);
        new.rotation = args.client_rot;
        new.current_animation = args.client_animation;
        new.last_input_seq = args.input.sequence;
        self.players.insert(identity, new.clone());
        self.accepted
            .entry(identity)
            .or_default()
            .push(args.input.sequence);
        self.broadcast(&TableEvent::Update { old, new });
        Ok(())
    }

    fn remove_player(&mut self, identity: Identity) -> bool {
        let Some(row) = self.players.remove(&identity) else {
            return false;
        };
        self.broadcast(&TableEvent::Delete(row));
        true
    }

    fn drop_session(&mut self, identity: Identity) {
        self.connected.remove(&identity);
        self.listeners.remove(&identity);
        self.remove_player(identity);
    }
}

fn clamp_to_arena(position: Vec3) -> Vec3 {
    Vec3::new(
        position.x.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT),
        position.y.max(0.0),
        position.z.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT),
    )
}

/// An in-process stand-in for the hosted authoritative service.
#[derive(Debug, Clone)]
pub struct LoopbackService {
    database: String,
    tables: Arc<Mutex<Tables>>,
}

impl LoopbackService {
    /// Create an empty service serving `database`.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    /// Make the next `count` handshakes hang forever.
    pub async fn stall_next_handshakes(&self, count: usize) {
        self.tables.lock().await.stalled_handshakes = count;
    }

    /// Drop a session from the service side: its listener stream ends and
    /// its player row is deleted.
    pub async fn kick(&self, identity: Identity) {
        info!(%identity, "kicking session");
        self.tables.lock().await.drop_session(identity);
    }

    /// Delete the player row for `identity` while leaving its connection and
    /// listener in place. Returns `false` if no such row existed.
    pub async fn remove_player(&self, identity: Identity) -> bool {
        info!(%identity, "removing player row");
        self.tables.lock().await.remove_player(identity)
    }

    /// Current row for `identity`.
    pub async fn player(&self, identity: Identity) -> Option<PlayerRecord> {
        self.tables.lock().await.players.get(&identity).cloned()
    }

    /// Number of rows in the player table.
    pub async fn player_count(&self) -> usize {
        self.tables.lock().await.players.len()
    }

    /// Number of inputs accepted for `identity` since it registered.
    pub async fn accepted_count(&self, identity: Identity) -> u64 {
        self.tables
            .lock()
            .await
            .accepted
            .get(&identity)
            .map_or(0, |log| log.count)
    }

    /// The most recent input sequences accepted for `identity`, oldest
    /// first. At most [`ACCEPTED_LOG_CAPACITY`] are kept.
    pub async fn accepted_sequences(&self, identity: Identity) -> Vec<u32> {
        self.tables
            .lock()
            .await
            .accepted
            .get(&identity)
            .map(|log| log.recent.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for LoopbackService {
    async fn handshake(&self, request: HandshakeRequest) -> Result<HandshakeAccepted, NetError> {
        {
            let mut tables = self.tables.lock().await;
            if tables.stalled_handshakes > 0 {
                tables.stalled_handshakes -= 1;
                drop(tables);
                debug!("stalling handshake");
                return std::future::pending().await;
            }
        }
        if request.database != self.database {
            return Err(NetError::Rejected {
                action: "connect".into(),
                reason: format!("unknown database {:?}", request.database),
            });
        }
        let identity = Identity::random();
        self.tables.lock().await.connected.insert(identity);
        debug!(%identity, confirmed_reads = request.confirmed_reads, "handshake accepted");
        Ok(HandshakeAccepted { identity })
    }

    async fn table_events(&self, identity: Identity) -> Result<EventStream, NetError> {
        let mut tables = self.tables.lock().await;
        if !tables.connected.contains(&identity) {
            return Err(NetError::Closed);
        }
        let (tx, rx) = mpsc::unbounded();
        tables.listeners.insert(identity, tx);
        Ok(rx.boxed())
    }

    async fn subscribe(&self, request: SubscribeRequest) -> Result<Vec<PlayerRecord>, NetError> {
        let expected = format!("select * from {PLAYER_TABLE}");
        if request.query.trim().to_ascii_lowercase() != expected {
            return Err(NetError::Subscription(format!(
                "unsupported query: {}",
                request.query
            )));
        }
        let tables = self.tables.lock().await;
        if !tables.connected.contains(&request.identity) {
            return Err(NetError::Closed);
        }
        Ok(tables.players.values().cloned().collect())
    }

    async fn call_reducer(&self, identity: Identity, call: ReducerCall) -> Result<(), NetError> {
        let action = call.name();
        let mut tables = self.tables.lock().await;
        if !tables.connected.contains(&identity) {
            return Err(NetError::Closed);
        }
        let result = match call {
            ReducerCall::RegisterPlayer(args) => tables.register(identity, args),
            ReducerCall::UpdatePlayerInput(args) => tables.apply_input(identity, args),
        };
        result.map_err(|reason| NetError::Rejected {
            action: action.to_string(),
            reason,
        })
    }

    async fn send_input(
        &self,
        identity: Identity,
        input: UpdatePlayerInput,
    ) -> Result<(), NetError> {
        let mut tables = self.tables.lock().await;
        if !tables.connected.contains(&identity) {
            return Err(NetError::Closed);
        }
        // Fire-and-forget: a refused input is invisible to the sender.
        if let Err(reason) = tables.apply_input(identity, input) {
            debug!(%identity, %reason, "input ignored");
        }
        Ok(())
    }

    async fn disconnect(&self, identity: Identity) -> Result<(), NetError> {
        info!(%identity, "session disconnected");
        self.tables.lock().await.drop_session(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use arena_input::ControlState;

    use super::*;
    use crate::messages::{CharacterClass, PLAYER_QUERY};

    async fn connect(service: &LoopbackService) -> (Identity, EventStream) {
        let accepted = service
            .handshake(HandshakeRequest {
                database: "arena".into(),
                confirmed_reads: true,
            })
            .await
            .unwrap();
        let events = service.table_events(accepted.identity).await.unwrap();
        (accepted.identity, events)
    }

    fn register(name: &str) -> ReducerCall {
        ReducerCall::RegisterPlayer(RegisterPlayer {
            username: name.into(),
            character_class: CharacterClass::Wizard,
        })
    }

    fn input(sequence: u32, x: f32) -> UpdatePlayerInput {
        UpdatePlayerInput {
            input: ControlState {
                forward: true,
                sequence,
                ..ControlState::default()
            },
            client_pos: Vec3::new(x, 0.0, 0.0),
            client_rot: Vec3::ZERO,
            client_animation: "walk-forward".into(),
        }
    }

    #[tokio::test]
    async fn test_register_broadcasts_insert() {
        let service = LoopbackService::new("arena");
        let (a, mut a_events) = connect(&service).await;
        service.call_reducer(a, register("Bot_1")).await.unwrap();

        match a_events.next().await.unwrap() {
            TableEvent::Insert(row) => {
                assert_eq!(row.identity, a);
                assert_eq!(row.username, "Bot_1");
                assert_eq!(row.current_animation, "idle");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_username_is_rejected() {
        let service = LoopbackService::new("arena");
        let (a, _events) = connect(&service).await;
        let err = service.call_reducer(a, register("  ")).await.unwrap_err();
        assert!(matches!(err, NetError::Rejected { ref action, .. } if action == "register_player"));
    }

    #[tokio::test]
    async fn test_stale_inputs_are_ignored_and_positions_clamped() {
        let service = LoopbackService::new("arena");
        let (a, _events) = connect(&service).await;
        service.call_reducer(a, register("p")).await.unwrap();

        service.send_input(a, input(2, 500.0)).await.unwrap();
        service.send_input(a, input(1, 3.0)).await.unwrap();

        let row = service.player(a).await.unwrap();
        assert_eq!(row.last_input_seq, 2);
        assert_eq!(row.position.x, ARENA_HALF_EXTENT);
        assert_eq!(service.accepted_sequences(a).await, vec![2]);
    }

    #[tokio::test]
    async fn test_disconnect_deletes_row_for_others() {
        let service = LoopbackService::new("arena");
        let (a, _a_events) = connect(&service).await;
        let (b, mut b_events) = connect(&service).await;
        service.call_reducer(a, register("a")).await.unwrap();
        service.disconnect(a).await.unwrap();

        assert!(matches!(b_events.next().await, Some(TableEvent::Insert(_))));
        match b_events.next().await.unwrap() {
            TableEvent::Delete(row) => assert_eq!(row.identity, a),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(service.player_count().await, 0);
        assert!(service.call_reducer(b, register("b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_accepted_log_is_capped() {
        let service = LoopbackService::new("arena");
        let (a, _events) = connect(&service).await;
        service.call_reducer(a, register("p")).await.unwrap();

        let total = ACCEPTED_LOG_CAPACITY as u32 + 36;
        for sequence in 1..=total {
            service.send_input(a, input(sequence, 0.0)).await.unwrap();
        }
        assert_eq!(service.accepted_count(a).await, u64::from(total));
        let recent = service.accepted_sequences(a).await;
        assert_eq!(recent.len(), ACCEPTED_LOG_CAPACITY);
        assert_eq!(recent.first().copied(), Some(37));
        assert_eq!(recent.last().copied(), Some(total));
    }

    #[tokio::test]
    async fn test_remove_player_keeps_connection() {
        let service = LoopbackService::new("arena");
        let (a, mut events) = connect(&service).await;
        service.call_reducer(a, register("a")).await.unwrap();
        assert!(service.remove_player(a).await);
        assert!(!service.remove_player(a).await);

        assert!(matches!(events.next().await, Some(TableEvent::Insert(_))));
        assert!(matches!(events.next().await, Some(TableEvent::Delete(row)) if row.identity == a));
        // Still connected, so the player may register again.
        assert!(service.call_reducer(a, register("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_kick_ends_listener_stream() {
        let service = LoopbackService::new("arena");
        let (a, mut events) = connect(&service).await;
        service.kick(a).await;
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_query_is_validated() {
        let service = LoopbackService::new("arena");
        let (a, _events) = connect(&service).await;
        let ok = service
            .subscribe(SubscribeRequest {
                identity: a,
                query: PLAYER_QUERY.into(),
            })
            .await;
        assert!(ok.unwrap().is_empty());

        let err = service
            .subscribe(SubscribeRequest {
                identity: a,
                query: "SELECT * FROM monsters".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Subscription(_)));
    }

    #[tokio::test]
    async fn test_unknown_database_is_refused() {
        let service = LoopbackService::new("arena");
        let err = service
            .handshake(HandshakeRequest {
                database: "other".into(),
                confirmed_reads: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Rejected { .. }));
    }
}
