//! Reconciliation store: the client's copy of the authoritative player table.
//!
//! [`ReconciliationStore`] is the single writer: only table-change handlers
//! and the backfill mutate it. Readers (the render layer) hold a
//! [`PlayerView`] and never write. Every update replaces the whole row, so
//! the final state per identity is always the last insert/update applied.

use std::sync::Arc;

use arena_net::{Identity, PlayerRecord, TableEvent};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

/// Whether the local player's row is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalPlayer {
    /// No row for the local identity has arrived yet.
    Pending,
    /// The local row is present in the store.
    Present(Identity),
    /// The service deleted the local row.
    Removed,
}

/// What a notification did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// A remote player's row was inserted or replaced.
    Remote(Identity),
    /// The local player's row was inserted or replaced.
    Local(PlayerRecord),
    /// A remote player's row was removed.
    RemoteRemoved(Identity),
    /// The local player's row was removed.
    LocalRemoved,
    /// Backfill populated the store with this many rows.
    Backfilled(usize),
    /// Nothing changed.
    Unchanged,
}

/// Read-only handle onto the store for the render layer.
#[derive(Debug, Clone)]
pub struct PlayerView {
    players: Arc<DashMap<Identity, PlayerRecord>>,
    local: watch::Receiver<LocalPlayer>,
}

impl PlayerView {
    /// Current row for `identity`.
    #[must_use]
    pub fn get(&self, identity: &Identity) -> Option<PlayerRecord> {
        self.players.get(identity).map(|row| row.clone())
    }

    /// Number of known players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if no players are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// A copy of every known row.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PlayerRecord> {
        self.players.iter().map(|row| row.value().clone()).collect()
    }

    /// Local player state.
    #[must_use]
    pub fn local_state(&self) -> LocalPlayer {
        *self.local.borrow()
    }

    /// The local player's row, if present.
    #[must_use]
    pub fn local(&self) -> Option<PlayerRecord> {
        match self.local_state() {
            LocalPlayer::Present(identity) => self.get(&identity),
            _ => None,
        }
    }
}

/// Authoritative mapping identity → [`PlayerRecord`], plus the local alias.
#[derive(Debug)]
pub struct ReconciliationStore {
    players: Arc<DashMap<Identity, PlayerRecord>>,
    local_identity: Option<Identity>,
    local: watch::Sender<LocalPlayer>,
}

impl ReconciliationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (local, _) = watch::channel(LocalPlayer::Pending);
        Self {
            players: Arc::new(DashMap::new()),
            local_identity: None,
            local,
        }
    }

    /// A read handle that observes every later change.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            players: Arc::clone(&self.players),
            local: self.local.subscribe(),
        }
    }

    /// Set the identity whose row is the local player.
    pub fn set_local_identity(&mut self, identity: Identity) {
        self.local_identity = Some(identity);
        if self.players.contains_key(&identity) {
            self.local.send_replace(LocalPlayer::Present(identity));
        }
    }

    fn is_local(&self, identity: &Identity) -> bool {
        self.local_identity.as_ref() == Some(identity)
    }

    fn upsert(&mut self, row: PlayerRecord) -> StoreChange {
        let identity = row.identity;
        if self.is_local(&identity) {
            self.players.insert(identity, row.clone());
            self.local.send_replace(LocalPlayer::Present(identity));
            StoreChange::Local(row)
        } else {
            self.players.insert(identity, row);
            StoreChange::Remote(identity)
        }
    }

    /// Apply an insert notification.
    pub fn on_insert(&mut self, row: PlayerRecord) -> StoreChange {
        debug!(identity = %row.identity, "player inserted");
        self.upsert(row)
    }

    /// Apply an update notification. The row is replaced wholesale.
    pub fn on_update(&mut self, new: PlayerRecord) -> StoreChange {
        self.upsert(new)
    }

    /// Apply a delete notification.
    pub fn on_delete(&mut self, row: &PlayerRecord) -> StoreChange {
        let identity = row.identity;
        if self.players.remove(&identity).is_none() {
            return StoreChange::Unchanged;
        }
        debug!(%identity, "player removed");
        if self.is_local(&identity) {
            self.local.send_replace(LocalPlayer::Removed);
            StoreChange::LocalRemoved
        } else {
            StoreChange::RemoteRemoved(identity)
        }
    }

    /// Dispatch a table-change event to its handler.
    pub fn apply(&mut self, event: TableEvent) -> StoreChange {
        match event {
            TableEvent::Insert(row) => self.on_insert(row),
            TableEvent::Update { new, .. } => self.on_update(new),
            TableEvent::Delete(row) => self.on_delete(&row),
        }
    }

    /// Merge the rows that existed when the subscription was applied.
    ///
    /// Only populates an empty store, so rows already delivered through
    /// insert notifications are never duplicated or rolled back.
    pub fn backfill(&mut self, rows: impl IntoIterator<Item = PlayerRecord>) -> StoreChange {
        if !self.players.is_empty() {
            debug!(known = self.players.len(), "store already populated, skipping backfill");
            return StoreChange::Unchanged;
        }
        for row in rows {
            self.players.insert(row.identity, row);
        }
        if let Some(identity) = self.local_identity
            && self.players.contains_key(&identity)
        {
            self.local.send_replace(LocalPlayer::Present(identity));
        }
        StoreChange::Backfilled(self.players.len())
    }

    /// Drop every cached row and the local alias.
    pub fn clear(&mut self) {
        self.players.clear();
        self.local_identity = None;
        self.local.send_replace(LocalPlayer::Pending);
    }

    /// Current row for `identity`.
    #[must_use]
    pub fn get(&self, identity: &Identity) -> Option<PlayerRecord> {
        self.players.get(identity).map(|row| row.clone())
    }

    /// The local player's row, if present.
    #[must_use]
    pub fn local_player(&self) -> Option<PlayerRecord> {
        self.local_identity.and_then(|id| self.get(&id))
    }

    /// Local player state.
    #[must_use]
    pub fn local_state(&self) -> LocalPlayer {
        *self.local.borrow()
    }

    /// Number of known players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if no players are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use arena_input::Vec3;
    use arena_net::CharacterClass;

    use super::*;

    fn row(identity: Identity, x: f32) -> PlayerRecord {
        let mut row = PlayerRecord::spawned(identity, "p", CharacterClass::Wizard, Vec3::ZERO);
        row.position.x = x;
        row
    }

    fn sorted(store: &ReconciliationStore) -> Vec<PlayerRecord> {
        let mut rows = store.view().snapshot();
        rows.sort_by_key(|r| r.identity);
        rows
    }

    #[test]
    fn test_insert_marks_local_player() {
        let me = Identity::random();
        let other = Identity::random();
        let mut store = ReconciliationStore::new();
        store.set_local_identity(me);

        assert_eq!(store.on_insert(row(other, 1.0)), StoreChange::Remote(other));
        assert_eq!(store.local_state(), LocalPlayer::Pending);

        assert!(matches!(store.on_insert(row(me, 2.0)), StoreChange::Local(_)));
        assert_eq!(store.local_state(), LocalPlayer::Present(me));
        assert_eq!(store.local_player().unwrap().position.x, 2.0);
    }

    #[test]
    fn test_update_replaces_whole_row() {
        let id = Identity::random();
        let mut store = ReconciliationStore::new();
        store.on_insert(row(id, 1.0));

        let mut new = row(id, 5.0);
        new.current_animation = "run-left".into();
        new.health = 40;
        store.apply(TableEvent::Update {
            old: row(id, 1.0),
            new: new.clone(),
        });
        assert_eq!(store.get(&id).unwrap(), new);
    }

    #[test]
    fn test_last_write_wins_per_identity() {
        let a = Identity::random();
        let b = Identity::random();
        let mut store = ReconciliationStore::new();
        let events = vec![
            TableEvent::Insert(row(a, 0.0)),
            TableEvent::Insert(row(b, 0.0)),
            TableEvent::Update {
                old: row(a, 0.0),
                new: row(a, 1.0),
            },
            TableEvent::Update {
                old: row(b, 0.0),
                new: row(b, 7.0),
            },
            TableEvent::Update {
                old: row(a, 1.0),
                new: row(a, 3.0),
            },
        ];
        for event in events {
            store.apply(event);
        }
        assert_eq!(store.get(&a).unwrap().position.x, 3.0);
        assert_eq!(store.get(&b).unwrap().position.x, 7.0);
    }

    #[test]
    fn test_delete_local_signals_removed() {
        let me = Identity::random();
        let mut store = ReconciliationStore::new();
        store.set_local_identity(me);
        store.on_insert(row(me, 0.0));

        let view = store.view();
        assert!(view.local().is_some());

        assert_eq!(store.on_delete(&row(me, 0.0)), StoreChange::LocalRemoved);
        assert_eq!(view.local_state(), LocalPlayer::Removed);
        assert!(view.local().is_none());
        assert!(view.is_empty());
    }

    #[test]
    fn test_delete_unknown_is_unchanged() {
        let mut store = ReconciliationStore::new();
        assert_eq!(store.on_delete(&row(Identity::random(), 0.0)), StoreChange::Unchanged);
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let me = Identity::random();
        let rows: Vec<_> = (0..4).map(|i| row(Identity::random(), i as f32)).collect();

        let mut once = ReconciliationStore::new();
        once.backfill(rows.clone());

        let mut twice = ReconciliationStore::new();
        twice.set_local_identity(me);
        assert_eq!(twice.backfill(rows.clone()), StoreChange::Backfilled(4));
        assert_eq!(twice.backfill(rows), StoreChange::Unchanged);

        assert_eq!(sorted(&once), sorted(&twice));
    }

    #[test]
    fn test_backfill_does_not_override_inserts() {
        let id = Identity::random();
        let mut store = ReconciliationStore::new();
        store.on_insert(row(id, 9.0));
        assert_eq!(store.backfill(vec![row(id, 1.0)]), StoreChange::Unchanged);
        assert_eq!(store.get(&id).unwrap().position.x, 9.0);
    }

    #[test]
    fn test_backfill_marks_local_player() {
        let me = Identity::random();
        let mut store = ReconciliationStore::new();
        store.set_local_identity(me);
        store.backfill(vec![row(me, 0.0)]);
        assert_eq!(store.local_state(), LocalPlayer::Present(me));
    }

    #[test]
    fn test_clear_drops_everything() {
        let me = Identity::random();
        let mut store = ReconciliationStore::new();
        store.set_local_identity(me);
        store.on_insert(row(me, 0.0));
        store.on_insert(row(Identity::random(), 0.0));
        let view = store.view();

        store.clear();
        assert!(view.is_empty());
        assert_eq!(view.local_state(), LocalPlayer::Pending);
        assert!(store.local_player().is_none());
    }
}
