//! NATS subject hierarchy.
//!
//! Every subject is `arena.<database>.…` so several logical databases can
//! share one NATS cluster.

/// Root prefix for all arena subjects.
pub const PREFIX: &str = "arena";

/// Session handshake, request/reply. Client → Service.
#[must_use]
pub fn handshake(database: &str) -> String {
    format!("{PREFIX}.{database}.connect")
}

/// Subscription query, request/reply with backfill rows. Client → Service.
#[must_use]
pub fn subscribe(database: &str) -> String {
    format!("{PREFIX}.{database}.subscribe")
}

/// A named remote action, request/reply. Client → Service.
///
/// `arena.<database>.reducer.<name>`
#[must_use]
pub fn reducer(database: &str, name: &str) -> String {
    format!("{PREFIX}.{database}.reducer.{name}")
}

/// Fire-and-forget input stream for the tick path. Client → Service.
#[must_use]
pub fn input(database: &str) -> String {
    format!("{PREFIX}.{database}.input")
}

/// Row-change broadcast for a table. Service → Clients.
///
/// `arena.<database>.table.<table>`
#[must_use]
pub fn table(database: &str, table: &str) -> String {
    format!("{PREFIX}.{database}.table.{table}")
}

/// Local teardown notice. Client → Service.
#[must_use]
pub fn disconnect(database: &str) -> String {
    format!("{PREFIX}.{database}.disconnect")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reducer_subject() {
        assert_eq!(
            reducer("arena", "register_player"),
            "arena.arena.reducer.register_player"
        );
    }

    #[test]
    fn test_table_subject() {
        assert_eq!(table("quickstart", "player"), "arena.quickstart.table.player");
    }

    #[test]
    fn test_session_subjects_share_namespace() {
        for subject in [handshake("db"), subscribe("db"), input("db"), disconnect("db")] {
            assert!(subject.starts_with("arena.db."));
        }
    }
}
