//! Session-level error types.

use std::time::Duration;

use arena_net::NetError;

use crate::session::SessionState;

/// Errors surfaced by a client session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No connection was established within the bound. Not retried.
    #[error("handshake timed out after {after:?}")]
    HandshakeTimeout { after: Duration },

    /// The subscription query was rejected or its backfill failed. The
    /// session stays up.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// The service or the network dropped the session.
    #[error("disconnected: {reason}")]
    TransportDisconnect { reason: String },

    /// The service refused a remote action.
    #[error("{action} rejected: {reason}")]
    ActionRejected { action: String, reason: String },

    /// An operation was attempted in the wrong session state.
    #[error("expected session state {expected:?}, was {actual:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// Any other transport failure.
    #[error(transparent)]
    Net(NetError),
}

impl From<NetError> for ClientError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Rejected { action, reason } => Self::ActionRejected { action, reason },
            NetError::Subscription(reason) => Self::Subscription(reason),
            NetError::Closed => Self::TransportDisconnect {
                reason: "connection closed".into(),
            },
            other => Self::Net(other),
        }
    }
}
