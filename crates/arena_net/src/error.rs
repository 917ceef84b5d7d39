//! Network-layer error types.

/// Errors that can occur while talking to the authoritative service.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Any other NATS client error.
    #[error("NATS error: {0}")]
    Nats(String),

    /// NATS subscription error.
    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    /// NATS publish error.
    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),

    /// NATS request/reply error (no responders, reply timeout...).
    #[error("NATS request error: {0}")]
    Request(#[from] async_nats::RequestError),

    /// NATS connection error.
    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    /// The server gave up waiting on a reply.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// The service refused a remote action.
    #[error("{action} rejected: {reason}")]
    Rejected { action: String, reason: String },

    /// The service refused the subscription query or failed the backfill.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// The session is not (or no longer) connected.
    #[error("connection closed")]
    Closed,
}
