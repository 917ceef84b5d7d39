//! The seam between a client session and the authoritative service.
//!
//! A [`Transport`] exposes exactly the primitives a session consumes:
//! handshake, table-change notifications, the subscription query with its
//! backfill, remote actions, the fire-and-forget input path, and teardown.
//! [`NatsTransport`] maps them onto the subject hierarchy in
//! [`subjects`](crate::subjects).

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::connection::NatsConnection;
use crate::error::NetError;
use crate::messages::{
    Disconnect, HandshakeAccepted, HandshakeRequest, Identity, PLAYER_TABLE, PlayerRecord,
    ReducerCall, ReducerOutcome, SubscribeRequest, SubscriptionReply, TableEvent,
    UpdatePlayerInput, headers,
};
use crate::subjects;

/// Ordered stream of table-change notifications for one session. The stream
/// ending means the service dropped the session.
pub type EventStream = BoxStream<'static, TableEvent>;

/// Operations a session needs from the authoritative service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establish a session and obtain its identity. Implementations do not
    /// apply a timeout; the caller bounds this call.
    async fn handshake(&self, request: HandshakeRequest) -> Result<HandshakeAccepted, NetError>;

    /// Attach the table-change listener for `identity`.
    async fn table_events(&self, identity: Identity) -> Result<EventStream, NetError>;

    /// Issue the subscription query and return the backfill rows.
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Vec<PlayerRecord>, NetError>;

    /// Invoke a remote action and wait for its outcome.
    async fn call_reducer(&self, identity: Identity, call: ReducerCall) -> Result<(), NetError>;

    /// Send one tick of input without waiting for an outcome.
    async fn send_input(&self, identity: Identity, input: UpdatePlayerInput)
    -> Result<(), NetError>;

    /// Tear the session down on the service side.
    async fn disconnect(&self, identity: Identity) -> Result<(), NetError>;
}

fn identity_headers(identity: Identity) -> async_nats::HeaderMap {
    let mut map = async_nats::HeaderMap::new();
    map.insert(headers::IDENTITY, identity.to_string().as_str());
    map
}

/// [`Transport`] over a NATS connection, scoped to one logical database.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    conn: NatsConnection,
    database: String,
}

impl NatsTransport {
    /// Wrap an established connection.
    #[must_use]
    pub fn new(conn: NatsConnection, database: impl Into<String>) -> Self {
        Self {
            conn,
            database: database.into(),
        }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn handshake(&self, request: HandshakeRequest) -> Result<HandshakeAccepted, NetError> {
        self.conn
            .request(subjects::handshake(&self.database), None, &request)
            .await
    }

    async fn table_events(&self, identity: Identity) -> Result<EventStream, NetError> {
        let subject = subjects::table(&self.database, PLAYER_TABLE);
        let subscriber = self.conn.subscribe(subject.clone()).await?;
        info!(%identity, %subject, "table listener attached");
        let conn = self.conn.clone();
        let link_lost = async move {
            conn.disconnected().await;
            warn!(%identity, "table listener ended: server link lost");
        };
        let stream = subscriber.filter_map(|msg| async move {
            match crate::codec::decode::<TableEvent>(msg.payload.as_ref()) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "dropping undecodable table event");
                    None
                }
            }
        });
        Ok(stream.take_until(link_lost).boxed())
    }

    async fn subscribe(&self, request: SubscribeRequest) -> Result<Vec<PlayerRecord>, NetError> {
        let reply: SubscriptionReply = self
            .conn
            .request(subjects::subscribe(&self.database), None, &request)
            .await?;
        match reply {
            SubscriptionReply::Applied { rows } => Ok(rows),
            SubscriptionReply::Error { reason } => Err(NetError::Subscription(reason)),
        }
    }

    async fn call_reducer(&self, identity: Identity, call: ReducerCall) -> Result<(), NetError> {
        let action = call.name();
        let outcome: ReducerOutcome = self
            .conn
            .request(
                subjects::reducer(&self.database, action),
                Some(identity_headers(identity)),
                &call,
            )
            .await?;
        match outcome {
            ReducerOutcome::Ok => Ok(()),
            ReducerOutcome::Rejected { reason } => Err(NetError::Rejected {
                action: action.to_string(),
                reason,
            }),
        }
    }

    async fn send_input(
        &self,
        identity: Identity,
        input: UpdatePlayerInput,
    ) -> Result<(), NetError> {
        debug!(%identity, sequence = input.input.sequence, "publishing input");
        self.conn
            .publish(
                subjects::input(&self.database),
                Some(identity_headers(identity)),
                &input,
            )
            .await
    }

    async fn disconnect(&self, identity: Identity) -> Result<(), NetError> {
        self.conn
            .publish(
                subjects::disconnect(&self.database),
                None,
                &Disconnect { identity },
            )
            .await?;
        self.conn.flush().await
    }
}
