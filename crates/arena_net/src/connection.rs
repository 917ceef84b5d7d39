//! NATS connection management.
//!
//! A thin wrapper around `async-nats` that speaks MessagePack on every
//! subject and decodes request/reply payloads in one step.
//!
//! The client's own request timeout is disabled: callers bound their waits.
//! Link state is tracked from connection events so listeners can end when
//! the server goes away instead of waiting through silent reconnects.

use std::sync::Arc;

use async_nats::client::RequestErrorKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::NetError;

/// Default service URL.
pub const DEFAULT_URL: &str = "nats://localhost:4222";

/// The environment variable used to override the service URL.
pub const URL_ENV: &str = "ARENA_URL";

/// Whether the server link is currently up.
#[derive(Debug, Clone)]
struct Link {
    state: Arc<watch::Sender<bool>>,
}

impl Link {
    fn new() -> Self {
        let (state, _) = watch::channel(true);
        Self {
            state: Arc::new(state),
        }
    }

    fn on_event(&self, event: &async_nats::Event) {
        match event {
            async_nats::Event::Disconnected => {
                warn!("NATS link lost");
                self.state.send_replace(false);
            }
            async_nats::Event::Connected => {
                info!("NATS link up");
                self.state.send_replace(true);
            }
            other => debug!(event = %other, "NATS event"),
        }
    }

    /// Resolves once the link is down. Immediately if it already is.
    async fn down(&self) {
        let mut state = self.state.subscribe();
        // The sender lives as long as `self`, so this only errors on drop.
        let _ = state.wait_for(|up| !*up).await;
    }
}

/// Map a request failure, keeping timeouts distinguishable.
fn request_error(err: async_nats::RequestError) -> NetError {
    match err.kind() {
        RequestErrorKind::TimedOut => NetError::Timeout {
            operation: "request",
        },
        _ => NetError::Request(err),
    }
}

/// A cloneable handle to one NATS client.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    client: async_nats::Client,
    link: Link,
}

impl NatsConnection {
    /// Connect to the server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str) -> Result<Self, NetError> {
        info!(url, "connecting to NATS");
        let link = Link::new();
        let events = link.clone();
        let client = async_nats::ConnectOptions::new()
            .request_timeout(None)
            .event_callback(move |event| {
                let events = events.clone();
                async move { events.on_event(&event) }
            })
            .connect(url)
            .await?;
        info!("NATS connection established");
        Ok(Self { client, link })
    }

    /// Resolves once the link to the server drops.
    pub async fn disconnected(&self) {
        self.link.down().await;
    }

    /// Returns a reference to the underlying `async-nats` client.
    #[must_use]
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Publish a MessagePack-encoded message, optionally with headers.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn publish<T: Serialize>(
        &self,
        subject: String,
        headers: Option<async_nats::HeaderMap>,
        message: &T,
    ) -> Result<(), NetError> {
        let payload = crate::codec::encode(message)?;
        match headers {
            Some(headers) => {
                self.client
                    .publish_with_headers(subject, headers, payload.into())
                    .await?
            }
            None => self.client.publish(subject, payload.into()).await?,
        }
        Ok(())
    }

    /// Send a request and decode the reply.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Request`] if nobody answers, [`NetError::Timeout`]
    /// if the server gave up on the reply, or an encode/decode error for
    /// malformed payloads.
    pub async fn request<T: Serialize, R: DeserializeOwned>(
        &self,
        subject: String,
        headers: Option<async_nats::HeaderMap>,
        message: &T,
    ) -> Result<R, NetError> {
        let payload = crate::codec::encode(message)?;
        debug!(%subject, bytes = payload.len(), "request");
        let reply = match headers {
            Some(headers) => {
                self.client
                    .request_with_headers(subject, headers, payload.into())
                    .await
            }
            None => self.client.request(subject, payload.into()).await,
        }
        .map_err(request_error)?;
        crate::codec::decode(reply.payload.as_ref())
    }

    /// Subscribe to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber, NetError> {
        let sub = self.client.subscribe(subject).await?;
        Ok(sub)
    }

    /// Flush buffered publishes to the server.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Nats`] if the flush fails.
    pub async fn flush(&self) -> Result<(), NetError> {
        self.client
            .flush()
            .await
            .map_err(|e| NetError::Nats(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_request_timeout_maps_to_timeout() {
        let err = request_error(RequestErrorKind::TimedOut.into());
        assert!(matches!(err, NetError::Timeout { operation: "request" }));

        let err = request_error(RequestErrorKind::NoResponders.into());
        assert!(matches!(err, NetError::Request(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_down_after_disconnect_event() {
        let link = Link::new();
        let watcher = link.clone();
        let down = tokio::spawn(async move { watcher.down().await });

        link.on_event(&async_nats::Event::Connected);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!down.is_finished());

        link.on_event(&async_nats::Event::Disconnected);
        tokio::time::timeout(Duration::from_secs(1), down)
            .await
            .unwrap()
            .unwrap();

        // Late watchers see the link as already down.
        tokio::time::timeout(Duration::from_secs(1), link.down())
            .await
            .unwrap();
    }
}
