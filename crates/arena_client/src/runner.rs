//! Drives a [`Session`] over a [`Transport`].
//!
//! The runner owns the I/O: it performs the bounded handshake, attaches the
//! table listener before issuing the subscription, registers the player, and
//! then multiplexes shutdown, table notifications and tick firings on one
//! task until one of them ends the session.

use std::sync::Arc;

use arena_input::{ControlState, InputSampler};
use arena_net::{CharacterClass, EventStream, Identity, NetError, TableEvent, Transport};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::InputDriver;
use crate::prediction::Prediction;
use crate::session::Session;
use crate::status::ConnectionStatus;
use crate::store::{PlayerView, StoreChange};
use crate::tick::TickSource;

/// Player registration arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub username: String,
    pub character_class: CharacterClass,
}

impl Registration {
    #[must_use]
    pub fn new(username: impl Into<String>, character_class: CharacterClass) -> Self {
        Self {
            username: username.into(),
            character_class,
        }
    }
}

/// Summary of a session that ran until shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub identity: Identity,
    pub username: String,
    /// Whether the registration was accepted.
    pub registered: bool,
    /// Ticks that reached the gate.
    pub ticks_attempted: u64,
    /// Inputs handed to the transport.
    pub transmissions: u64,
    /// Sequence of the last transmitted input, 0 if none.
    pub last_sequence: u32,
}

/// Runs one session to completion.
pub struct SessionRunner<T: Transport> {
    transport: Arc<T>,
    session: Session,
    sampler: InputSampler,
    prediction: Prediction,
    controls: watch::Sender<ControlState>,
    last_frame: Option<Instant>,
}

impl<T: Transport> SessionRunner<T> {
    /// Create a runner with the default key bindings.
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<T>) -> Self {
        let prediction = Prediction::new(config.movement, config.snap_distance);
        let (controls, _) = watch::channel(ControlState::default());
        Self {
            transport,
            session: Session::new(config),
            sampler: InputSampler::default(),
            prediction,
            controls,
            last_frame: None,
        }
    }

    /// Connection status updates.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.session.status()
    }

    /// Read handle onto the authoritative player table.
    #[must_use]
    pub fn players(&self) -> PlayerView {
        self.session.players()
    }

    /// The last control snapshot handed to the transport.
    #[must_use]
    pub fn controls(&self) -> watch::Receiver<ControlState> {
        self.controls.subscribe()
    }

    /// Run until `shutdown` flips to `true`, the tick source stops, or the
    /// service drops the session.
    ///
    /// # Errors
    ///
    /// - [`ClientError::HandshakeTimeout`] if no identity arrived in time.
    /// - [`ClientError::TransportDisconnect`] if the service ended the session
    ///   or deleted the local player.
    /// - Any transport failure during connect or registration.
    pub async fn run<I, S>(
        mut self,
        registration: Registration,
        mut input: I,
        mut ticks: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SessionReport, ClientError>
    where
        I: InputDriver,
        S: TickSource,
    {
        let identity = match self.handshake().await {
            Ok(identity) => identity,
            Err(err) => {
                self.session.disconnect(Some(err.to_string()));
                return Err(err);
            }
        };

        let mut events = match self.attach_and_subscribe(identity).await {
            Ok(events) => events,
            Err(err) => {
                self.teardown(identity, Some(err.to_string())).await;
                return Err(err);
            }
        };

        if let Err(err) = self.register(identity, &registration).await {
            self.teardown(identity, Some(err.to_string())).await;
            return Err(err);
        }

        let result = loop {
            if *shutdown.borrow_and_update() {
                break Ok(());
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!(%identity, "shutdown sender dropped");
                        break Ok(());
                    }
                }
                event = events.next() => match event {
                    Some(event) => {
                        if let Err(err) = self.on_event(event) {
                            break Err(err);
                        }
                    }
                    None => break Err(ClientError::TransportDisconnect {
                        reason: "table event stream closed".into(),
                    }),
                },
                tick = ticks.next_tick() => match tick {
                    Some(now) => self.on_tick(identity, now, &mut input).await,
                    None => {
                        debug!(%identity, "tick source stopped");
                        break Ok(());
                    }
                },
            }
        };

        let report = SessionReport {
            identity,
            username: registration.username,
            registered: self.session.is_registered(),
            ticks_attempted: self.session.ticks_attempted(),
            transmissions: self.session.transmissions(),
            last_sequence: self.session.last_sent().map_or(0, |sent| sent.sequence),
        };
        self.teardown(identity, result.as_ref().err().map(ToString::to_string))
            .await;
        result.map(|()| report)
    }

    async fn handshake(&mut self) -> Result<Identity, ClientError> {
        let hello = self.session.begin_handshake()?;
        let bound = self.session.config().handshake_timeout;
        let accepted = match tokio::time::timeout(bound, self.transport.handshake(hello)).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(NetError::Timeout { .. })) | Err(_) => {
                warn!(after = ?bound, "handshake timed out");
                return Err(ClientError::HandshakeTimeout { after: bound });
            }
            Ok(Err(err)) => return Err(err.into()),
        };
        Ok(accepted.identity)
    }

    async fn attach_and_subscribe(&mut self, identity: Identity) -> Result<EventStream, ClientError> {
        let attach = self.session.on_connected(identity)?;
        let events = self.transport.table_events(attach.identity()).await?;
        match self.transport.subscribe(attach.attached()).await {
            Ok(rows) => {
                self.session.on_subscription_applied(rows);
            }
            Err(NetError::Subscription(reason)) => self.session.on_subscription_error(reason),
            Err(err) => return Err(err.into()),
        }
        Ok(events)
    }

    async fn register(
        &mut self,
        identity: Identity,
        registration: &Registration,
    ) -> Result<(), ClientError> {
        let call = self
            .session
            .registration(registration.username.clone(), registration.character_class)?;
        match self.transport.call_reducer(identity, call).await {
            Ok(()) => self.session.on_registered(),
            // The session stays connected; ticks stay disarmed.
            Err(NetError::Rejected { action, reason }) => {
                self.session.on_action_rejected(&action, &reason);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn on_event(&mut self, event: TableEvent) -> Result<(), ClientError> {
        match self.session.on_table_event(event) {
            StoreChange::Local(row) => {
                self.prediction.reconcile(&row);
                Ok(())
            }
            StoreChange::LocalRemoved => {
                warn!("local player row removed by the service");
                self.prediction.reset();
                Err(ClientError::TransportDisconnect {
                    reason: "local player removed by the service".into(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn on_tick<I: InputDriver>(&mut self, identity: Identity, now: Instant, input: &mut I) {
        if !self.session.is_registered() {
            return;
        }
        input.sample(&mut self.sampler, &mut self.prediction);

        let dt = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        let pose = self.prediction.step(&self.sampler.state(), dt);

        let Some(update) = self.session.tick(now, self.sampler.state_mut(), pose) else {
            return;
        };
        self.prediction.record_sent(update.input.sequence, pose);
        self.controls.send_replace(update.input);
        if let Err(err) = self.transport.send_input(identity, update).await {
            self.session.on_send_failed(&err.to_string());
        }
    }

    async fn teardown(&mut self, identity: Identity, reason: Option<String>) {
        self.session.disconnect(reason);
        if let Err(err) = self.transport.disconnect(identity).await {
            debug!(%identity, error = %err, "disconnect notification failed");
        }
        info!(%identity, "session closed");
    }
}
