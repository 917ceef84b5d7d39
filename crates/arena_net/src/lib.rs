//! # arena_net
//!
//! Wire protocol and transport between an arena client and the authoritative
//! service.
//!
//! This crate provides:
//!
//! - [`subjects`] — NATS subject hierarchy, namespaced per database.
//! - [`messages`] — player rows, remote actions, and table-change events.
//! - [`codec`] — MessagePack serialisation/deserialisation helpers.
//! - [`connection`] — NATS connection management.
//! - [`transport`] — the [`Transport`] seam and its NATS implementation.
//! - [`loopback`] — an in-process authoritative service for tests and offline runs.
//! - [`error`] — Network-layer error types.

pub mod codec;
pub mod connection;
pub mod error;
pub mod loopback;
pub mod messages;
pub mod subjects;
pub mod transport;

pub use codec::{decode, encode};
pub use connection::NatsConnection;
pub use error::NetError;
pub use loopback::{ACCEPTED_LOG_CAPACITY, LoopbackService};
pub use messages::{CharacterClass, Identity, PlayerRecord, TableEvent};
pub use transport::{EventStream, NatsTransport, Transport};
