//! # arena_client
//!
//! Session runtime for one logical arena client. A session:
//!
//! 1. Performs the handshake and receives its identity.
//! 2. Attaches table-change listeners, then issues the subscription query.
//! 3. Registers a player (display name + character class).
//! 4. On every tick: samples input, stamps a sequence, gates, transmits.
//! 5. On teardown: stops ticking and drops every cached authoritative row.
//!
//! [`Session`] is the I/O-free state machine; [`SessionRunner`] drives it
//! over any [`Transport`](arena_net::Transport).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arena_client::input::ChannelInput;
//! use arena_client::tick::FixedInterval;
//! use arena_client::{ClientConfig, Registration, SessionRunner};
//! use arena_net::{CharacterClass, LoopbackService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arena_client::ClientError> {
//!     let config = ClientConfig::default();
//!     let service = Arc::new(LoopbackService::new(config.database.clone()));
//!     let runner = SessionRunner::new(config.clone(), service);
//!     let (_shutdown_tx, shutdown) = tokio::sync::watch::channel(false);
//!     let (_events, input) = ChannelInput::new();
//!     let ticks = FixedInterval::new(config.tick_interval);
//!     let registration = Registration::new("Alice", CharacterClass::Wizard);
//!     let report = runner.run(registration, input, ticks, shutdown).await?;
//!     println!("sent {} inputs", report.transmissions);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod prediction;
pub mod runner;
pub mod session;
pub mod status;
pub mod store;
pub mod tick;

pub use config::ClientConfig;
pub use error::ClientError;
pub use input::InputDriver;
pub use runner::{Registration, SessionReport, SessionRunner};
pub use session::{Session, SessionState};
pub use status::ConnectionStatus;
pub use store::{LocalPlayer, PlayerView, ReconciliationStore, StoreChange};
pub use tick::{TickSource, TickThrottle};
