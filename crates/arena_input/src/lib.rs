//! # arena_input
//!
//! Everything a client needs to turn raw input into the snapshots it sends to
//! the authoritative service. Nothing in this crate performs I/O.
//!
//! This crate provides:
//!
//! - [`ControlState`] — the sequenced input snapshot sent over the wire.
//! - [`InputSampler`] — folds key/pointer transitions into the live snapshot.
//! - [`Sequencer`] — stamps sequence numbers and gates transmissions.
//! - [`TransformSnapshot`] — the locally predicted pose sent alongside input.

pub mod control;
pub mod gate;
pub mod sampler;
pub mod transform;

// Re-export glam types used in public signatures.
pub use glam::Vec3;

pub use control::{AnimationLabel, Control, ControlState, MoveDirection};
pub use gate::Sequencer;
pub use sampler::{InputEvent, InputSampler, KeyBindings, ViewAngles, PITCH_LIMIT};
pub use transform::{MovementTuning, TransformSnapshot};
