//! Local pose prediction and reconciliation against authoritative rows.
//!
//! Between authoritative updates the client advances its own pose from the
//! control state it is sending. Every transmitted input is remembered with
//! the pose predicted when it was sent. An authoritative row acknowledges an
//! input through `last_input_seq`, so it is compared against the pose
//! recorded for that input rather than the current one. On divergence the
//! position is rebased onto the row and the unacknowledged steps are
//! replayed. Rotation stays client-owned.

use std::collections::VecDeque;

use arena_input::{ControlState, MovementTuning, TransformSnapshot, Vec3};
use arena_net::PlayerRecord;
use tracing::{debug, trace};

/// Sent inputs kept for reconciliation. At 20 Hz this covers 3.2 s of
/// round trip.
pub const HISTORY_CAPACITY: usize = 64;

/// One frame of predicted movement.
#[derive(Debug, Clone, Copy)]
struct Step {
    control: ControlState,
    dt: f32,
    rotation: Vec3,
}

/// A transmitted input awaiting acknowledgement.
#[derive(Debug, Clone)]
struct Pending {
    sequence: u32,
    pose: TransformSnapshot,
    /// Frames predicted after this input went out, up to the next send.
    steps: Vec<Step>,
}

/// Predicted pose of the local player.
#[derive(Debug, Clone)]
pub struct Prediction {
    pose: TransformSnapshot,
    tuning: MovementTuning,
    snap_distance: f32,
    seeded: bool,
    history: VecDeque<Pending>,
}

impl Prediction {
    /// Create a predictor starting at the origin.
    #[must_use]
    pub fn new(tuning: MovementTuning, snap_distance: f32) -> Self {
        Self {
            pose: TransformSnapshot::default(),
            tuning,
            snap_distance,
            seeded: false,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// The current predicted pose.
    #[must_use]
    pub fn pose(&self) -> TransformSnapshot {
        self.pose
    }

    /// Turn to face `yaw`.
    pub fn face(&mut self, yaw: f32) {
        self.pose = self.pose.facing(yaw);
    }

    /// Advance by `dt` seconds of `control`.
    pub fn step(&mut self, control: &ControlState, dt: f32) -> TransformSnapshot {
        if let Some(last) = self.history.back_mut() {
            last.steps.push(Step {
                control: *control,
                dt,
                rotation: self.pose.rotation,
            });
        }
        self.pose = self.pose.advance(control, dt, &self.tuning);
        self.pose
    }

    /// Remember the pose that went out with input `sequence`.
    pub fn record_sent(&mut self, sequence: u32, pose: TransformSnapshot) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(Pending {
            sequence,
            pose,
            steps: Vec::new(),
        });
    }

    /// Inputs sent but not yet acknowledged by an authoritative row.
    #[must_use]
    pub fn unacknowledged(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    /// Fold in the authoritative row for the local player.
    ///
    /// The first row seeds the pose entirely. Later rows are checked against
    /// the prediction made for the input they acknowledge; only a divergence
    /// past the snap distance moves the position. Returns `true` if the
    /// position was corrected.
    pub fn reconcile(&mut self, authoritative: &PlayerRecord) -> bool {
        let server = authoritative.transform();
        if !self.seeded {
            self.pose = server;
            self.seeded = true;
            self.history.clear();
            return true;
        }

        let ack = authoritative.last_input_seq;
        while self.history.front().is_some_and(|p| p.sequence < ack) {
            self.history.pop_front();
        }
        let predicted = match self.history.front() {
            Some(pending) if pending.sequence == ack => pending.pose,
            // Older than anything still tracked: already superseded.
            Some(_) => {
                trace!(ack, "ignoring stale authoritative row");
                return false;
            }
            // Nothing in flight, the row should match the current pose.
            None => self.pose,
        };

        let error = predicted.distance(&server);
        if error <= self.snap_distance {
            return false;
        }
        debug!(
            error,
            ack,
            replayed = self.unacknowledged(),
            "prediction diverged, rebasing on authoritative position"
        );
        self.replay_from(server.position);
        true
    }

    /// Rebase the oldest tracked input onto `position` and re-run every step
    /// predicted since.
    fn replay_from(&mut self, position: Vec3) {
        let Some(first) = self.history.front_mut() else {
            self.pose.position = position;
            return;
        };
        first.pose.position = position;

        let mut replayed = first.pose;
        for pending in &mut self.history {
            pending.pose.position = replayed.position;
            for step in &pending.steps {
                replayed.rotation = step.rotation;
                replayed = replayed.advance(&step.control, step.dt, &self.tuning);
            }
        }
        self.pose.position = replayed.position;
    }

    /// Forget the seed and the history so the next authoritative row is
    /// taken as-is.
    pub fn reset(&mut self) {
        self.pose = TransformSnapshot::default();
        self.seeded = false;
        self.history.clear();
    }
}
