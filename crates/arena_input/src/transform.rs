//! Locally predicted pose.
//!
//! [`TransformSnapshot`] is the position and Euler rotation the client sends
//! alongside each [`ControlState`]. The authoritative service may accept,
//! clamp, or override it; the client only uses it to predict its own motion
//! between authoritative updates.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::control::ControlState;

/// Movement speeds used for local prediction, in world units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementTuning {
    pub walk_speed: f32,
    pub run_speed: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            run_speed: 8.0,
        }
    }
}

/// Position plus Euler rotation (radians, `y` is yaw).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl TransformSnapshot {
    /// Create a snapshot from a position and rotation.
    #[must_use]
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Heading around the vertical axis.
    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    /// Unit vector the player faces on the ground plane. Yaw `0` faces `-Z`.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw()) * Vec3::NEG_Z
    }

    /// Unit vector to the player's right on the ground plane.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw()) * Vec3::X
    }

    /// Return a copy facing `yaw`, keeping pitch and roll.
    #[must_use]
    pub fn facing(mut self, yaw: f32) -> Self {
        self.rotation.y = yaw;
        self
    }

    /// Advance the pose by `dt` seconds of `control` input.
    ///
    /// Movement is relative to the current yaw; sprint selects the run speed.
    #[must_use]
    pub fn advance(mut self, control: &ControlState, dt: f32, tuning: &MovementTuning) -> Self {
        let Some(direction) = control.direction() else {
            return self;
        };
        let speed = if control.sprint {
            tuning.run_speed
        } else {
            tuning.walk_speed
        };
        let (strafe, advance) = direction.local_axes();
        let step = (self.forward() * advance + self.right() * strafe) * speed * dt;
        self.position += step;
        self
    }

    /// Distance between the positions of two snapshots.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_idle_does_not_move() {
        let pose = TransformSnapshot::new(Vec3::new(1.0, 0.0, 2.0), Vec3::ZERO);
        let next = pose.advance(&ControlState::default(), 1.0, &MovementTuning::default());
        assert_eq!(pose, next);
    }

    #[test]
    fn test_forward_at_zero_yaw_moves_negative_z() {
        let mut control = ControlState::default();
        control.set(Control::Forward, true);
        let next =
            TransformSnapshot::default().advance(&control, 0.5, &MovementTuning::default());
        assert!(approx(next.position, Vec3::new(0.0, 0.0, -2.0)));
    }

    #[test]
    fn test_sprint_uses_run_speed_and_respects_yaw() {
        let mut control = ControlState::default();
        control.set(Control::Forward, true);
        control.set(Control::Sprint, true);
        let pose = TransformSnapshot::default().facing(std::f32::consts::FRAC_PI_2);
        let next = pose.advance(&control, 1.0, &MovementTuning::default());
        // Yaw +90° turns -Z towards -X.
        assert!(approx(next.position, Vec3::new(-8.0, 0.0, 0.0)));
    }

    #[test]
    fn test_strafe_right() {
        let mut control = ControlState::default();
        control.set(Control::Right, true);
        let next = TransformSnapshot::default().advance(&control, 1.0, &MovementTuning::default());
        assert!(approx(next.position, Vec3::new(4.0, 0.0, 0.0)));
    }
}
