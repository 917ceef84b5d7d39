//! Control-state snapshot and the labels derived from it.
//!
//! A [`ControlState`] is the unit the client transmits on every tick: the
//! eight control flags plus a per-connection sequence number. It is a plain
//! `Copy` value so the tick can read the whole snapshot in one step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single logical control a player can hold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
    Sprint,
    Jump,
    Attack,
    CastSpell,
}

/// The input snapshot sent over the wire.
///
/// Movement flags are not mutually exclusive, so diagonal input is
/// representable. `sequence` is stamped by the [`Sequencer`](crate::Sequencer)
/// and is strictly increasing across every snapshot a connection transmits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub jump: bool,
    pub attack: bool,
    pub cast_spell: bool,
    pub sequence: u32,
}

impl ControlState {
    /// Set or clear the flag for `control`.
    pub fn set(&mut self, control: Control, held: bool) {
        let flag = match control {
            Control::Forward => &mut self.forward,
            Control::Backward => &mut self.backward,
            Control::Left => &mut self.left,
            Control::Right => &mut self.right,
            Control::Sprint => &mut self.sprint,
            Control::Jump => &mut self.jump,
            Control::Attack => &mut self.attack,
            Control::CastSpell => &mut self.cast_spell,
        };
        *flag = held;
    }

    /// Returns whether `control` is currently held.
    #[must_use]
    pub fn is_held(&self, control: Control) -> bool {
        match control {
            Control::Forward => self.forward,
            Control::Backward => self.backward,
            Control::Left => self.left,
            Control::Right => self.right,
            Control::Sprint => self.sprint,
            Control::Jump => self.jump,
            Control::Attack => self.attack,
            Control::CastSpell => self.cast_spell,
        }
    }

    /// Clear all four movement flags.
    pub fn clear_movement(&mut self) {
        self.forward = false;
        self.backward = false;
        self.left = false;
        self.right = false;
    }

    /// Replace the movement flags with exactly the flags of `direction`.
    pub fn set_direction(&mut self, direction: MoveDirection) {
        self.clear_movement();
        let (vertical, horizontal) = direction.components();
        if let Some(v) = vertical {
            self.set(v, true);
        }
        if let Some(h) = horizontal {
            self.set(h, true);
        }
    }

    /// Compares every control flag, ignoring the sequence number.
    #[must_use]
    pub fn same_controls(&self, other: &Self) -> bool {
        Self {
            sequence: 0,
            ..*self
        } == Self {
            sequence: 0,
            ..*other
        }
    }

    /// The movement direction implied by the flags.
    ///
    /// Opposing flags do not cancel: forward wins over backward and left wins
    /// over right. A vertical and a horizontal flag together form a composite.
    #[must_use]
    pub fn direction(&self) -> Option<MoveDirection> {
        let vertical = if self.forward {
            Some(Control::Forward)
        } else if self.backward {
            Some(Control::Backward)
        } else {
            None
        };
        let horizontal = if self.left {
            Some(Control::Left)
        } else if self.right {
            Some(Control::Right)
        } else {
            None
        };
        MoveDirection::from_components(vertical, horizontal)
    }

    /// Derive the animation label the client reports alongside this input.
    #[must_use]
    pub fn animation(&self) -> AnimationLabel {
        if self.attack {
            return AnimationLabel::Attack;
        }
        if self.cast_spell {
            return AnimationLabel::Cast;
        }
        if self.jump {
            return AnimationLabel::Jump;
        }
        match self.direction() {
            None => AnimationLabel::Idle,
            Some(direction) if self.sprint => AnimationLabel::Run(direction.primary()),
            Some(direction) => AnimationLabel::Walk(direction.primary()),
        }
    }
}

/// A movement direction, including the four diagonal composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
}

impl MoveDirection {
    /// The four cardinal directions, in tie-break priority order.
    pub const CARDINAL: [MoveDirection; 4] = [
        MoveDirection::Forward,
        MoveDirection::Backward,
        MoveDirection::Left,
        MoveDirection::Right,
    ];

    fn from_components(vertical: Option<Control>, horizontal: Option<Control>) -> Option<Self> {
        let direction = match (vertical, horizontal) {
            (Some(Control::Forward), None) => Self::Forward,
            (Some(Control::Backward), None) => Self::Backward,
            (None, Some(Control::Left)) => Self::Left,
            (None, Some(Control::Right)) => Self::Right,
            (Some(Control::Forward), Some(Control::Left)) => Self::ForwardLeft,
            (Some(Control::Forward), Some(Control::Right)) => Self::ForwardRight,
            (Some(Control::Backward), Some(Control::Left)) => Self::BackwardLeft,
            (Some(Control::Backward), Some(Control::Right)) => Self::BackwardRight,
            _ => return None,
        };
        Some(direction)
    }

    fn components(self) -> (Option<Control>, Option<Control>) {
        match self {
            Self::Forward => (Some(Control::Forward), None),
            Self::Backward => (Some(Control::Backward), None),
            Self::Left => (None, Some(Control::Left)),
            Self::Right => (None, Some(Control::Right)),
            Self::ForwardLeft => (Some(Control::Forward), Some(Control::Left)),
            Self::ForwardRight => (Some(Control::Forward), Some(Control::Right)),
            Self::BackwardLeft => (Some(Control::Backward), Some(Control::Left)),
            Self::BackwardRight => (Some(Control::Backward), Some(Control::Right)),
        }
    }

    /// The single cardinal direction used for animation.
    ///
    /// Composites collapse onto their vertical component.
    #[must_use]
    pub fn primary(self) -> Self {
        match self {
            Self::ForwardLeft | Self::ForwardRight => Self::Forward,
            Self::BackwardLeft | Self::BackwardRight => Self::Backward,
            cardinal => cardinal,
        }
    }

    /// Unit movement in the player's local frame: `x` is strafe (right
    /// positive), `y` is advance (forward positive).
    #[must_use]
    pub fn local_axes(self) -> (f32, f32) {
        let (vertical, horizontal) = self.components();
        let advance: f32 = match vertical {
            Some(Control::Forward) => 1.0,
            Some(Control::Backward) => -1.0,
            _ => 0.0,
        };
        let strafe: f32 = match horizontal {
            Some(Control::Right) => 1.0,
            Some(Control::Left) => -1.0,
            _ => 0.0,
        };
        let len = (advance * advance + strafe * strafe).sqrt();
        (strafe / len, advance / len)
    }
}

/// Animation label reported with each input and stored on the player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationLabel {
    Idle,
    Walk(MoveDirection),
    Run(MoveDirection),
    Jump,
    Attack,
    Cast,
}

impl AnimationLabel {
    /// The wire string for this label, e.g. `"walk-forward"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Jump => "jump",
            Self::Attack => "attack",
            Self::Cast => "cast",
            Self::Walk(direction) => match direction.primary() {
                MoveDirection::Backward => "walk-backward",
                MoveDirection::Left => "walk-left",
                MoveDirection::Right => "walk-right",
                _ => "walk-forward",
            },
            Self::Run(direction) => match direction.primary() {
                MoveDirection::Backward => "run-backward",
                MoveDirection::Left => "run-left",
                MoveDirection::Right => "run-right",
                _ => "run-forward",
            },
        }
    }
}

impl fmt::Display for AnimationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(controls: &[Control]) -> ControlState {
        let mut state = ControlState::default();
        for &c in controls {
            state.set(c, true);
        }
        state
    }

    #[test]
    fn test_forward_walks_and_sprint_runs() {
        let walk = holding(&[Control::Forward]);
        assert_eq!(walk.animation().as_str(), "walk-forward");

        let run = holding(&[Control::Forward, Control::Sprint]);
        assert_eq!(run.animation().as_str(), "run-forward");
    }

    #[test]
    fn test_no_movement_is_idle_even_when_sprinting() {
        assert_eq!(ControlState::default().animation(), AnimationLabel::Idle);
        let sprint_only = holding(&[Control::Sprint]);
        assert_eq!(sprint_only.animation().as_str(), "idle");
    }

    #[test]
    fn test_tie_breaks_prefer_forward_then_left() {
        let all = holding(&[
            Control::Forward,
            Control::Backward,
            Control::Left,
            Control::Right,
        ]);
        assert_eq!(all.direction(), Some(MoveDirection::ForwardLeft));
        assert_eq!(all.animation().as_str(), "walk-forward");

        let back_right = holding(&[Control::Backward, Control::Right]);
        assert_eq!(back_right.direction(), Some(MoveDirection::BackwardRight));
        assert_eq!(back_right.animation().as_str(), "walk-backward");

        let sideways = holding(&[Control::Left, Control::Right, Control::Sprint]);
        assert_eq!(sideways.direction(), Some(MoveDirection::Left));
        assert_eq!(sideways.animation().as_str(), "run-left");
    }

    #[test]
    fn test_actions_take_precedence_over_movement() {
        let state = holding(&[Control::Forward, Control::Jump, Control::CastSpell]);
        assert_eq!(state.animation(), AnimationLabel::Cast);
        let state = holding(&[Control::Forward, Control::Jump, Control::Attack]);
        assert_eq!(state.animation(), AnimationLabel::Attack);
        let state = holding(&[Control::Right, Control::Jump]);
        assert_eq!(state.animation(), AnimationLabel::Jump);
    }

    #[test]
    fn test_set_direction_replaces_movement_only() {
        let mut state = holding(&[Control::Left, Control::Sprint]);
        state.set_direction(MoveDirection::Backward);
        assert!(state.backward);
        assert!(!state.left);
        assert!(state.sprint);
    }

    #[test]
    fn test_same_controls_ignores_sequence() {
        let mut a = holding(&[Control::Forward]);
        let mut b = a;
        a.sequence = 4;
        b.sequence = 9;
        assert!(a.same_controls(&b));
        b.jump = true;
        assert!(!a.same_controls(&b));
    }

    #[test]
    fn test_diagonal_axes_are_normalised() {
        let (x, y) = MoveDirection::ForwardRight.local_axes();
        assert!(((x * x + y * y) - 1.0).abs() < 1e-6);
        assert!(x > 0.0 && y > 0.0);
    }

    #[test]
    fn test_cardinal_axes_are_unit() {
        assert_eq!(MoveDirection::Forward.local_axes(), (0.0, 1.0));
        assert_eq!(MoveDirection::Backward.local_axes(), (0.0, -1.0));
        assert_eq!(MoveDirection::Left.local_axes(), (-1.0, 0.0));
        assert_eq!(MoveDirection::Right.local_axes(), (1.0, 0.0));
    }

    #[test]
    fn test_wire_field_names() {
        let state = ControlState {
            cast_spell: true,
            sequence: 3,
            ..ControlState::default()
        };
        let bytes = rmp_serde::to_vec_named(&state).unwrap();
        let restored: ControlState = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(state, restored);
        assert!(bytes.windows(9).any(|w| w == b"castSpell"));
    }
}
