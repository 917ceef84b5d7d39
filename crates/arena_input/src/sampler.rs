//! Input sampling.
//!
//! The [`InputSampler`] owns the live [`ControlState`]. Each discrete
//! transition flips exactly the flag it names; there is no event queue, so
//! whatever the snapshot holds when the tick reads it is what gets sent.
//! Pointer motion accumulates into [`ViewAngles`], kept outside the snapshot.

use std::collections::HashMap;
use std::f32::consts::PI;

use crate::control::{Control, ControlState};

/// Maximum pitch magnitude in radians (±72°).
pub const PITCH_LIMIT: f32 = PI / 2.5;

/// Default pointer sensitivity in radians per pixel.
const DEFAULT_SENSITIVITY: f32 = 0.002;

/// A raw input transition.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key was pressed, identified by its DOM-style code (`"KeyW"`).
    KeyDown(String),
    /// A key was released.
    KeyUp(String),
    /// A mouse button was pressed (`0` primary, `2` secondary).
    ButtonDown(u8),
    /// A mouse button was released.
    ButtonUp(u8),
    /// Relative pointer motion in pixels.
    PointerMoved { dx: f32, dy: f32 },
    /// Set a control directly, as a scripted policy does.
    Set(Control, bool),
    /// The window lost focus; key-up events will not arrive.
    FocusLost,
}

/// Accumulated camera/view angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewAngles {
    /// Unbounded heading.
    pub yaw: f32,
    /// Clamped to [`PITCH_LIMIT`].
    pub pitch: f32,
}

impl ViewAngles {
    /// Apply a pointer delta already scaled to radians.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Maps key codes and mouse buttons onto controls.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    keys: HashMap<String, Control>,
    buttons: HashMap<u8, Control>,
}

impl KeyBindings {
    /// An empty binding set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            buttons: HashMap::new(),
        }
    }

    /// Bind a key code to a control, replacing any existing binding.
    #[must_use]
    pub fn bind_key(mut self, code: impl Into<String>, control: Control) -> Self {
        self.keys.insert(code.into(), control);
        self
    }

    /// Bind a mouse button to a control.
    #[must_use]
    pub fn bind_button(mut self, button: u8, control: Control) -> Self {
        self.buttons.insert(button, control);
        self
    }

    /// Look up the control bound to a key code.
    #[must_use]
    pub fn key(&self, code: &str) -> Option<Control> {
        self.keys.get(code).copied()
    }

    /// Look up the control bound to a mouse button.
    #[must_use]
    pub fn button(&self, button: u8) -> Option<Control> {
        self.buttons.get(&button).copied()
    }
}

impl Default for KeyBindings {
    /// WASD and arrow keys, shift to sprint, space to jump, left click to
    /// attack and right click to cast.
    fn default() -> Self {
        Self::empty()
            .bind_key("KeyW", Control::Forward)
            .bind_key("ArrowUp", Control::Forward)
            .bind_key("KeyS", Control::Backward)
            .bind_key("ArrowDown", Control::Backward)
            .bind_key("KeyA", Control::Left)
            .bind_key("ArrowLeft", Control::Left)
            .bind_key("KeyD", Control::Right)
            .bind_key("ArrowRight", Control::Right)
            .bind_key("ShiftLeft", Control::Sprint)
            .bind_key("ShiftRight", Control::Sprint)
            .bind_key("Space", Control::Jump)
            .bind_button(0, Control::Attack)
            .bind_button(2, Control::CastSpell)
    }
}

/// Owns the live control snapshot and view angles.
#[derive(Debug, Clone)]
pub struct InputSampler {
    state: ControlState,
    view: ViewAngles,
    bindings: KeyBindings,
    sensitivity: f32,
}

impl InputSampler {
    /// Create a sampler with the given bindings.
    #[must_use]
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            state: ControlState::default(),
            view: ViewAngles::default(),
            bindings,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }

    /// Override the pointer sensitivity (radians per pixel).
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Fold one transition into the live state.
    ///
    /// Returns `true` if a control flag changed. Unbound keys and repeated
    /// presses are no-ops.
    pub fn apply(&mut self, event: &InputEvent) -> bool {
        let (control, held) = match event {
            InputEvent::KeyDown(code) => match self.bindings.key(code) {
                Some(c) => (c, true),
                None => return false,
            },
            InputEvent::KeyUp(code) => match self.bindings.key(code) {
                Some(c) => (c, false),
                None => return false,
            },
            InputEvent::ButtonDown(b) => match self.bindings.button(*b) {
                Some(c) => (c, true),
                None => return false,
            },
            InputEvent::ButtonUp(b) => match self.bindings.button(*b) {
                Some(c) => (c, false),
                None => return false,
            },
            InputEvent::PointerMoved { dx, dy } => {
                self.view
                    .rotate(-dx * self.sensitivity, -dy * self.sensitivity);
                return false;
            }
            InputEvent::Set(c, held) => (*c, *held),
            InputEvent::FocusLost => return self.release_all(),
        };
        if self.state.is_held(control) == held {
            return false;
        }
        self.state.set(control, held);
        true
    }

    /// Release every held control. The sequence number is kept.
    ///
    /// Returns `true` if anything was held.
    pub fn release_all(&mut self) -> bool {
        let released = ControlState {
            sequence: self.state.sequence,
            ..ControlState::default()
        };
        let changed = !self.state.same_controls(&released);
        self.state = released;
        changed
    }

    /// A copy of the live snapshot.
    #[must_use]
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Mutable access to the live snapshot, for the tick to stamp.
    pub fn state_mut(&mut self) -> &mut ControlState {
        &mut self.state
    }

    /// Current view angles.
    #[must_use]
    pub fn view(&self) -> ViewAngles {
        self.view
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}
