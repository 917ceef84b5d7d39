//! Input drivers: how the live control state is brought up to date before a
//! tick reads it.

use arena_input::{InputEvent, InputSampler};
use tokio::sync::mpsc;

use crate::prediction::Prediction;

/// Updates the sampler (and, for scripted drivers, the facing) right before
/// the tick samples it. Must not block.
pub trait InputDriver: Send {
    fn sample(&mut self, sampler: &mut InputSampler, prediction: &mut Prediction);
}

/// Drains UI input events delivered over a channel.
///
/// Events are folded in arrival order, so the state at tick time is the
/// latest state, never a queue of transitions.
#[derive(Debug)]
pub struct ChannelInput {
    events: mpsc::UnboundedReceiver<InputEvent>,
}

impl ChannelInput {
    /// Create the driver and the sender the UI layer feeds.
    #[must_use]
    pub fn new() -> (mpsc::UnboundedSender<InputEvent>, Self) {
        let (tx, events) = mpsc::unbounded_channel();
        (tx, Self { events })
    }
}

impl InputDriver for ChannelInput {
    fn sample(&mut self, sampler: &mut InputSampler, prediction: &mut Prediction) {
        let mut turned = false;
        while let Ok(event) = self.events.try_recv() {
            turned |= matches!(event, InputEvent::PointerMoved { .. });
            sampler.apply(&event);
        }
        if turned {
            prediction.face(sampler.view().yaw);
        }
    }
}

#[cfg(test)]
mod tests {
    use arena_input::MovementTuning;

    use super::*;

    #[test]
    fn test_channel_input_folds_pending_events() {
        let (tx, mut driver) = ChannelInput::new();
        let mut sampler = InputSampler::default().with_sensitivity(0.01);
        let mut prediction = Prediction::new(MovementTuning::default(), 2.0);

        tx.send(InputEvent::KeyDown("KeyW".into())).unwrap();
        tx.send(InputEvent::KeyDown("ShiftLeft".into())).unwrap();
        tx.send(InputEvent::KeyUp("ShiftLeft".into())).unwrap();
        tx.send(InputEvent::PointerMoved { dx: -50.0, dy: 0.0 })
            .unwrap();
        driver.sample(&mut sampler, &mut prediction);

        let state = sampler.state();
        assert!(state.forward);
        assert!(!state.sprint);
        assert!((prediction.pose().yaw() - 0.5).abs() < 1e-6);
    }
}
