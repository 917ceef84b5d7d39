//! Sequencing and the transmission gate.
//!
//! A [`Sequencer`] is owned by one connection. Every tick it stamps the live
//! snapshot with the next sequence number, then the gate decides whether the
//! stamped snapshot goes out.
//!
//! Gate policy: a snapshot is transmitted iff its sequence is strictly
//! greater than the last transmitted one. Field changes alone never force a
//! send; they ride on the next stamped tick. Lost packets are never
//! retransmitted, the next higher sequence supersedes them.

use crate::control::ControlState;

/// Per-connection sequence counter plus last-sent snapshot.
#[derive(Debug, Clone)]
pub struct Sequencer {
    next: u32,
    last_sent: Option<ControlState>,
}

impl Sequencer {
    /// Create a sequencer. The first stamped sequence is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: 1,
            last_sent: None,
        }
    }

    /// Write the next sequence number into `state` and return it.
    pub fn stamp(&mut self, state: &mut ControlState) -> u32 {
        let sequence = self.next;
        self.next += 1;
        state.sequence = sequence;
        sequence
    }

    /// Whether `current` must be transmitted given the last send.
    ///
    /// Sequence `0` marks a snapshot that was never stamped.
    #[must_use]
    pub fn should_transmit(&self, current: &ControlState) -> bool {
        match &self.last_sent {
            None => current.sequence > 0,
            Some(last) => current.sequence > last.sequence,
        }
    }

    /// Run the gate: returns the snapshot to send, recording it as the last
    /// sent. Returns `None` and leaves the record untouched otherwise.
    pub fn gate(&mut self, current: ControlState) -> Option<ControlState> {
        if !self.should_transmit(&current) {
            return None;
        }
        self.last_sent = Some(current);
        Some(current)
    }

    /// Stamp `state` and run the gate in one synchronous step.
    pub fn stamp_and_gate(&mut self, state: &mut ControlState) -> Option<ControlState> {
        self.stamp(state);
        self.gate(*state)
    }

    /// The last snapshot that passed the gate.
    #[must_use]
    pub fn last_sent(&self) -> Option<&ControlState> {
        self.last_sent.as_ref()
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;

    #[test]
    fn test_first_stamp_is_one() {
        let mut seq = Sequencer::new();
        let mut state = ControlState::default();
        let sent = seq.stamp_and_gate(&mut state).unwrap();
        assert_eq!(sent.sequence, 1);
        assert_eq!(state.sequence, 1);
    }

    #[test]
    fn test_unstamped_snapshot_is_not_sent() {
        let mut seq = Sequencer::new();
        assert!(seq.gate(ControlState::default()).is_none());
        assert!(seq.last_sent().is_none());
    }

    #[test]
    fn test_every_stamped_tick_is_sent_even_without_changes() {
        let mut seq = Sequencer::new();
        let mut state = ControlState::default();
        let sent: Vec<u32> = (0..5)
            .filter_map(|_| seq.stamp_and_gate(&mut state))
            .map(|s| s.sequence)
            .collect();
        assert_eq!(sent, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unadvanced_sequence_is_suppressed_even_if_fields_change() {
        let mut seq = Sequencer::new();
        let mut state = ControlState::default();
        seq.stamp_and_gate(&mut state).unwrap();

        // Same sequence, identical fields.
        assert!(seq.gate(state).is_none());

        // Same sequence, changed fields: still suppressed.
        state.set(Control::Forward, true);
        assert!(!seq.last_sent().unwrap().same_controls(&state));
        assert!(seq.gate(state).is_none());
        assert!(!seq.last_sent().unwrap().forward);

        // Next stamp carries the change.
        let sent = seq.stamp_and_gate(&mut state).unwrap();
        assert!(sent.forward);
        assert_eq!(sent.sequence, 2);
    }

    #[test]
    fn test_stale_sequence_is_never_sent() {
        let mut seq = Sequencer::new();
        let mut state = ControlState::default();
        seq.stamp_and_gate(&mut state);
        seq.stamp_and_gate(&mut state);
        let stale = ControlState {
            sequence: 1,
            jump: true,
            ..ControlState::default()
        };
        assert!(seq.gate(stale).is_none());
        assert_eq!(seq.last_sent().unwrap().sequence, 2);
    }

    #[test]
    fn test_transmitted_sequences_strictly_increase() {
        let mut seq = Sequencer::new();
        let mut state = ControlState::default();
        let mut last = 0;
        for i in 0..200 {
            state.set(Control::Forward, i % 3 == 0);
            // Interleave redundant gate attempts between stamps.
            let _ = seq.gate(state);
            if let Some(sent) = seq.stamp_and_gate(&mut state) {
                assert!(sent.sequence > last);
                last = sent.sequence;
            }
        }
        assert_eq!(last, 200);
    }
}
