//! Random-direction bot policy.
//!
//! A bot holds one cardinal direction for a random number of ticks, then
//! picks a new one and turns to face it. Sprint is rolled every tick.

use std::f32::consts::{FRAC_PI_2, PI};
use std::ops::RangeInclusive;

use arena_client::InputDriver;
use arena_client::prediction::Prediction;
use arena_input::{Control, InputSampler, MoveDirection};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Ticks a direction is held for, drawn uniformly.
pub const HOLD_TICKS: RangeInclusive<u32> = 3..=23;

/// Per-tick probability of sprinting.
pub const SPRINT_PROBABILITY: f64 = 0.3;

/// Maximum deviation from the exact facing of a new direction, in radians.
pub const YAW_JITTER: f32 = 0.25;

/// Yaw that faces `direction`.
#[must_use]
pub fn facing_yaw(direction: MoveDirection) -> f32 {
    match direction.primary() {
        MoveDirection::Backward => PI,
        MoveDirection::Left => FRAC_PI_2,
        MoveDirection::Right => -FRAC_PI_2,
        _ => 0.0,
    }
}

/// Scripted [`InputDriver`] for load testing.
#[derive(Debug)]
pub struct BotPolicy {
    rng: StdRng,
    direction: MoveDirection,
    remaining: u32,
}

impl BotPolicy {
    /// A policy with a reproducible random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            direction: MoveDirection::Forward,
            remaining: 0,
        }
    }

    /// Direction currently held.
    #[must_use]
    pub fn direction(&self) -> MoveDirection {
        self.direction
    }

    /// Ticks left before the next direction change.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn switch(&mut self, prediction: &mut Prediction) {
        self.direction = MoveDirection::CARDINAL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(MoveDirection::Forward);
        self.remaining = self.rng.gen_range(HOLD_TICKS);
        let jitter = self.rng.gen_range(-YAW_JITTER..=YAW_JITTER);
        prediction.face(facing_yaw(self.direction) + jitter);
    }
}

impl InputDriver for BotPolicy {
    fn sample(&mut self, sampler: &mut InputSampler, prediction: &mut Prediction) {
        if self.remaining == 0 {
            self.switch(prediction);
        }
        self.remaining -= 1;

        let sprint = self.rng.gen_bool(SPRINT_PROBABILITY);
        let state = sampler.state_mut();
        state.set_direction(self.direction);
        state.set(Control::Sprint, sprint);
    }
}

#[cfg(test)]
mod tests {
    use arena_input::MovementTuning;

    use super::*;

    fn harness() -> (InputSampler, Prediction) {
        (
            InputSampler::default(),
            Prediction::new(MovementTuning::default(), 2.0),
        )
    }

    #[test]
    fn test_hold_lengths_within_range() {
        let (mut sampler, mut prediction) = harness();
        let mut policy = BotPolicy::new(7);
        let mut holds = 0;
        for _ in 0..5_000 {
            let starting_hold = policy.remaining() == 0;
            policy.sample(&mut sampler, &mut prediction);
            if starting_hold {
                holds += 1;
                let length = policy.remaining() + 1;
                assert!(HOLD_TICKS.contains(&length), "hold of {length} ticks");
            }
        }
        assert!(holds > 5_000 / 23);
    }

    #[test]
    fn test_direction_applied_to_control_state() {
        let (mut sampler, mut prediction) = harness();
        let mut policy = BotPolicy::new(1);
        for _ in 0..200 {
            policy.sample(&mut sampler, &mut prediction);
            let state = sampler.state();
            assert_eq!(state.direction(), Some(policy.direction()));
            assert!(MoveDirection::CARDINAL.contains(&policy.direction()));
            assert!(!state.jump && !state.attack && !state.cast_spell);
        }
    }

    #[test]
    fn test_turns_to_face_new_direction_with_jitter() {
        let (mut sampler, mut prediction) = harness();
        let mut policy = BotPolicy::new(99);
        for _ in 0..1_000 {
            let switching = policy.remaining() == 0;
            policy.sample(&mut sampler, &mut prediction);
            if switching {
                let offset = prediction.pose().yaw() - facing_yaw(policy.direction());
                assert!(offset.abs() <= YAW_JITTER + 1e-5, "offset {offset}");
            }
        }
    }

    #[test]
    fn test_sprint_rate() {
        let (mut sampler, mut prediction) = harness();
        let mut policy = BotPolicy::new(3);
        let samples = 10_000;
        let sprinting = (0..samples)
            .filter(|_| {
                policy.sample(&mut sampler, &mut prediction);
                sampler.state().sprint
            })
            .count();
        let rate = sprinting as f64 / f64::from(samples);
        assert!((0.27..0.33).contains(&rate), "sprint rate {rate}");
    }

    #[test]
    fn test_same_seed_same_stream() {
        let (mut sa, mut pa) = harness();
        let (mut sb, mut pb) = harness();
        let mut a = BotPolicy::new(42);
        let mut b = BotPolicy::new(42);
        for _ in 0..100 {
            a.sample(&mut sa, &mut pa);
            b.sample(&mut sb, &mut pb);
            assert_eq!(sa.state(), sb.state());
        }
    }
}
