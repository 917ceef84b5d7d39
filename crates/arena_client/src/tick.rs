//! Tick sources and the send throttle.
//!
//! A [`TickSource`] is invoked at least every tick interval, possibly more
//! often; the consumer self-throttles with a [`TickThrottle`]. Background
//! and bot clients use a true timer ([`FixedInterval`]); an interactive
//! client forwards its display-refresh callbacks ([`FrameTicks`]).

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Something that wakes the session up to consider sending input.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next firing. `None` means the source has stopped.
    async fn next_tick(&mut self) -> Option<Instant>;
}

/// Timer-driven ticks at a fixed interval. The first tick fires immediately.
#[derive(Debug)]
pub struct FixedInterval {
    interval: Interval,
}

impl FixedInterval {
    /// Create a timer firing every `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for FixedInterval {
    async fn next_tick(&mut self) -> Option<Instant> {
        Some(self.interval.tick().await)
    }
}

/// Ticks forwarded from a display-refresh loop.
#[derive(Debug)]
pub struct FrameTicks {
    frames: mpsc::Receiver<Instant>,
}

impl FrameTicks {
    /// Create a frame source and the sender the render loop calls once per
    /// frame.
    #[must_use]
    pub fn new(capacity: usize) -> (mpsc::Sender<Instant>, Self) {
        let (tx, frames) = mpsc::channel(capacity.max(1));
        (tx, Self { frames })
    }
}

#[async_trait]
impl TickSource for FrameTicks {
    async fn next_tick(&mut self) -> Option<Instant> {
        self.frames.recv().await
    }
}

/// Rate limiter: allows at most one send per interval.
#[derive(Debug, Clone)]
pub struct TickThrottle {
    interval: Duration,
    last_send: Option<Instant>,
}

impl TickThrottle {
    /// Create a throttle with the given minimum spacing.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// Returns `true` and records `now` as the last send if at least one
    /// interval has elapsed since the previous send.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = self
            .last_send
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_send = Some(now);
        }
        due
    }

    /// Forget the last send time.
    pub fn reset(&mut self) {
        self.last_send = None;
    }
}
