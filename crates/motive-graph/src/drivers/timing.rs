//! Eased duration/delay driver.

use crate::drivers::{TickOutcome, To, ToVec};
use crate::easing::EasingFunction;

/// Configuration for a timing driver.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Destination, fixed or tracked.
    pub to_value: To,
    /// Easing applied to the elapsed ratio.
    pub easing: EasingFunction,
    /// Duration in milliseconds, clamped to >= 0.
    pub duration_ms: f64,
    /// Delay before the animation begins, in milliseconds.
    pub delay_ms: f64,
    /// Override the interaction-handle default (held while `duration > 0`).
    pub is_interaction: Option<bool>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            to_value: To::Fixed(0.0),
            easing: EasingFunction::default(),
            duration_ms: 500.0,
            delay_ms: 0.0,
            is_interaction: None,
        }
    }
}

impl TimingConfig {
    /// Timing to `to` with the defaults (500ms, ease-in-out).
    pub fn to(to: impl Into<To>) -> Self {
        Self {
            to_value: to.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }
}

/// Vector variant: the destination splits per axis, everything else is
/// shared verbatim.
#[derive(Debug, Clone)]
pub struct TimingVecConfig {
    pub to_value: ToVec,
    pub easing: EasingFunction,
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub is_interaction: Option<bool>,
}

impl TimingVecConfig {
    /// Timing to `to` with the defaults.
    pub fn to(to: impl Into<ToVec>) -> Self {
        Self {
            to_value: to.into(),
            easing: EasingFunction::default(),
            duration_ms: 500.0,
            delay_ms: 0.0,
            is_interaction: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub(crate) fn split(self) -> (TimingConfig, TimingConfig) {
        let (to_x, to_y) = self.to_value.split();
        let shared = TimingConfig {
            to_value: To::Fixed(0.0),
            easing: self.easing,
            duration_ms: self.duration_ms,
            delay_ms: self.delay_ms,
            is_interaction: self.is_interaction,
        };
        (
            TimingConfig {
                to_value: to_x,
                ..shared.clone()
            },
            TimingConfig {
                to_value: to_y,
                ..shared
            },
        )
    }
}

/// Runtime state of a timing driver.
pub(crate) struct TimingState {
    from_value: f64,
    to_value: f64,
    easing: EasingFunction,
    duration_ms: f64,
    delay_until: f64,
    start_time: f64,
    delaying: bool,
}

impl TimingState {
    pub(crate) fn new(config: &TimingConfig, from_value: f64, now: f64) -> Self {
        let to_value = match &config.to_value {
            To::Fixed(v) => *v,
            // A tracked destination normally routes through a tracking
            // binding; reaching here pins it to the source's current value.
            To::Track(source) => source.get_value(),
        };
        let delay = config.delay_ms.max(0.0);
        Self {
            from_value,
            to_value,
            easing: config.easing,
            duration_ms: config.duration_ms.max(0.0),
            delay_until: now + delay,
            start_time: now,
            delaying: delay > 0.0,
        }
    }

    /// A zero-duration timing with no delay completes inside `begin`.
    pub(crate) fn starts_synchronously(&self) -> bool {
        !self.delaying && self.duration_ms == 0.0
    }

    pub(crate) fn tick(&mut self, now: f64) -> TickOutcome {
        if self.delaying {
            if now < self.delay_until {
                return TickOutcome::reschedule();
            }
            self.delaying = false;
            self.start_time = now;
        }

        if now - self.start_time >= self.duration_ms {
            // Exact destination, not the eased approximation.
            return TickOutcome {
                emit: Some(self.to_value),
                snap: None,
                done: true,
            };
        }

        let ratio = (now - self.start_time) / self.duration_ms;
        let eased = self.easing.evaluate(ratio);
        TickOutcome {
            emit: Some(self.from_value + eased * (self.to_value - self.from_value)),
            snap: None,
            done: false,
        }
    }
}
