//! Exponential decay driver.
//!
//! The value coasts from its starting point with an initial velocity and
//! exponentially decaying speed:
//!
//! `value = from + (v / (1 - d)) * (1 - exp(-(1 - d) * t))`
//!
//! with `t` in milliseconds and `v` in units per millisecond. The driver
//! finishes once a tick moves the value by less than a tenth of a unit.

use serde::{Deserialize, Serialize};

use crate::drivers::{Kinematics, TickOutcome};
use crate::types::Vec2;

/// Change-per-tick threshold below which the decay is considered settled.
const REST_DELTA: f64 = 0.1;

/// Configuration for a decay driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Initial velocity in units per millisecond.
    pub velocity: f64,
    /// Decay coefficient per millisecond, in (0, 1).
    pub deceleration: f64,
    /// Override the interaction-handle default (held while running).
    pub is_interaction: Option<bool>,
}

impl DecayConfig {
    /// Decay with the conventional deceleration of 0.998.
    pub fn with_velocity(velocity: f64) -> Self {
        Self {
            velocity,
            deceleration: 0.998,
            is_interaction: None,
        }
    }

    pub fn with_deceleration(mut self, deceleration: f64) -> Self {
        self.deceleration = deceleration;
        self
    }
}

/// Vector variant: the velocity splits per axis, deceleration is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayVecConfig {
    pub velocity: Vec2,
    pub deceleration: f64,
    pub is_interaction: Option<bool>,
}

impl DecayVecConfig {
    pub fn with_velocity(velocity: Vec2) -> Self {
        Self {
            velocity,
            deceleration: 0.998,
            is_interaction: None,
        }
    }

    pub fn with_deceleration(mut self, deceleration: f64) -> Self {
        self.deceleration = deceleration;
        self
    }

    pub(crate) fn split(self) -> (DecayConfig, DecayConfig) {
        (
            DecayConfig {
                velocity: self.velocity.x,
                deceleration: self.deceleration,
                is_interaction: self.is_interaction,
            },
            DecayConfig {
                velocity: self.velocity.y,
                deceleration: self.deceleration,
                is_interaction: self.is_interaction,
            },
        )
    }
}

/// Runtime state of a decay driver.
pub(crate) struct DecayState {
    from_value: f64,
    velocity: f64,
    deceleration: f64,
    start_time: f64,
    last_value: f64,
    last_time: f64,
}

impl DecayState {
    pub(crate) fn new(config: &DecayConfig, from_value: f64, now: f64) -> Self {
        Self {
            from_value,
            velocity: config.velocity,
            deceleration: config.deceleration,
            start_time: now,
            last_value: from_value,
            last_time: now,
        }
    }

    pub(crate) fn tick(&mut self, now: f64) -> TickOutcome {
        let k = 1.0 - self.deceleration;
        let elapsed = now - self.start_time;
        let value = self.from_value + (self.velocity / k) * (1.0 - (-k * elapsed).exp());

        let done = (self.last_value - value).abs() < REST_DELTA;
        self.last_value = value;
        self.last_time = now;

        TickOutcome {
            emit: Some(value),
            snap: None,
            done,
        }
    }

    pub(crate) fn kinematics(&self) -> Kinematics {
        let k = 1.0 - self.deceleration;
        let elapsed = self.last_time - self.start_time;
        Kinematics {
            position: self.last_value,
            velocity: self.velocity * (-k * elapsed).exp(),
            time: self.last_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_in_velocity_direction_and_slows() {
        let config = DecayConfig::with_velocity(0.5);
        let mut state = DecayState::new(&config, 0.0, 0.0);

        let first = state.tick(16.0).emit.unwrap();
        let second = state.tick(32.0).emit.unwrap();
        assert!(first > 0.0);
        assert!(second > first);
        // Decelerating: later frames cover less ground.
        assert!(second - first < first);
    }

    #[test]
    fn test_converges_to_asymptote() {
        let config = DecayConfig::with_velocity(0.5);
        let mut state = DecayState::new(&config, 0.0, 0.0);

        let asymptote = 0.5 / (1.0 - 0.998);
        let mut now = 0.0;
        let mut last = 0.0;
        for _ in 0..100_000 {
            now += 16.0;
            let outcome = state.tick(now);
            last = outcome.emit.unwrap();
            if outcome.done {
                break;
            }
        }
        assert!(last <= asymptote);
        assert!(asymptote - last < 60.0);
    }

    #[test]
    fn test_zero_velocity_finishes_immediately() {
        let config = DecayConfig::with_velocity(0.0);
        let mut state = DecayState::new(&config, 10.0, 0.0);
        let outcome = state.tick(16.0);
        assert_eq!(outcome.emit, Some(10.0));
        assert!(outcome.done);
    }

    #[test]
    fn test_negative_velocity_moves_backwards() {
        let config = DecayConfig::with_velocity(-0.5);
        let mut state = DecayState::new(&config, 0.0, 0.0);
        assert!(state.tick(16.0).emit.unwrap() < 0.0);
    }

    #[test]
    fn test_kinematics_velocity_decays() {
        let config = DecayConfig::with_velocity(0.5);
        let mut state = DecayState::new(&config, 0.0, 0.0);
        state.tick(1000.0);
        let k = state.kinematics();
        assert!(k.velocity > 0.0);
        assert!(k.velocity < 0.5);
        assert_eq!(k.time, 1000.0);
    }

    #[test]
    fn test_vec_config_splits_velocity() {
        let config = DecayVecConfig::with_velocity(Vec2::new(1.0, -2.0));
        let (x, y) = config.split();
        assert_eq!(x.velocity, 1.0);
        assert_eq!(y.velocity, -2.0);
        assert_eq!(x.deceleration, y.deceleration);
    }
}
