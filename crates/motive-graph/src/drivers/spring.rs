//! Damped spring driver.
//!
//! Integrates `a = tension * (to - x) - friction * v` with classic
//! fourth-order Runge-Kutta at a fixed 1ms timestep. A frame advances as
//! many fixed steps as wall-clock time elapsed, capped at 64 so a long
//! pause is caught up gradually over following frames instead of jumping.
//!
//! Springs are parameterized either directly as tension/friction or
//! perceptually as bounciness/speed, which converts through the
//! origami-style analytic mapping. Supplying both sets is a configuration
//! error.
//!
//! When a spring displaces another kinematic driver on the same value, it
//! inherits the outgoing driver's position, velocity, and clock (policy
//! configurable), preserving physical continuity across re-targeting.

use crate::drivers::{DriverTag, Handoff, Kinematics, StateInheritance, TickOutcome, To, ToVec};
use crate::error::ConfigError;
use crate::types::Vec2;

/// Fixed integration timestep in milliseconds.
const TIMESTEP_MS: f64 = 1.0;

/// Maximum wall-clock milliseconds consumed per frame.
const MAX_CATCHUP_MS: f64 = 64.0;

/// Configuration for a spring driver.
#[derive(Debug, Clone)]
pub struct SpringConfig {
    /// Destination, fixed or tracked.
    pub to_value: To,
    /// Stop the spring the moment it crosses the destination.
    pub overshoot_clamping: bool,
    /// Displacement magnitude below which the spring can rest.
    pub rest_displacement_threshold: f64,
    /// Speed magnitude below which the spring can rest.
    pub rest_speed_threshold: f64,
    /// Initial velocity; overrides any inherited velocity.
    pub velocity: Option<f64>,
    /// Perceptual parameter set. Exclusive with tension/friction.
    pub bounciness: Option<f64>,
    pub speed: Option<f64>,
    /// Physical parameter set. Exclusive with bounciness/speed.
    pub tension: Option<f64>,
    pub friction: Option<f64>,
    /// Kinematic-state inheritance policy on re-targeting.
    pub inherit: StateInheritance,
    /// Override the interaction-handle default (held while running).
    pub is_interaction: Option<bool>,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            to_value: To::Fixed(0.0),
            overshoot_clamping: false,
            rest_displacement_threshold: 0.001,
            rest_speed_threshold: 0.001,
            velocity: None,
            bounciness: None,
            speed: None,
            tension: None,
            friction: None,
            inherit: StateInheritance::default(),
            is_interaction: None,
        }
    }
}

impl SpringConfig {
    /// Spring to `to` with the default tension/friction (40, 7).
    pub fn to(to: impl Into<To>) -> Self {
        Self {
            to_value: to.into(),
            ..Self::default()
        }
    }

    pub fn with_bounciness_speed(mut self, bounciness: f64, speed: f64) -> Self {
        self.bounciness = Some(bounciness);
        self.speed = Some(speed);
        self
    }

    pub fn with_tension_friction(mut self, tension: f64, friction: f64) -> Self {
        self.tension = Some(tension);
        self.friction = Some(friction);
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_overshoot_clamping(mut self, clamp: bool) -> Self {
        self.overshoot_clamping = clamp;
        self
    }

    pub fn with_inherit(mut self, inherit: StateInheritance) -> Self {
        self.inherit = inherit;
        self
    }

    /// Check the parameter sets for exclusivity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let perceptual = self.bounciness.is_some() || self.speed.is_some();
        let physical = self.tension.is_some() || self.friction.is_some();
        if perceptual && physical {
            return Err(ConfigError::ConflictingSpringParameters);
        }
        Ok(())
    }

    /// Resolve to integration coefficients.
    ///
    /// # Panics
    /// Panics when both parameter sets are supplied; call [`validate`]
    /// first for untrusted configs.
    ///
    /// [`validate`]: Self::validate
    pub(crate) fn coefficients(&self) -> (f64, f64) {
        if let Err(error) = self.validate() {
            panic!("invalid spring configuration: {error}");
        }
        if self.bounciness.is_some() || self.speed.is_some() {
            from_bounciness_and_speed(self.bounciness.unwrap_or(8.0), self.speed.unwrap_or(12.0))
        } else {
            from_origami_tension_and_friction(
                self.tension.unwrap_or(40.0),
                self.friction.unwrap_or(7.0),
            )
        }
    }
}

/// Vector variant: destination and initial velocity split per axis.
#[derive(Debug, Clone)]
pub struct SpringVecConfig {
    pub to_value: ToVec,
    pub overshoot_clamping: bool,
    pub rest_displacement_threshold: f64,
    pub rest_speed_threshold: f64,
    pub velocity: Option<Vec2>,
    pub bounciness: Option<f64>,
    pub speed: Option<f64>,
    pub tension: Option<f64>,
    pub friction: Option<f64>,
    pub inherit: StateInheritance,
    pub is_interaction: Option<bool>,
}

impl SpringVecConfig {
    /// Spring to `to` with the default tension/friction.
    pub fn to(to: impl Into<ToVec>) -> Self {
        Self {
            to_value: to.into(),
            overshoot_clamping: false,
            rest_displacement_threshold: 0.001,
            rest_speed_threshold: 0.001,
            velocity: None,
            bounciness: None,
            speed: None,
            tension: None,
            friction: None,
            inherit: StateInheritance::default(),
            is_interaction: None,
        }
    }

    pub fn with_bounciness_speed(mut self, bounciness: f64, speed: f64) -> Self {
        self.bounciness = Some(bounciness);
        self.speed = Some(speed);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub(crate) fn split(self) -> (SpringConfig, SpringConfig) {
        let (to_x, to_y) = self.to_value.split();
        let shared = SpringConfig {
            to_value: To::Fixed(0.0),
            overshoot_clamping: self.overshoot_clamping,
            rest_displacement_threshold: self.rest_displacement_threshold,
            rest_speed_threshold: self.rest_speed_threshold,
            velocity: None,
            bounciness: self.bounciness,
            speed: self.speed,
            tension: self.tension,
            friction: self.friction,
            inherit: self.inherit,
            is_interaction: self.is_interaction,
        };
        (
            SpringConfig {
                to_value: to_x,
                velocity: self.velocity.map(|v| v.x),
                ..shared.clone()
            },
            SpringConfig {
                to_value: to_y,
                velocity: self.velocity.map(|v| v.y),
                ..shared
            },
        )
    }
}

/// Runtime state of a spring driver.
pub(crate) struct SpringState {
    to_value: f64,
    tension: f64,
    friction: f64,
    overshoot_clamping: bool,
    rest_displacement_threshold: f64,
    rest_speed_threshold: f64,
    start_position: f64,
    last_position: f64,
    last_velocity: f64,
    last_time: f64,
}

impl SpringState {
    pub(crate) fn new(
        config: &SpringConfig,
        from_value: f64,
        now: f64,
        handoff: Option<Handoff>,
    ) -> Self {
        let (tension, friction) = config.coefficients();
        let to_value = match &config.to_value {
            To::Fixed(v) => *v,
            To::Track(source) => source.get_value(),
        };

        let mut last_position = from_value;
        let mut last_velocity = 0.0;
        let mut last_time = now;

        let inherited = match config.inherit {
            StateInheritance::Never => None,
            StateInheritance::SameKind => {
                handoff.filter(|h| h.tag == DriverTag::Spring)
            }
            StateInheritance::Any => handoff,
        };
        if let Some(Handoff { kinematics, .. }) = inherited {
            last_position = kinematics.position;
            last_velocity = kinematics.velocity;
            last_time = kinematics.time;
        }
        if let Some(velocity) = config.velocity {
            last_velocity = velocity;
        }

        Self {
            to_value,
            tension,
            friction,
            overshoot_clamping: config.overshoot_clamping,
            rest_displacement_threshold: config.rest_displacement_threshold,
            rest_speed_threshold: config.rest_speed_threshold,
            start_position: from_value,
            last_position,
            last_velocity,
            last_time,
        }
    }

    pub(crate) fn tick(&mut self, now: f64) -> TickOutcome {
        let now = now.min(self.last_time + MAX_CATCHUP_MS);

        let mut position = self.last_position;
        let mut velocity = self.last_velocity;
        let mut temp_position = self.last_position;
        let mut temp_velocity = self.last_velocity;

        let num_steps = ((now - self.last_time) / TIMESTEP_MS).floor() as u64;
        for _ in 0..num_steps {
            let step = TIMESTEP_MS / 1000.0;

            let a_velocity = velocity;
            let a_acceleration = self.acceleration(temp_position, temp_velocity);
            temp_position = position + a_velocity * step / 2.0;
            temp_velocity = velocity + a_acceleration * step / 2.0;

            let b_velocity = temp_velocity;
            let b_acceleration = self.acceleration(temp_position, temp_velocity);
            temp_position = position + b_velocity * step / 2.0;
            temp_velocity = velocity + b_acceleration * step / 2.0;

            let c_velocity = temp_velocity;
            let c_acceleration = self.acceleration(temp_position, temp_velocity);
            temp_position = position + c_velocity * step;
            temp_velocity = velocity + c_acceleration * step;

            let d_velocity = temp_velocity;
            let d_acceleration = self.acceleration(temp_position, temp_velocity);

            let dxdt = (a_velocity + 2.0 * (b_velocity + c_velocity) + d_velocity) / 6.0;
            let dvdt =
                (a_acceleration + 2.0 * (b_acceleration + c_acceleration) + d_acceleration) / 6.0;

            position += dxdt * step;
            velocity += dvdt * step;
        }

        self.last_time = now;
        self.last_position = position;
        self.last_velocity = velocity;

        let overshooting = self.overshoot_clamping
            && self.tension != 0.0
            && if self.start_position < self.to_value {
                position > self.to_value
            } else {
                position < self.to_value
            };
        let at_rest_speed = velocity.abs() <= self.rest_speed_threshold;
        let displaced_enough = self.tension == 0.0
            || (self.to_value - position).abs() <= self.rest_displacement_threshold;
        let done = overshooting || (at_rest_speed && displaced_enough);

        TickOutcome {
            emit: Some(position),
            snap: (done && self.tension != 0.0).then_some(self.to_value),
            done,
        }
    }

    pub(crate) fn kinematics(&self) -> Kinematics {
        Kinematics {
            position: self.last_position,
            velocity: self.last_velocity,
            time: self.last_time,
        }
    }

    fn acceleration(&self, position: f64, velocity: f64) -> f64 {
        self.tension * (self.to_value - position) - self.friction * velocity
    }
}

fn tension_from_origami_value(value: f64) -> f64 {
    (value - 30.0) * 3.62 + 194.0
}

fn friction_from_origami_value(value: f64) -> f64 {
    (value - 8.0) * 3.0 + 25.0
}

/// Map the origami tension/friction parameterization onto integration
/// coefficients.
fn from_origami_tension_and_friction(tension: f64, friction: f64) -> (f64, f64) {
    (
        tension_from_origami_value(tension),
        friction_from_origami_value(friction),
    )
}

/// Map the perceptual bounciness/speed parameterization onto integration
/// coefficients.
fn from_bounciness_and_speed(bounciness: f64, speed: f64) -> (f64, f64) {
    fn normalize(value: f64, start: f64, end: f64) -> f64 {
        (value - start) / (end - start)
    }
    fn project_normal(n: f64, start: f64, end: f64) -> f64 {
        start + n * (end - start)
    }
    fn linear_interpolation(t: f64, start: f64, end: f64) -> f64 {
        t * end + (1.0 - t) * start
    }
    fn quadratic_out_interpolation(t: f64, start: f64, end: f64) -> f64 {
        linear_interpolation(2.0 * t - t * t, start, end)
    }
    fn b3_friction1(x: f64) -> f64 {
        0.0007 * x.powi(3) - 0.031 * x.powi(2) + 0.64 * x + 1.28
    }
    fn b3_friction2(x: f64) -> f64 {
        0.000044 * x.powi(3) - 0.006 * x.powi(2) + 0.36 * x + 2.0
    }
    fn b3_friction3(x: f64) -> f64 {
        0.00000045 * x.powi(3) - 0.000332 * x.powi(2) + 0.1078 * x + 5.84
    }
    fn b3_nobounce(tension: f64) -> f64 {
        if tension <= 18.0 {
            b3_friction1(tension)
        } else if tension <= 44.0 {
            b3_friction2(tension)
        } else {
            b3_friction3(tension)
        }
    }

    let b = project_normal(normalize(bounciness / 1.7, 0.0, 20.0), 0.0, 0.8);
    let s = normalize(speed / 1.7, 0.0, 20.0);
    let bouncy_tension = project_normal(s, 0.5, 200.0);
    let bouncy_friction =
        quadratic_out_interpolation(b, b3_nobounce(bouncy_tension), 0.01);

    (
        tension_from_origami_value(bouncy_tension),
        friction_from_origami_value(bouncy_friction),
    )
}
