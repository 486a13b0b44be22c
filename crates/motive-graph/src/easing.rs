//! Easing functions for driver timing.
//!
//! The cubic-bezier family covers the CSS-style curves; `Back`, `Elastic`,
//! and `Bounce` are the perceptual extras used for playful motion. All
//! curves map a linear progress in [0, 1] to an eased progress (which may
//! leave [0, 1] for overshooting curves).

use serde::{Deserialize, Serialize};

/// Easing function for animation timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// No easing.
    Linear,

    /// Slow start, fast middle, slow end.
    /// Equivalent to `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,

    /// Slow start, accelerating. `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// Fast start, decelerating. `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// Slow start and end, fast middle. `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Custom cubic bezier. x values must be in [0, 1].
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// Overshoots backwards before settling forward.
    Back { overshoot: f64 },

    /// Damped oscillation into the target.
    Elastic { bounciness: f64 },

    /// Bounces off the target like a dropped ball.
    Bounce,
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::EaseInOut
    }
}

impl EasingFunction {
    /// Evaluate the easing function at progress `t`.
    ///
    /// Input is clamped to [0, 1]; output may overshoot for `Back` and
    /// `Elastic`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Back { overshoot } => t * t * ((overshoot + 1.0) * t - overshoot),
            Self::Elastic { bounciness } => {
                let p = bounciness * std::f64::consts::PI;
                1.0 - (t * std::f64::consts::FRAC_PI_2).cos().powi(3) * (t * p).cos()
            }
            Self::Bounce => bounce(t),
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// # Panics
    /// Panics if x1 or x2 are outside [0, 1].
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2),
            "Bezier x values must be in [0, 1]"
        );
        Self::CubicBezier { x1, y1, x2, y2 }
    }

    /// `Back` with the conventional overshoot constant.
    pub fn back() -> Self {
        Self::Back {
            overshoot: 1.70158,
        }
    }

    /// `Elastic` with a single oscillation.
    pub fn elastic() -> Self {
        Self::Elastic { bounciness: 1.0 }
    }
}

/// Evaluate a cubic bezier curve at progress `t`.
///
/// Newton-Raphson solves for the curve parameter whose x coordinate matches
/// the input progress; the eased value is the y coordinate there.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Solve for t in the bezier x equation using Newton-Raphson iteration.
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t = (t - x / dx).clamp(0.0, 1.0);
    }

    t
}

/// One bezier coordinate at parameter t:
/// `3(1-t)²t·c1 + 3(1-t)t²·c2 + t³`
#[inline]
fn bezier_component(c1: f64, c2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let mt = 1.0 - t;
    3.0 * mt * mt * t * c1 + 3.0 * mt * t2 * c2 + t2 * t
}

/// Derivative of a bezier coordinate with respect to t.
#[inline]
fn bezier_derivative(c1: f64, c2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * c1 + 6.0 * mt * t * (c2 - c1) + 3.0 * t * t * (1.0 - c2)
}

/// Piecewise parabolic bounce.
fn bounce(t: f64) -> f64 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}
