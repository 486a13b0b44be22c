//! Piecewise interpolation nodes.
//!
//! An `Interpolation` maps its parent's scalar through a configured
//! input/output range table. Output ranges are either numeric or string
//! patterns sharing one shape ("0deg" … "360deg", "rgba(0, 0, 0, 1)" …);
//! every numeric token in a pattern interpolates independently and the
//! surrounding text is reassembled around the results.
//!
//! Inputs outside the range extrapolate per side: `Extend` continues the
//! edge segment's slope, `Clamp` pins to the edge output, `Identity`
//! passes the raw input through.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::easing::EasingFunction;
use crate::error::{ConfigError, Result};
use crate::node::{AnimNode, ChildSet, NodeKey};
use crate::types::PropertyValue;

/// Behavior for inputs outside the configured input range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolate {
    /// Continue the edge segment's slope.
    Extend,
    /// Pin to the edge output value.
    Clamp,
    /// Return the raw input unchanged.
    Identity,
}

impl Default for Extrapolate {
    fn default() -> Self {
        Self::Extend
    }
}

/// Output side of an interpolation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputRange {
    /// Numeric outputs, one per input stop.
    Numbers { values: Vec<f64> },
    /// String patterns, one per input stop, sharing one shape.
    Patterns { values: Vec<String> },
}

/// Configuration for an interpolation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Monotonically non-decreasing input stops, at least two.
    pub input_range: Vec<f64>,
    /// Output stops, one per input stop.
    pub output_range: OutputRange,
    /// Optional easing applied to each segment's local ratio.
    pub easing: Option<EasingFunction>,
    /// Extrapolation below the first input stop.
    pub extrapolate_left: Extrapolate,
    /// Extrapolation above the last input stop.
    pub extrapolate_right: Extrapolate,
}

impl InterpolationConfig {
    /// Numeric range table with default extrapolation.
    pub fn numeric(input_range: Vec<f64>, output_range: Vec<f64>) -> Self {
        Self {
            input_range,
            output_range: OutputRange::Numbers {
                values: output_range,
            },
            easing: None,
            extrapolate_left: Extrapolate::Extend,
            extrapolate_right: Extrapolate::Extend,
        }
    }

    /// String-pattern range table with default extrapolation.
    pub fn patterns(
        input_range: Vec<f64>,
        output_range: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            input_range,
            output_range: OutputRange::Patterns {
                values: output_range.into_iter().map(Into::into).collect(),
            },
            easing: None,
            extrapolate_left: Extrapolate::Extend,
            extrapolate_right: Extrapolate::Extend,
        }
    }

    /// Set the segment easing.
    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Set both extrapolation sides at once.
    pub fn with_extrapolate(mut self, mode: Extrapolate) -> Self {
        self.extrapolate_left = mode;
        self.extrapolate_right = mode;
        self
    }

    /// Set the left extrapolation side.
    pub fn with_extrapolate_left(mut self, mode: Extrapolate) -> Self {
        self.extrapolate_left = mode;
        self
    }

    /// Set the right extrapolation side.
    pub fn with_extrapolate_right(mut self, mode: Extrapolate) -> Self {
        self.extrapolate_right = mode;
        self
    }
}

/// Parsed form of the output side.
enum ResolvedOutput {
    Numbers(Vec<f64>),
    Patterns {
        /// Fixed text around the numeric slots; `literals.len() == slots + 1`.
        literals: Vec<String>,
        /// Per-slot output stops: `stops[slot][input_index]`.
        stops: Vec<Vec<f64>>,
        /// Round the first three slots to integers (rgb channels).
        round_rgb: bool,
    },
}

/// A node deriving a scalar or string from its parent's scalar.
#[derive(Clone)]
pub struct Interpolation {
    inner: Rc<RefCell<InterpolationState>>,
}

pub(crate) struct InterpolationState {
    parent: AnimNode,
    input_range: Vec<f64>,
    output: ResolvedOutput,
    easing: Option<EasingFunction>,
    extrapolate_left: Extrapolate,
    extrapolate_right: Extrapolate,
    children: ChildSet,
}

#[derive(Clone)]
pub(crate) struct WeakInterpolation(Weak<RefCell<InterpolationState>>);

impl WeakInterpolation {
    pub(crate) fn upgrade(&self) -> Option<Interpolation> {
        self.0.upgrade().map(|inner| Interpolation { inner })
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(self.0.as_ptr() as *const () as usize)
    }
}

impl Interpolation {
    /// Build an interpolation over `parent`.
    ///
    /// Fails when the range table is malformed or `parent` does not produce
    /// a scalar (a string-output interpolation cannot feed another one).
    pub fn new(parent: impl Into<AnimNode>, config: InterpolationConfig) -> Result<Self> {
        let parent = parent.into();
        if parent.scalar().is_none() {
            return Err(ConfigError::NonNumericParent(
                parent.current().kind_name(),
            ));
        }

        let input = &config.input_range;
        if input.len() < 2 || input.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::BadInputRange(input.clone()));
        }

        let output = resolve_output(&config.output_range, input.len())?;

        Ok(Self {
            inner: Rc::new(RefCell::new(InterpolationState {
                parent,
                input_range: config.input_range,
                output,
                easing: config.easing,
                extrapolate_left: config.extrapolate_left,
                extrapolate_right: config.extrapolate_right,
                children: ChildSet::default(),
            })),
        })
    }

    /// Current output for the parent's current scalar.
    pub fn current(&self) -> PropertyValue {
        let input = self.inner.borrow().parent.scalar().unwrap_or_default();
        let state = self.inner.borrow();
        state.evaluate(input)
    }

    /// Current output when it is numeric, `None` for pattern outputs.
    pub(crate) fn scalar(&self) -> Option<f64> {
        self.current().as_number()
    }

    /// Chain a further interpolation over this node's numeric output.
    pub fn interpolate(&self, config: InterpolationConfig) -> Result<Interpolation> {
        Interpolation::new(self, config)
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub(crate) fn downgrade(&self) -> WeakInterpolation {
        WeakInterpolation(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_children<R>(&self, f: impl FnOnce(&mut ChildSet) -> R) -> R {
        f(&mut self.inner.borrow_mut().children)
    }

    pub(crate) fn inputs(&self) -> Vec<AnimNode> {
        vec![self.inner.borrow().parent.clone()]
    }
}

impl fmt::Debug for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Interpolation")
            .field("input_range", &state.input_range)
            .finish_non_exhaustive()
    }
}

impl InterpolationState {
    fn evaluate(&self, input: f64) -> PropertyValue {
        let segment = find_segment(&self.input_range, input);
        let in_min = self.input_range[segment];
        let in_max = self.input_range[segment + 1];

        match &self.output {
            ResolvedOutput::Numbers(stops) => PropertyValue::Number {
                value: interpolate_segment(
                    input,
                    in_min,
                    in_max,
                    stops[segment],
                    stops[segment + 1],
                    self.easing,
                    self.extrapolate_left,
                    self.extrapolate_right,
                ),
            },
            ResolvedOutput::Patterns {
                literals,
                stops,
                round_rgb,
            } => {
                let mut out = String::with_capacity(literals[0].len() + 8 * stops.len());
                out.push_str(&literals[0]);
                for (slot, slot_stops) in stops.iter().enumerate() {
                    let mut v = interpolate_segment(
                        input,
                        in_min,
                        in_max,
                        slot_stops[segment],
                        slot_stops[segment + 1],
                        self.easing,
                        self.extrapolate_left,
                        self.extrapolate_right,
                    );
                    if *round_rgb && slot < 3 {
                        v = v.round().clamp(0.0, 255.0);
                    }
                    out.push_str(&format_number(v));
                    out.push_str(&literals[slot + 1]);
                }
                PropertyValue::Text { value: out }
            }
        }
    }
}

/// Index of the segment whose span covers `input` (edge segments take
/// out-of-range inputs).
fn find_segment(input_range: &[f64], input: f64) -> usize {
    let mut index = 1;
    while index < input_range.len() - 1 && input_range[index] < input {
        index += 1;
    }
    index - 1
}

/// Map `input` across one segment with easing and extrapolation applied.
#[allow(clippy::too_many_arguments)]
fn interpolate_segment(
    input: f64,
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
    easing: Option<EasingFunction>,
    extrapolate_left: Extrapolate,
    extrapolate_right: Extrapolate,
) -> f64 {
    let mut result = input;

    if result < in_min {
        match extrapolate_left {
            Extrapolate::Identity => return result,
            Extrapolate::Clamp => result = in_min,
            Extrapolate::Extend => {}
        }
    }
    if result > in_max {
        match extrapolate_right {
            Extrapolate::Identity => return result,
            Extrapolate::Clamp => result = in_max,
            Extrapolate::Extend => {}
        }
    }

    if out_min == out_max {
        return out_min;
    }
    if in_min == in_max {
        return if input <= in_min { out_min } else { out_max };
    }

    // Normalize into the segment.
    result = if in_min == f64::NEG_INFINITY {
        -result
    } else if in_max == f64::INFINITY {
        result - in_min
    } else {
        (result - in_min) / (in_max - in_min)
    };

    if let Some(easing) = easing {
        result = easing.evaluate(result);
    }

    // Project onto the output span.
    if out_min == f64::NEG_INFINITY {
        -result
    } else if out_max == f64::INFINITY {
        result + out_min
    } else {
        result * (out_max - out_min) + out_min
    }
}

fn resolve_output(output: &OutputRange, input_len: usize) -> Result<ResolvedOutput> {
    match output {
        OutputRange::Numbers { values } => {
            if values.len() != input_len {
                return Err(ConfigError::RangeLengthMismatch {
                    input: input_len,
                    output: values.len(),
                });
            }
            Ok(ResolvedOutput::Numbers(values.clone()))
        }
        OutputRange::Patterns { values } => {
            if values.len() != input_len {
                return Err(ConfigError::RangeLengthMismatch {
                    input: input_len,
                    output: values.len(),
                });
            }

            let (literals, first_numbers) = parse_pattern(&values[0]);
            if first_numbers.is_empty() {
                return Err(ConfigError::PatternWithoutNumber(values[0].clone()));
            }

            let mut stops = vec![Vec::with_capacity(values.len()); first_numbers.len()];
            for (slot, number) in first_numbers.iter().enumerate() {
                stops[slot].push(*number);
            }
            for pattern in &values[1..] {
                let (lits, numbers) = parse_pattern(pattern);
                if lits != literals || numbers.len() != first_numbers.len() {
                    return Err(ConfigError::PatternMismatch(
                        values[0].clone(),
                        pattern.clone(),
                    ));
                }
                for (slot, number) in numbers.iter().enumerate() {
                    stops[slot].push(*number);
                }
            }

            let round_rgb = literals[0].trim_start().starts_with("rgb");
            Ok(ResolvedOutput::Patterns {
                literals,
                stops,
                round_rgb,
            })
        }
    }
}

/// Split a pattern into fixed literals and numeric tokens.
///
/// Returns `literals` (always one longer than the token list) such that the
/// original string is `literals[0] + n0 + literals[1] + n1 + …`.
fn parse_pattern(pattern: &str) -> (Vec<String>, Vec<f64>) {
    let mut literals = Vec::new();
    let mut numbers = Vec::new();
    let mut literal = String::new();

    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let mut j = i;
        if bytes[j] == b'-' || bytes[j] == b'+' {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'.' {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
        }
        let has_digits = j > digits_start && pattern[digits_start..j].bytes().any(|b| b.is_ascii_digit());
        if has_digits {
            if let Ok(number) = pattern[start..j].parse::<f64>() {
                literals.push(std::mem::take(&mut literal));
                numbers.push(number);
                i = j;
                continue;
            }
        }
        literal.push(pattern[i..].chars().next().unwrap_or('\u{fffd}'));
        i += pattern[i..].chars().next().map_or(1, char::len_utf8);
    }
    literals.push(literal);

    (literals, numbers)
}

/// Format a scalar the way pattern outputs expect: integral values print
/// without a decimal point.
fn format_number(value: f64) -> String {
    format!("{value}")
}
