//! Parameter grid for grid search optimization.
//!
//! A grid is the Cartesian product of one axis per parameter, in declaration
//! order with the first parameter outermost. Nothing is materialised: a
//! combination is decoded from its index on demand, so memory stays bounded
//! by one batch regardless of how large the product is.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::types::{ParamValue, ParameterSet};

/// Absorbs float noise in `(max - min) / step` so `(0.1, 0.5, 0.1)` has 4 values.
const RANGE_EPSILON: f64 = 1e-9;

/// Largest number of values one range axis may produce.
const MAX_AXIS_LEN: f64 = u32::MAX as f64;

/// Largest magnitude at which range bounds are treated as exact integers.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Errors from building a parameter grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A parameter specification cannot produce any values.
    #[error("Invalid specification for parameter '{name}': {reason}")]
    InvalidSpecification {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The same parameter was declared twice.
    #[error("Parameter '{name}' declared more than once")]
    DuplicateParameter {
        /// Parameter name.
        name: String,
    },

    /// The product of all axes does not fit in `usize`.
    #[error("Parameter grid has too many combinations to enumerate")]
    TooManyCombinations,

    /// Batches must hold at least one combination.
    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,
}

impl GridError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// How one parameter's values are specified.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    /// Explicit finite list of values.
    Discrete(Vec<ParamValue>),
    /// Half-open numeric range `[min, max)` advancing by `step`.
    Range {
        /// First value.
        min: f64,
        /// Exclusive bound.
        max: f64,
        /// Increment; negative when counting down.
        step: f64,
    },
    /// A single fixed value.
    Scalar(ParamValue),
}

impl ParamSpec {
    /// Build a range from a `[min, max, step]` tuple.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` unless `bounds` has exactly three elements.
    pub fn from_tuple(name: &str, bounds: &[f64]) -> Result<Self, GridError> {
        match *bounds {
            [min, max, step] => Ok(Self::Range { min, max, step }),
            _ => Err(GridError::invalid(
                name,
                format!("range must be [min, max, step], got {} values", bounds.len()),
            )),
        }
    }
}

/// Serialized shape of a [`ParamSpec`]: a scalar, a list, or `{range: [min, max, step]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawParamSpec {
    Scalar(ParamValue),
    Discrete(Vec<ParamValue>),
    Range { range: Vec<f64> },
}

impl RawParamSpec {
    fn into_spec(self, name: &str) -> Result<ParamSpec, GridError> {
        match self {
            Self::Scalar(value) => Ok(ParamSpec::Scalar(value)),
            Self::Discrete(values) => Ok(ParamSpec::Discrete(values)),
            Self::Range { range } => ParamSpec::from_tuple(name, &range),
        }
    }
}

/// Parameter specifications in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpecs(Vec<(String, ParamSpec)>);

impl ParameterSpecs {
    /// Wrap ordered `(name, spec)` pairs.
    #[must_use]
    pub const fn new(specs: Vec<(String, ParamSpec)>) -> Self {
        Self(specs)
    }

    /// Iterate specifications in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no parameters are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ParameterSpecs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecsVisitor;

        impl<'de> Visitor<'de> for SpecsVisitor {
            type Value = ParameterSpecs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to value specifications")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut specs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, raw)) = map.next_entry::<String, RawParamSpec>()? {
                    let spec = raw.into_spec(&name).map_err(de::Error::custom)?;
                    specs.push((name, spec));
                }
                Ok(ParameterSpecs(specs))
            }
        }

        deserializer.deserialize_map(SpecsVisitor)
    }
}

/// Values of one axis, decoded by position.
#[derive(Debug, Clone, PartialEq)]
enum AxisValues {
    List(Vec<ParamValue>),
    IntRange { min: i64, step: i64, len: usize },
    FloatRange { min: f64, step: f64, len: usize },
}

impl AxisValues {
    fn len(&self) -> usize {
        match self {
            Self::List(values) => values.len(),
            Self::IntRange { len, .. } | Self::FloatRange { len, .. } => *len,
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    fn value_at(&self, position: usize) -> ParamValue {
        match self {
            Self::List(values) => values[position],
            Self::IntRange { min, step, .. } => ParamValue::Int(min + step * position as i64),
            Self::FloatRange { min, step, .. } => {
                ParamValue::Float((position as f64).mul_add(*step, *min))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Axis {
    name: String,
    values: AxisValues,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn range_axis(name: &str, min: f64, max: f64, step: f64) -> Result<AxisValues, GridError> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(GridError::invalid(name, "range bounds must be finite"));
    }
    if step == 0.0 {
        return Err(GridError::invalid(name, "range step must be non-zero"));
    }

    let steps = ((max - min) / step - RANGE_EPSILON).ceil();
    if steps < 1.0 {
        return Err(GridError::invalid(
            name,
            format!("range [{min}, {max}) with step {step} yields no values"),
        ));
    }
    if steps > MAX_AXIS_LEN {
        return Err(GridError::invalid(name, "range yields too many values"));
    }
    let len = steps as usize;

    let is_int = |v: f64| v.fract() == 0.0 && v.abs() < MAX_EXACT_INT;
    if is_int(min) && is_int(max) && is_int(step) {
        Ok(AxisValues::IntRange {
            min: min as i64,
            step: step as i64,
            len,
        })
    } else {
        Ok(AxisValues::FloatRange { min, step, len })
    }
}

fn axis_values(name: &str, spec: &ParamSpec) -> Result<AxisValues, GridError> {
    let check_finite = |value: &ParamValue| match value {
        ParamValue::Float(v) if !v.is_finite() => {
            Err(GridError::invalid(name, "values must be finite"))
        }
        _ => Ok(()),
    };

    match spec {
        ParamSpec::Discrete(values) => {
            if values.is_empty() {
                return Err(GridError::invalid(name, "value list is empty"));
            }
            values.iter().try_for_each(check_finite)?;
            Ok(AxisValues::List(values.clone()))
        }
        ParamSpec::Scalar(value) => {
            check_finite(value)?;
            Ok(AxisValues::List(vec![*value]))
        }
        ParamSpec::Range { min, max, step } => range_axis(name, *min, *max, *step),
    }
}

/// A validated parameter grid for grid search optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<Axis>,
    total: usize,
}

impl ParameterGrid {
    /// Create a new parameter grid builder.
    #[must_use]
    pub fn builder() -> ParameterGridBuilder {
        ParameterGridBuilder::new()
    }

    /// Validate specifications and build the grid.
    ///
    /// An empty specification yields a grid with one empty parameter set.
    ///
    /// # Errors
    ///
    /// Returns an error if any axis is empty or malformed, a name repeats, or
    /// the product overflows.
    pub fn from_specs<'a>(
        specs: impl IntoIterator<Item = (&'a str, &'a ParamSpec)>,
    ) -> Result<Self, GridError> {
        let mut axes: Vec<Axis> = Vec::new();
        let mut total: usize = 1;

        for (name, spec) in specs {
            if axes.iter().any(|axis| axis.name == name) {
                return Err(GridError::DuplicateParameter {
                    name: name.to_string(),
                });
            }
            let values = axis_values(name, spec)?;
            total = total
                .checked_mul(values.len())
                .ok_or(GridError::TooManyCombinations)?;
            axes.push(Axis {
                name: name.to_string(),
                values,
            });
        }

        Ok(Self { axes, total })
    }

    /// Build the grid from deserialized specifications.
    ///
    /// # Errors
    ///
    /// See [`ParameterGrid::from_specs`].
    pub fn from_parameter_specs(specs: &ParameterSpecs) -> Result<Self, GridError> {
        Self::from_specs(specs.iter())
    }

    /// Get the total number of parameter combinations.
    #[must_use]
    pub const fn total_combinations(&self) -> usize {
        self.total
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.name.as_str())
    }

    /// Decode the combination at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<ParameterSet> {
        if index >= self.total {
            return None;
        }

        let mut remainder = index;
        let mut entries = vec![(String::new(), ParamValue::Bool(false)); self.axes.len()];
        for (slot, axis) in entries.iter_mut().zip(&self.axes).rev() {
            let len = axis.values.len();
            *slot = (axis.name.clone(), axis.values.value_at(remainder % len));
            remainder /= len;
        }
        Some(ParameterSet::new(entries))
    }

    /// Lazily enumerate every combination in grid order.
    #[must_use]
    pub const fn iter(&self) -> GridIter<'_> {
        GridIter {
            grid: self,
            next: 0,
        }
    }

    /// Lazily enumerate combinations in batches of at most `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns `ZeroBatchSize` when `batch_size` is 0.
    pub const fn batches(&self, batch_size: usize) -> Result<Batches<'_>, GridError> {
        if batch_size == 0 {
            return Err(GridError::ZeroBatchSize);
        }
        Ok(Batches {
            grid: self,
            next: 0,
            batch_size,
        })
    }
}

impl<'a> IntoIterator for &'a ParameterGrid {
    type Item = ParameterSet;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over grid combinations.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: &'a ParameterGrid,
    next: usize,
}

impl Iterator for GridIter<'_> {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<Self::Item> {
        let set = self.grid.get(self.next)?;
        self.next += 1;
        Some(set)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.total.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

/// Iterator over fixed-size batches of grid combinations.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    grid: &'a ParameterGrid,
    next: usize,
    batch_size: usize,
}

impl Iterator for Batches<'_> {
    type Item = Vec<ParameterSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.grid.total {
            return None;
        }
        let end = self.next.saturating_add(self.batch_size).min(self.grid.total);
        let batch = (self.next..end).filter_map(|i| self.grid.get(i)).collect();
        self.next = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.total.saturating_sub(self.next).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// Builder for parameter grids.
#[derive(Debug, Default)]
pub struct ParameterGridBuilder {
    specs: Vec<(String, ParamSpec)>,
}

impl ParameterGridBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add integer parameter values.
    #[must_use]
    pub fn add_int_param(self, name: &str, values: Vec<i64>) -> Self {
        self.add(name, ParamSpec::Discrete(values.into_iter().map(ParamValue::Int).collect()))
    }

    /// Add float parameter values.
    #[must_use]
    pub fn add_float_param(self, name: &str, values: Vec<f64>) -> Self {
        self.add(name, ParamSpec::Discrete(values.into_iter().map(ParamValue::Float).collect()))
    }

    /// Add boolean parameter values.
    #[must_use]
    pub fn add_bool_param(self, name: &str, values: Vec<bool>) -> Self {
        self.add(name, ParamSpec::Discrete(values.into_iter().map(ParamValue::Bool).collect()))
    }

    /// Add a half-open range `[min, max)`.
    #[must_use]
    pub fn add_range(self, name: &str, min: f64, max: f64, step: f64) -> Self {
        self.add(name, ParamSpec::Range { min, max, step })
    }

    /// Add a parameter with an arbitrary specification.
    #[must_use]
    pub fn add(mut self, name: &str, spec: ParamSpec) -> Self {
        self.specs.push((name.to_string(), spec));
        self
    }

    /// Build the parameter grid.
    ///
    /// # Errors
    ///
    /// See [`ParameterGrid::from_specs`].
    pub fn build(self) -> Result<ParameterGrid, GridError> {
        ParameterGrid::from_specs(self.specs.iter().map(|(name, spec)| (name.as_str(), spec)))
    }
}
