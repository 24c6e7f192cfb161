//! Parameter grid: sweep dimensions and their deterministic enumeration.
//!
//! Dimensions are declared outermost first. Enumeration is row-major: the
//! last dimension varies fastest, so consecutive grid points walk the
//! innermost axis in declaration order. Enumeration is a pure function of
//! the grid and can be repeated any number of times.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single simulator parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value, used for chart axes
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Int(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

/// A named parameter as passed to the simulator (`--name=value`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// One swept dimension and its ordered values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub values: Vec<ParameterValue>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Integer range with an exclusive end, like `range(start, end, step)`.
    /// Negative steps count down.
    pub fn range(
        name: impl Into<String>,
        start: i64,
        end: i64,
        step: i64,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if step == 0 {
            return Err(ConfigError::ZeroStep(name));
        }
        let mut values = Vec::new();
        let mut current = start;
        while (step > 0 && current < end) || (step < 0 && current > end) {
            values.push(ParameterValue::Int(current));
            match current.checked_add(step) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(Self { name, values })
    }

    /// Powers of ten `10^k` for `k` from `start` to `end` inclusive
    pub fn log10(
        name: impl Into<String>,
        start: i32,
        end: i32,
        step: i32,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if step <= 0 {
            return Err(ConfigError::ZeroStep(name));
        }
        let values = (start..=end)
            .step_by(step as usize)
            .map(|k| ParameterValue::Float(pow10(k)))
            .collect();
        Ok(Self { name, values })
    }

    /// Number of values along this dimension
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// 1.0 / 10^k rounds to the nearest f64, so 10^-4 prints as 0.0001
fn pow10(k: i32) -> f64 {
    if k >= 0 {
        10f64.powi(k)
    } else {
        1.0 / 10f64.powi(-k)
    }
}

/// The parameters in effect for one simulator invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTuple {
    /// Position of this point along each dimension
    pub index: Vec<usize>,
    /// Swept values, one per dimension, outermost first
    pub coordinates: Vec<Parameter>,
    /// Settings passed on every invocation of the sweep
    pub fixed: Vec<Parameter>,
}

impl ParameterTuple {
    /// Look up a value by parameter name (swept or fixed)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// All parameters in invocation order: swept values, then fixed settings
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.coordinates.iter().chain(self.fixed.iter())
    }
}

impl fmt::Display for ParameterTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.coordinates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        Ok(())
    }
}

/// Declared sweep dimensions plus the fixed settings shared by every point
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    dimensions: Vec<Dimension>,
    fixed: Vec<Parameter>,
    positions: FxHashMap<String, usize>,
}

impl ParameterGrid {
    pub fn new(dimensions: Vec<Dimension>, fixed: Vec<Parameter>) -> Self {
        let mut positions = FxHashMap::default();
        for (i, dim) in dimensions.iter().enumerate() {
            positions.entry(dim.name.clone()).or_insert(i);
        }
        Self {
            dimensions,
            fixed,
            positions,
        }
    }

    /// Check the grid before enumeration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions.is_empty() {
            return Err(ConfigError::NoDimensions);
        }
        let mut seen = FxHashSet::default();
        for name in self
            .dimensions
            .iter()
            .map(|d| &d.name)
            .chain(self.fixed.iter().map(|p| &p.name))
        {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateParameter(name.clone()));
            }
        }
        if let Some(empty) = self.dimensions.iter().find(|d| d.is_empty()) {
            return Err(ConfigError::EmptyDimension(empty.name.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    #[must_use]
    pub fn fixed(&self) -> &[Parameter] {
        &self.fixed
    }

    /// Position of a named dimension, outermost = 0
    #[must_use]
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Size of each dimension
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::len).collect()
    }

    /// Number of grid points (zero for an invalid grid)
    #[must_use]
    pub fn total_points(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        self.dimensions.iter().map(Dimension::len).product()
    }

    /// Build the tuple at the given per-dimension indices
    #[must_use]
    pub fn tuple_at(&self, index: &[usize]) -> Option<ParameterTuple> {
        if index.len() != self.dimensions.len() {
            return None;
        }
        let coordinates = self
            .dimensions
            .iter()
            .zip(index)
            .map(|(dim, &i)| {
                dim.values.get(i).map(|value| Parameter {
                    name: dim.name.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(ParameterTuple {
            index: index.to_vec(),
            coordinates,
            fixed: self.fixed.clone(),
        })
    }

    /// Enumerate every grid point in row-major order.
    ///
    /// An invalid grid yields nothing and logs a warning; callers that need
    /// to distinguish the two should call [`ParameterGrid::validate`] first.
    pub fn points(&self) -> GridPoints<'_> {
        let indices = match self.validate() {
            Ok(()) => GridIndices::new(self.shape()),
            Err(err) => {
                tracing::warn!(error = %err, "invalid parameter grid, enumerating no points");
                GridIndices::exhausted()
            }
        };
        GridPoints {
            grid: self,
            indices,
        }
    }
}

/// Iterator over the tuples of a [`ParameterGrid`]
pub struct GridPoints<'a> {
    grid: &'a ParameterGrid,
    indices: GridIndices,
}

impl Iterator for GridPoints<'_> {
    type Item = ParameterTuple;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        self.grid.tuple_at(&index)
    }
}

/// Row-major odometer over a shape; the last dimension varies fastest
#[derive(Debug, Clone)]
pub struct GridIndices {
    shape: Vec<usize>,
    current: Vec<usize>,
    done: bool,
}

impl GridIndices {
    pub fn new(shape: Vec<usize>) -> Self {
        let done = shape.contains(&0);
        Self {
            current: vec![0; shape.len()],
            shape,
            done,
        }
    }

    fn exhausted() -> Self {
        Self {
            shape: Vec::new(),
            current: Vec::new(),
            done: true,
        }
    }
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current.clone();

        if self.shape.is_empty() {
            self.done = true;
            return Some(result);
        }

        for i in (0..self.shape.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.shape[i] {
                break;
            }
            self.current[i] = 0;
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<ParameterValue> {
        values.iter().copied().map(ParameterValue::Int).collect()
    }

    #[test]
    fn test_range_matches_exclusive_end() {
        let dim = Dimension::range("CcaSensitivity", -82, -61, 2).unwrap();
        assert_eq!(dim.len(), 11);
        assert_eq!(dim.values.first(), Some(&ParameterValue::Int(-82)));
        assert_eq!(dim.values.last(), Some(&ParameterValue::Int(-62)));
    }

    #[test]
    fn test_range_counts_down() {
        let dim = Dimension::range("x", 3, 0, -1).unwrap();
        assert_eq!(dim.values, ints(&[3, 2, 1]));
    }

    #[test]
    fn test_range_stops_at_integer_limits() {
        let up = Dimension::range("x", i64::MAX - 2, i64::MAX, 3).unwrap();
        assert_eq!(up.values, ints(&[i64::MAX - 2]));

        let down = Dimension::range("x", i64::MIN + 1, i64::MIN, -3).unwrap();
        assert_eq!(down.values, ints(&[i64::MIN + 1]));
    }

    #[test]
    fn test_range_zero_step() {
        assert!(matches!(
            Dimension::range("x", 0, 5, 0),
            Err(ConfigError::ZeroStep(_))
        ));
    }

    #[test]
    fn test_log10_values() {
        let dim = Dimension::log10("trafficArrivalRate", -4, -1, 1).unwrap();
        let values: Vec<f64> = dim.values.iter().filter_map(ParameterValue::as_f64).collect();
        assert_eq!(values, vec![0.0001, 0.001, 0.01, 0.1]);
        assert_eq!(dim.values[0].to_string(), "0.0001");
    }

    #[test]
    fn test_point_count_is_product_of_sizes() {
        let grid = ParameterGrid::new(
            vec![
                Dimension::new("a", ints(&[1, 2, 3])),
                Dimension::new("b", ints(&[1, 2])),
                Dimension::new("c", ints(&[1, 2, 3, 4])),
            ],
            vec![],
        );
        assert_eq!(grid.total_points(), 24);
        assert_eq!(grid.points().count(), 24);
    }

    #[test]
    fn test_points_are_unique_and_stable() {
        let grid = ParameterGrid::new(
            vec![
                Dimension::new("a", ints(&[2, 3])),
                Dimension::new("b", ints(&[-80, -78, -76])),
            ],
            vec![Parameter::new("duration", 10)],
        );
        let first: Vec<_> = grid.points().collect();
        let second: Vec<_> = grid.points().collect();
        assert_eq!(first, second);

        let mut indices: Vec<_> = first.iter().map(|p| p.index.clone()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), first.len());
    }

    #[test]
    fn test_outer_dimension_iterates_slowest() {
        let grid = ParameterGrid::new(
            vec![
                Dimension::new("outer", ints(&[1, 2])),
                Dimension::new("inner", ints(&[10, 20])),
            ],
            vec![],
        );
        let rendered: Vec<String> = grid.points().map(|p| p.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "outer=1, inner=10",
                "outer=1, inner=20",
                "outer=2, inner=10",
                "outer=2, inner=20",
            ]
        );
    }

    #[test]
    fn test_empty_dimension_yields_no_points() {
        let grid = ParameterGrid::new(
            vec![
                Dimension::new("a", ints(&[1, 2])),
                Dimension::new("b", vec![]),
            ],
            vec![],
        );
        assert!(matches!(
            grid.validate(),
            Err(ConfigError::EmptyDimension(name)) if name == "b"
        ));
        assert_eq!(grid.points().count(), 0);
        assert_eq!(grid.total_points(), 0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let grid = ParameterGrid::new(
            vec![Dimension::new("apNodes", ints(&[1]))],
            vec![Parameter::new("apNodes", 4)],
        );
        assert!(matches!(
            grid.validate(),
            Err(ConfigError::DuplicateParameter(_))
        ));
    }

    #[test]
    fn test_tuple_carries_fixed_settings() {
        let grid = ParameterGrid::new(
            vec![Dimension::new("apNodes", ints(&[2]))],
            vec![Parameter::new("phyMode", "OfdmRate54Mbps")],
        );
        let point = grid.points().next().unwrap();
        assert_eq!(point.get("apNodes"), Some(&ParameterValue::Int(2)));
        assert_eq!(
            point.get("phyMode"),
            Some(&ParameterValue::Text("OfdmRate54Mbps".into()))
        );
        assert_eq!(point.parameters().count(), 2);
        assert_eq!(grid.dimension_index("apNodes"), Some(0));
    }
}
