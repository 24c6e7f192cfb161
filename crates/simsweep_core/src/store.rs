//! Results store: one entry per grid point, keyed by grid coordinates.
//!
//! Entries live in a dense row-major grid shaped like the parameter grid,
//! so reading along the innermost dimension always returns values in
//! sweep order regardless of insertion order.

use serde::{Deserialize, Serialize};

use crate::executor::FailureReason;
use crate::grid::{Dimension, GridIndices, Parameter, ParameterTuple, ParameterValue};
use crate::metrics::MetricSample;

/// Dense storage for one value per grid point, laid out in the same order
/// the parameter grid enumerates its points.
#[derive(Debug, Clone)]
pub struct SweepGrid<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Clone> SweepGrid<T> {
    /// Create a new grid with the given shape, filled with `default`
    pub fn new(shape: Vec<usize>, default: T) -> Self {
        let total_size: usize = shape.iter().product();
        let strides = compute_strides(&shape);
        Self {
            data: vec![default; total_size],
            shape,
            strides,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert multi-dimensional indices to a flat index
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if idx >= size {
                return None;
            }
            flat += idx * self.strides[i];
        }
        Some(flat)
    }

    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.data[i])
    }

    /// Set the value at the given indices; `false` when out of range
    pub fn set(&mut self, indices: &[usize], value: T) -> bool {
        if let Some(i) = self.flat_index(indices) {
            self.data[i] = value;
            true
        } else {
            false
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Every index of the grid, in sweep order
    pub fn indices(&self) -> GridIndices {
        GridIndices::new(self.shape.clone())
    }
}

/// Element stride of each axis; the innermost axis is contiguous
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides: Vec<usize> = shape
        .iter()
        .rev()
        .scan(1, |span, &size| {
            let stride = *span;
            *span *= size;
            Some(stride)
        })
        .collect();
    strides.reverse();
    strides
}

/// Whether a grid point produced a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PointStatus {
    Succeeded,
    Failed { reason: FailureReason },
}

/// Stored result for one grid point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointResult {
    pub metrics: MetricSample,
    #[serde(flatten)]
    pub status: PointStatus,
}

impl PointResult {
    #[must_use]
    pub fn succeeded(metrics: MetricSample) -> Self {
        Self {
            metrics,
            status: PointStatus::Succeeded,
        }
    }

    /// Failed point holding the fallback sample
    #[must_use]
    pub fn failed(reason: FailureReason) -> Self {
        Self {
            metrics: MetricSample::fallback(),
            status: PointStatus::Failed { reason },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PointStatus::Succeeded
    }
}

/// Accumulated results of a sweep
#[derive(Debug, Clone)]
pub struct ResultsStore {
    dimensions: Vec<Dimension>,
    entries: SweepGrid<Option<PointResult>>,
}

impl ResultsStore {
    /// Empty store shaped like the given dimensions
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        let shape = dimensions.iter().map(Dimension::len).collect();
        Self {
            dimensions,
            entries: SweepGrid::new(shape, None),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Insert the result for a grid point; a repeated key overwrites.
    /// Returns `false` if the point does not belong to this grid.
    pub fn insert(&mut self, point: &ParameterTuple, result: PointResult) -> bool {
        let previous = self.entries.get(&point.index).copied().flatten();
        let stored = self.entries.set(&point.index, Some(result));
        if stored && previous.is_some() {
            tracing::debug!(point = %point, "overwriting existing result");
        }
        stored
    }

    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&PointResult> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Number of grid points with a recorded result
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.data().iter().filter(|e| e.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of points in the grid, recorded or not
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Every grid point has a result
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.data().iter().all(Option::is_some)
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.entries
            .data()
            .iter()
            .flatten()
            .filter(|r| r.is_success())
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries
            .data()
            .iter()
            .flatten()
            .filter(|r| !r.is_success())
            .count()
    }

    /// Recorded entries in sweep order
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &PointResult)> {
        self.entries
            .indices()
            .zip(self.entries.data())
            .filter_map(|(index, entry)| entry.as_ref().map(|r| (index, r)))
    }

    /// Entries along one dimension with every other dimension fixed.
    ///
    /// `fixed` has one slot per dimension; the slot for `dim` is ignored.
    /// Missing entries are skipped, so the result stays in sweep order.
    #[must_use]
    pub fn series_along(
        &self,
        dim: usize,
        fixed: &[usize],
    ) -> Option<Vec<(&ParameterValue, &PointResult)>> {
        if dim >= self.dimensions.len() || fixed.len() != self.dimensions.len() {
            return None;
        }
        let mut index = fixed.to_vec();
        let mut series = Vec::with_capacity(self.dimensions[dim].len());
        for (i, value) in self.dimensions[dim].values.iter().enumerate() {
            index[dim] = i;
            if let Some(result) = self.get(&index) {
                series.push((value, result));
            }
        }
        Some(series)
    }

    /// Ordered `(inner value, result)` pairs for fixed outer-dimension indices
    #[must_use]
    pub fn series(&self, outer: &[usize]) -> Option<Vec<(&ParameterValue, &PointResult)>> {
        let inner = self.dimensions.len().checked_sub(1)?;
        if outer.len() != inner {
            return None;
        }
        let mut fixed = outer.to_vec();
        fixed.push(0);
        self.series_along(inner, &fixed)
    }

    /// Coordinates for a grid index
    #[must_use]
    pub fn coordinates(&self, index: &[usize]) -> Option<Vec<Parameter>> {
        if index.len() != self.dimensions.len() {
            return None;
        }
        self.dimensions
            .iter()
            .zip(index)
            .map(|(dim, &i)| dim.values.get(i).map(|v| Parameter::new(dim.name.clone(), v.clone())))
            .collect()
    }

    /// Serializable view of the store
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            dimensions: self.dimensions.clone(),
            entries: self
                .iter()
                .filter_map(|(index, result)| {
                    self.coordinates(&index).map(|coordinates| StoredEntry {
                        coordinates,
                        result: *result,
                    })
                })
                .collect(),
        }
    }

    /// Rebuild a store from a snapshot; entries whose coordinates are not on
    /// the grid are dropped
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new(snapshot.dimensions);
        for entry in snapshot.entries {
            let index: Option<Vec<usize>> = store
                .dimensions
                .iter()
                .zip(&entry.coordinates)
                .map(|(dim, coord)| dim.values.iter().position(|v| *v == coord.value))
                .collect();
            match index {
                Some(index) if index.len() == store.dimensions.len() => {
                    store.entries.set(&index, Some(entry.result));
                }
                _ => tracing::warn!(?entry.coordinates, "snapshot entry is not on the grid"),
            }
        }
        store
    }
}

/// One recorded grid point in a [`StoreSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub coordinates: Vec<Parameter>,
    #[serde(flatten)]
    pub result: PointResult,
}

/// Serialized form of a [`ResultsStore`] (`results.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub dimensions: Vec<Dimension>,
    pub entries: Vec<StoredEntry>,
}
