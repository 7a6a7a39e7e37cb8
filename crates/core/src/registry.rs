use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::error::{RakeError, Result};
use crate::options::DEFAULT_WEIGHT;

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Running sum of squared errors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SquaredError {
    pub sum: f64,
    pub count: usize,
}

impl SquaredError {
    pub fn add(&mut self, squared: f64) {
        self.sum += squared;
        self.count += 1;
    }

    /// Root mean square; zero when nothing was accumulated.
    pub fn rmse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum / self.count as f64).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionValue {
    pub index: usize,
    pub initial: usize,
    pub goal_sum: f64,
    pub work_sum: f64,
    pub weight: f64,
    pub error: SquaredError,
}

impl DimensionValue {
    fn new(index: usize) -> Self {
        Self {
            index,
            initial: 0,
            goal_sum: 0.0,
            work_sum: 0.0,
            weight: DEFAULT_WEIGHT,
            error: SquaredError::default(),
        }
    }
}

/// One raking dimension, i.e. one configured column.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub column: String,
    pub block_size: usize,
    pub initial: usize,
    pub goal_sum: f64,
    pub work_sum: f64,
    pub error: SquaredError,
    pub(crate) values: FxIndexMap<String, DimensionValue>,
}

impl Dimension {
    fn new(column: String) -> Self {
        Self {
            column,
            block_size: 0,
            initial: 0,
            goal_sum: 0.0,
            work_sum: 0.0,
            error: SquaredError::default(),
            values: FxIndexMap::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn value(&self, value: &str) -> Option<&DimensionValue> {
        self.values.get(value)
    }

    /// Values in ordinal order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &DimensionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ratio of goal to work mass, or `fallback` for a column without work mass.
    pub fn adjustment(&self, fallback: f64) -> f64 {
        if self.work_sum > 0.0 {
            self.goal_sum / self.work_sum
        } else {
            fallback
        }
    }

    fn ordinal(&self, value: &str) -> Result<usize> {
        self.values
            .get_index_of(value)
            .ok_or_else(|| RakeError::UnknownCategoricalValue {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }
}

/// Dimensions in configured column order.
#[derive(Debug, Clone, Default)]
pub struct DimensionRegistry {
    dimensions: Vec<Dimension>,
}

impl DimensionRegistry {
    pub fn new<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self {
            dimensions: columns
                .into_iter()
                .map(|c| Dimension::new(c.clone()))
                .collect(),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub(crate) fn dimensions_mut(&mut self) -> &mut [Dimension] {
        &mut self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Assigns the next ordinal to a value not yet seen in `column`.
    /// Returns the value's ordinal either way.
    pub fn register_value(&mut self, column: usize, value: &str) -> usize {
        let dimension = &mut self.dimensions[column];
        if let Some(index) = dimension.values.get_index_of(value) {
            return index;
        }
        let index = dimension.values.len();
        dimension
            .values
            .insert(value.to_string(), DimensionValue::new(index));
        index
    }

    /// Assigns mixed-radix strides and returns the cube length. Fails when
    /// the product of dimension sizes does not fit a `usize`.
    pub fn compute_block_sizes(&mut self) -> Result<usize> {
        let mut block_size = 1usize;
        for idx in 0..self.dimensions.len() {
            self.dimensions[idx].block_size = block_size;
            block_size = block_size
                .checked_mul(self.dimensions[idx].size())
                .ok_or_else(|| self.too_large())?;
        }
        Ok(block_size)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::size).collect()
    }

    fn too_large(&self) -> RakeError {
        RakeError::CubeTooLarge {
            sizes: self.sizes(),
        }
    }

    pub fn ordinal(&self, column: usize, value: &str) -> Result<usize> {
        self.dimensions[column].ordinal(value)
    }

    /// Cube offset of ordinals aligned with the configured columns.
    pub fn offset(&self, ordinals: &[usize]) -> Result<usize> {
        let mut index = 0usize;
        for (dimension, &ordinal) in self.dimensions.iter().zip(ordinals) {
            index = ordinal
                .checked_mul(dimension.block_size)
                .and_then(|step| index.checked_add(step))
                .ok_or_else(|| self.too_large())?;
        }
        Ok(index)
    }

    /// Cube offset for values aligned with the configured columns.
    pub fn cell_index_aligned<S: AsRef<str>>(&self, values: &[S]) -> Result<usize> {
        let ordinals = self
            .dimensions
            .iter()
            .zip(values)
            .map(|(dimension, value)| dimension.ordinal(value.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.offset(&ordinals)
    }

    pub(crate) fn value_mut(&mut self, column: usize, ordinal: usize) -> Option<&mut DimensionValue> {
        self.dimensions[column]
            .values
            .get_index_mut(ordinal)
            .map(|(_, v)| v)
    }
}
