//! Fixed-shape N-dimensional arrays with explicit missing cells.
//!
//! Values are stored flat in row-major order (last axis varies fastest),
//! which is the order the ASCII dump format lists them in. A cell is
//! either `Some(value)` or `None`; a missing observation is never stored
//! as zero.

use crate::error::{GridError, GridResult};

/// Highest rank supported (time, depth, row, column).
pub const MAX_RANK: usize = 4;

/// Immutable N-dimensional array (rank 1 to 4).
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<Option<T>>,
}

impl<T: Copy> NdArray<T> {
    /// Build an array from row-major cells.
    ///
    /// Fails if the rank is outside `1..=MAX_RANK`, any axis is empty, or
    /// the number of cells differs from the product of the shape.
    pub fn from_flat(shape: Vec<usize>, data: Vec<Option<T>>) -> GridResult<Self> {
        if shape.is_empty() || shape.len() > MAX_RANK {
            return Err(GridError::DimensionMismatch(format!(
                "rank {} not supported (1..={})",
                shape.len(),
                MAX_RANK
            )));
        }
        if shape.iter().any(|&len| len == 0) {
            return Err(GridError::DimensionMismatch(format!(
                "empty axis in shape {:?}",
                shape
            )));
        }

        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(GridError::DimensionMismatch(format!(
                "shape {:?} needs {} cells, got {}",
                shape,
                expected,
                data.len()
            )));
        }

        let mut strides = vec![1; shape.len()];
        for axis in (0..shape.len() - 1).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }

        Ok(Self {
            shape,
            strides,
            data,
        })
    }

    /// Build an array where every cell is present.
    pub fn from_values(shape: Vec<usize>, values: Vec<T>) -> GridResult<Self> {
        Self::from_flat(shape, values.into_iter().map(Some).collect())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of cells, missing or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `index` addresses a cell of this array.
    pub fn contains_index(&self, index: &[usize]) -> bool {
        index.len() == self.shape.len() && index.iter().zip(&self.shape).all(|(i, len)| i < len)
    }

    /// Flat offset of a full coordinate tuple.
    ///
    /// # Panics
    /// If the tuple has the wrong rank or any coordinate is out of range.
    /// Callers derive coordinates from the array's own shape, so a bad
    /// coordinate is a bug rather than a data problem.
    pub fn flat_index(&self, index: &[usize]) -> usize {
        assert!(
            self.contains_index(index),
            "index {:?} out of bounds for shape {:?}",
            index,
            self.shape
        );
        index.iter().zip(&self.strides).map(|(i, s)| i * s).sum()
    }

    /// Value at a full coordinate tuple, `None` if the cell is missing.
    ///
    /// # Panics
    /// See [`NdArray::flat_index`].
    pub fn get(&self, index: &[usize]) -> Option<T> {
        self.data[self.flat_index(index)]
    }

    /// Whether the cell at `index` is missing.
    pub fn is_missing(&self, index: &[usize]) -> bool {
        self.get(index).is_none()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Option<T>] {
        &self.data
    }

    /// Present values in row-major order.
    pub fn present_values(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().filter_map(|v| *v)
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_none()).count()
    }

    /// Transform every present value, keeping missing cells missing.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> NdArray<U> {
        NdArray {
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            data: self.data.iter().map(|v| v.map(&f)).collect(),
        }
    }
}
