//! Parsed datasets: named arrays sharing axis extents.

use grid_common::NdArray;
use std::collections::HashMap;

use crate::error::{ParseError, ParseResult};

/// One parsed variable with its axis names.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub axes: Vec<String>,
    pub array: NdArray<f64>,
}

impl Variable {
    /// Length of a named axis, if this variable has it.
    pub fn axis_len(&self, axis: &str) -> Option<usize> {
        self.axes
            .iter()
            .position(|a| a == axis)
            .map(|i| self.array.shape()[i])
    }
}

/// A set of variables from one response.
///
/// Construction checks that every axis name has a single length across
/// all variables; a dataset is never partially valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDataset {
    variables: HashMap<String, Variable>,
    axes: HashMap<String, usize>,
}

impl GridDataset {
    pub fn new(variables: Vec<Variable>) -> ParseResult<Self> {
        let mut axes: HashMap<String, (usize, String)> = HashMap::new();

        for variable in &variables {
            if variable.axes.len() != variable.array.rank() {
                return Err(ParseError::InvalidMetadata(format!(
                    "variable '{}' names {} axes for rank {}",
                    variable.name,
                    variable.axes.len(),
                    variable.array.rank()
                )));
            }
            for (axis, &len) in variable.axes.iter().zip(variable.array.shape()) {
                match axes.get(axis) {
                    Some((expected, first)) if *expected != len => {
                        return Err(ParseError::AxisMismatch {
                            axis: axis.clone(),
                            expected: *expected,
                            found: len,
                            first: first.clone(),
                            second: variable.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        axes.insert(axis.clone(), (len, variable.name.clone()));
                    }
                }
            }
        }

        Ok(Self {
            variables: variables
                .into_iter()
                .map(|v| (v.name.clone(), v))
                .collect(),
            axes: axes.into_iter().map(|(k, (len, _))| (k, len)).collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn array(&self, name: &str) -> Option<&NdArray<f64>> {
        self.variables.get(name).map(|v| &v.array)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Length of a named axis across the dataset.
    pub fn axis_len(&self, axis: &str) -> Option<usize> {
        self.axes.get(axis).copied()
    }

    /// Variable names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Present values of a 1-D variable, `None` if absent or not 1-D.
    pub fn axis_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let array = self.array(name)?;
        (array.rank() == 1).then(|| array.cells().to_vec())
    }
}
