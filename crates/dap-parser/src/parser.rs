//! State machine over lexed lines.
//!
//! For each requested variable the parser moves through three states:
//!
//! ```text
//! SeekHeader ──header line──► ReadRows ──blank / next header / EOF──► Done
//! ```
//!
//! Rows are appended strictly in text order. The bracketed row prefixes
//! are validated as integers but never used to reorder values.

use grid_common::{NdArray, MAX_RANK};
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::{GridDataset, Variable};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Line};
use crate::policy::VariableSpec;

/// A variable as declared in the DDS block.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub dtype: String,
    /// (axis name, length) pairs
    pub axes: Vec<(String, usize)>,
}

enum State<'s> {
    SeekHeader,
    ReadRows(RowCollector<'s>),
}

/// Accumulates raw scalars for one variable.
struct RowCollector<'s> {
    spec: &'s VariableSpec,
    shape: Vec<usize>,
    expected: usize,
    raw: Vec<f64>,
}

impl<'s> RowCollector<'s> {
    fn new(spec: &'s VariableSpec, shape: Vec<usize>) -> Self {
        let expected = shape.iter().product();
        Self {
            spec,
            shape,
            expected,
            raw: Vec::with_capacity(expected),
        }
    }

    fn push_line(&mut self, line_no: usize, line: Line<'_>) -> ParseResult<()> {
        let rank = self.shape.len();
        match line {
            Line::Row { index, values } if rank >= 2 => {
                if index.len() != rank - 1 || index.iter().any(|i| i.parse::<usize>().is_err()) {
                    return Err(ParseError::malformed_row(&self.spec.name, line_no));
                }
                // Each row holds exactly one run of the last axis
                if values.split(',').count() != self.shape[rank - 1] {
                    return Err(ParseError::malformed_row(&self.spec.name, line_no));
                }
                self.push_tokens(line_no, values)
            }
            Line::Text(values) if rank == 1 => self.push_tokens(line_no, values),
            _ => Err(ParseError::malformed_row(&self.spec.name, line_no)),
        }
    }

    fn push_tokens(&mut self, line_no: usize, values: &str) -> ParseResult<()> {
        for token in values.split(',') {
            let token = token.trim();
            let value = token
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidToken {
                    variable: self.spec.name.clone(),
                    line: line_no,
                    token: token.to_string(),
                })?;
            self.raw.push(value);
        }
        if self.raw.len() > self.expected {
            return Err(ParseError::CountMismatch {
                variable: self.spec.name.clone(),
                expected: self.expected,
                found: self.raw.len(),
            });
        }
        Ok(())
    }

    fn finish(self) -> ParseResult<NdArray<f64>> {
        if self.raw.len() != self.expected {
            return Err(ParseError::CountMismatch {
                variable: self.spec.name.clone(),
                expected: self.expected,
                found: self.raw.len(),
            });
        }
        let cells = self.raw.into_iter().map(|v| self.spec.decode(v)).collect();
        NdArray::from_flat(self.shape, cells)
            .map_err(|e| ParseError::InvalidMetadata(e.to_string()))
    }
}

/// Whether a header path names `variable` (`v`, `v.v` or `grid.v`).
fn header_matches(path: &str, variable: &str) -> bool {
    path == variable || path.rsplit('.').next() == Some(variable)
}

fn parse_dims(variable: &str, dims: &[&str]) -> ParseResult<Vec<usize>> {
    if dims.is_empty() || dims.len() > MAX_RANK {
        return Err(ParseError::UnsupportedRank {
            variable: variable.to_string(),
            rank: dims.len(),
        });
    }
    dims.iter()
        .map(|token| match token.trim().parse::<usize>() {
            Ok(len) if len > 0 => Ok(len),
            _ => Err(ParseError::InvalidDimension {
                variable: variable.to_string(),
                token: token.to_string(),
            }),
        })
        .collect()
}

/// Parse one variable out of a full response body.
///
/// All-or-nothing: any structural or numeric problem fails the variable.
pub fn parse_variable(text: &str, spec: &VariableSpec) -> ParseResult<NdArray<f64>> {
    let mut lexer = Lexer::new(text);
    let mut state = State::SeekHeader;

    loop {
        let next = lexer.next();
        state = match (state, next) {
            (State::SeekHeader, None) => {
                return Err(ParseError::missing_header(&spec.name));
            }
            (State::SeekHeader, Some((_, Line::ArrayHeader { path, dims })))
                if header_matches(path, &spec.name) =>
            {
                let shape = parse_dims(&spec.name, &dims)?;
                State::ReadRows(RowCollector::new(spec, shape))
            }
            (State::SeekHeader, Some(_)) => State::SeekHeader,
            (State::ReadRows(collector), None)
            | (State::ReadRows(collector), Some((_, Line::Blank)))
            | (State::ReadRows(collector), Some((_, Line::ArrayHeader { .. }))) => {
                return collector.finish();
            }
            (State::ReadRows(mut collector), Some((line_no, line))) => {
                collector.push_line(line_no, line)?;
                State::ReadRows(collector)
            }
        };
    }
}

/// Read the DDS declarations preceding the data separator.
///
/// Returns an empty list when the response has no DDS block.
pub fn parse_declarations(text: &str) -> ParseResult<Vec<Declaration>> {
    let mut declarations = Vec::new();

    for (_, line) in Lexer::new(text) {
        match line {
            Line::Separator => return Ok(declarations),
            Line::Declaration { dtype, name, axes } => {
                let axes = axes
                    .iter()
                    .enumerate()
                    .map(|(i, axis)| -> ParseResult<(String, usize)> {
                        let len = axis.len.parse::<usize>().map_err(|_| {
                            ParseError::InvalidDimension {
                                variable: name.to_string(),
                                token: axis.len.to_string(),
                            }
                        })?;
                        let axis_name = axis
                            .name
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("{}#{}", name, i));
                        Ok((axis_name, len))
                    })
                    .collect::<ParseResult<Vec<_>>>()?;
                declarations.push(Declaration {
                    name: name.to_string(),
                    dtype: dtype.to_string(),
                    axes,
                });
            }
            Line::ArrayHeader { .. } | Line::Row { .. } => break,
            _ => {}
        }
    }

    // No separator: there was no DDS block, only data
    Ok(Vec::new())
}

/// Check that every axis has one length across all declarations.
fn check_declared_axes(declarations: &[Declaration]) -> ParseResult<()> {
    let mut seen: HashMap<&str, (usize, &str)> = HashMap::new();
    for decl in declarations {
        for (axis, len) in &decl.axes {
            match seen.get(axis.as_str()) {
                Some(&(expected, first)) if expected != *len => {
                    return Err(ParseError::AxisMismatch {
                        axis: axis.clone(),
                        expected,
                        found: *len,
                        first: first.to_string(),
                        second: decl.name.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(axis.as_str(), (*len, decl.name.as_str()));
                }
            }
        }
    }
    Ok(())
}

/// Axis names for a parsed variable: DDS first, then `VariableSpec::axes`, then anonymous.
fn resolve_axes(
    spec: &VariableSpec,
    declarations: &[Declaration],
    shape: &[usize],
) -> ParseResult<Vec<String>> {
    if let Some(decl) = declarations.iter().find(|d| d.name == spec.name) {
        let declared: Vec<usize> = decl.axes.iter().map(|(_, len)| *len).collect();
        if declared != shape {
            return Err(ParseError::CountMismatch {
                variable: spec.name.clone(),
                expected: declared.iter().product(),
                found: shape.iter().product(),
            });
        }
        return Ok(decl.axes.iter().map(|(name, _)| name.clone()).collect());
    }

    if !spec.axes.is_empty() {
        if spec.axes.len() != shape.len() {
            return Err(ParseError::UnsupportedRank {
                variable: spec.name.clone(),
                rank: shape.len(),
            });
        }
        return Ok(spec.axes.clone());
    }

    Ok((0..shape.len())
        .map(|i| format!("{}#{}", spec.name, i))
        .collect())
}

/// Parse several variables from one response into a dataset.
///
/// Fails as a whole if any variable fails or axis lengths disagree.
pub fn parse_dataset(text: &str, specs: &[VariableSpec]) -> ParseResult<GridDataset> {
    let declarations = parse_declarations(text)?;
    check_declared_axes(&declarations)?;

    let mut variables = Vec::with_capacity(specs.len());
    for spec in specs {
        let array = parse_variable(text, spec)?;
        let axes = resolve_axes(spec, &declarations, array.shape())?;
        debug!(
            variable = %spec.name,
            shape = ?array.shape(),
            missing = array.missing_count(),
            "Parsed variable"
        );
        variables.push(Variable {
            name: spec.name.clone(),
            axes,
            array,
        });
    }

    GridDataset::new(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
Dataset {
    Int16 temperature[time = 2][X = 3];
    Float64 time[time = 2];
} small.nc;
---------------------------------------------
temperature.temperature[2][3]
[0], 100, 200, -32767
[1], 300, 400, 500

time[2]
10.0, 20.0
";

    fn temp_spec() -> VariableSpec {
        VariableSpec::new("temperature").with_sentinel(crate::policy::SentinelPolicy::Equals {
            value: -32767.0,
        })
    }

    #[test]
    fn test_parse_2d_variable() {
        let array = parse_variable(SMALL, &temp_spec()).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array.get(&[0, 1]), Some(200.0));
        assert_eq!(array.get(&[0, 2]), None);
        assert_eq!(array.get(&[1, 2]), Some(500.0));
    }

    #[test]
    fn test_parse_1d_variable() {
        let array = parse_variable(SMALL, &VariableSpec::new("time")).unwrap();
        assert_eq!(array.shape(), &[2]);
        assert_eq!(array.get(&[1]), Some(20.0));
    }

    #[test]
    fn test_missing_header() {
        let err = parse_variable(SMALL, &VariableSpec::new("salinity")).unwrap_err();
        assert_eq!(err, ParseError::MissingHeader("salinity".to_string()));
    }

    #[test]
    fn test_declarations() {
        let decls = parse_declarations(SMALL).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "temperature");
        assert_eq!(
            decls[0].axes,
            vec![("time".to_string(), 2), ("X".to_string(), 3)]
        );
    }

    #[test]
    fn test_dataset_uses_declared_axes() {
        let ds = parse_dataset(SMALL, &[temp_spec(), VariableSpec::new("time")]).unwrap();
        assert_eq!(ds.get("temperature").unwrap().axes, vec!["time", "X"]);
        assert_eq!(ds.axis_len("time"), Some(2));
    }

    #[test]
    fn test_header_matching() {
        assert!(header_matches("salinity.salinity", "salinity"));
        assert!(header_matches("salinity.time", "time"));
        assert!(header_matches("time", "time"));
        assert!(!header_matches("salinity_max", "salinity"));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let text = "salinity[0]\n\n";
        let err = parse_variable(text, &VariableSpec::new("salinity")).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDimension { .. }));
    }
}
