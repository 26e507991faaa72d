//! DAS (dataset attribute structure) parsing and grid mapping extraction.
//!
//! ```text
//! Attributes {
//!     projection_stere {
//!         String grid_mapping_name "polar_stereographic";
//!         Float64 straight_vertical_longitude_from_pole 70.0;
//!         Float64 latitude_of_projection_origin 90.0;
//!         Float64 standard_parallel 60.0;
//!         Float64 false_easting 3192800.0;
//!         Float64 false_northing 1784000.0;
//!     }
//! }
//! ```

use projection::{
    CellSize, Ellipsoid, GridExtent, PolarStereographic, ProjectedPoint, ProjectionDefinition,
    ProjectionKind,
};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ParseError, ParseResult};

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(Vec<f64>),
    Text(String),
}

impl AttributeValue {
    /// First number, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(values) => values.first().copied(),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            AttributeValue::Number(_) => None,
        }
    }
}

/// Attributes grouped by container (variable name or `NC_GLOBAL`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    containers: HashMap<String, HashMap<String, AttributeValue>>,
}

impl AttributeTable {
    pub fn container(&self, name: &str) -> Option<&HashMap<String, AttributeValue>> {
        self.containers.get(name)
    }

    pub fn get(&self, container: &str, attribute: &str) -> Option<&AttributeValue> {
        self.containers.get(container)?.get(attribute)
    }

    /// Container names, sorted.
    pub fn containers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.containers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// First container whose `grid_mapping_name` is set.
    pub fn grid_mapping_container(&self) -> Option<&str> {
        self.containers()
            .into_iter()
            .find(|name| self.get(name, "grid_mapping_name").is_some())
    }

    fn number(&self, container: &str, attribute: &str) -> ParseResult<Option<f64>> {
        match self.get(container, attribute) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                ParseError::InvalidMetadata(format!(
                    "{}:{} is not numeric",
                    container, attribute
                ))
            }),
        }
    }

    fn required(&self, container: &str, attribute: &str) -> ParseResult<f64> {
        self.number(container, attribute)?
            .ok_or_else(|| ParseError::MissingAttribute(format!("{}:{}", container, attribute)))
    }
}

/// Parse a DAS listing.
///
/// String values may span several lines until the closing quote.
/// Attribute lines that cannot be read are skipped; only the attributes a
/// caller asks for are enforced.
pub fn parse_das(text: &str) -> ParseResult<AttributeTable> {
    let mut table = AttributeTable::default();
    let mut stack: Vec<String> = Vec::new();
    // Attribute whose string value is still open: (first line, text so far)
    let mut pending: Option<(usize, String)> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;

        if let Some((start, mut buffer)) = pending.take() {
            buffer.push('\n');
            buffer.push_str(raw.trim_end());
            if has_open_quote(&buffer) {
                pending = Some((start, buffer));
            } else {
                table.insert_line(&stack, &buffer, start)?;
            }
            continue;
        }

        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if has_open_quote(line) {
            pending = Some((line_no, line.to_string()));
            continue;
        }

        if let Some(head) = line.strip_suffix('{') {
            let name = head.trim();
            if !(stack.is_empty() && name == "Attributes") {
                table.containers.entry(name.to_string()).or_default();
            }
            stack.push(name.to_string());
            continue;
        }

        if line == "}" {
            if stack.pop().is_none() {
                return Err(ParseError::InvalidMetadata(format!(
                    "unbalanced '}}' on line {}",
                    line_no
                )));
            }
            continue;
        }

        table.insert_line(&stack, line, line_no)?;
    }

    if let Some((start, _)) = pending {
        return Err(ParseError::InvalidMetadata(format!(
            "unterminated string starting on line {}",
            start
        )));
    }
    if !stack.is_empty() {
        return Err(ParseError::InvalidMetadata(format!(
            "unclosed container '{}'",
            stack.join(".")
        )));
    }
    Ok(table)
}

impl AttributeTable {
    /// Store one complete `Type name value;` statement under the innermost container.
    fn insert_line(&mut self, stack: &[String], line: &str, line_no: usize) -> ParseResult<()> {
        let Some(body) = line.strip_suffix(';') else {
            debug!(line = line_no, "Skipping unrecognised DAS line");
            return Ok(());
        };
        let container = match stack.last() {
            Some(c) if stack.len() > 1 => c.clone(),
            _ => {
                return Err(ParseError::InvalidMetadata(format!(
                    "attribute outside a container on line {}",
                    line_no
                )))
            }
        };
        match attribute(body) {
            Some((name, value)) => {
                self.containers
                    .entry(container)
                    .or_default()
                    .insert(name.to_string(), value);
            }
            None => debug!(line = line_no, container = %container, "Skipping unreadable attribute"),
        }
        Ok(())
    }
}

/// Whether `text` has an odd number of unescaped double quotes.
fn has_open_quote(text: &str) -> bool {
    let mut open = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => open = !open,
            _ => {}
        }
        escaped = false;
    }
    open
}

/// `Type name value[, value...]`
fn attribute(body: &str) -> Option<(&str, AttributeValue)> {
    let (dtype, rest) = body.trim().split_once(char::is_whitespace)?;
    let (name, value) = rest.trim().split_once(char::is_whitespace)?;
    let value = value.trim();

    let parsed = if dtype == "String" || dtype == "Url" {
        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        AttributeValue::Text(unquoted.replace("\\\"", "\""))
    } else {
        let numbers = value
            .split(',')
            .map(|t| t.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        AttributeValue::Number(numbers)
    };
    Some((name, parsed))
}

/// Origin, cell size and extent of a grid from its projected X/Y axes.
///
/// Axes are cell-centre coordinates in projected meters and must be
/// increasing with (near) uniform spacing.
pub fn grid_geometry(
    x: &[Option<f64>],
    y: &[Option<f64>],
) -> ParseResult<(ProjectedPoint, CellSize, GridExtent)> {
    let dx = uniform_spacing("X", x)?;
    let dy = uniform_spacing("Y", y)?;
    let (Some(Some(x0)), Some(Some(y0))) = (x.first(), y.first()) else {
        return Err(ParseError::MissingAttribute("grid axes".to_string()));
    };

    Ok((
        ProjectedPoint::new(*y0, *x0),
        CellSize { dx, dy },
        GridExtent::new(y.len(), x.len()),
    ))
}

fn uniform_spacing(axis: &str, values: &[Option<f64>]) -> ParseResult<f64> {
    let present: Vec<f64> = values.iter().copied().collect::<Option<Vec<_>>>().ok_or_else(|| {
        ParseError::InvalidMetadata(format!("axis {} has missing coordinates", axis))
    })?;

    match present.as_slice() {
        [] => Err(ParseError::MissingAttribute(format!("axis {}", axis))),
        [_] => Err(ParseError::InvalidMetadata(format!(
            "axis {} needs at least two coordinates",
            axis
        ))),
        [first, .., last] => {
            let step = (last - first) / (present.len() - 1) as f64;
            if !(step.is_finite() && step > 0.0) {
                return Err(ParseError::InvalidMetadata(format!(
                    "axis {} is not increasing",
                    axis
                )));
            }
            let irregular = present
                .windows(2)
                .any(|w| ((w[1] - w[0]) - step).abs() > step * 1e-3);
            if irregular {
                return Err(ParseError::InvalidMetadata(format!(
                    "axis {} is not evenly spaced",
                    axis
                )));
            }
            Ok(step)
        }
    }
}

/// Build the grid projection from a CF `polar_stereographic` container.
///
/// The ellipsoid comes from `semi_major_axis` with `inverse_flattening` or
/// `semi_minor_axis`, or from `earth_radius`; WGS84 otherwise.
pub fn projection_from_attributes(
    table: &AttributeTable,
    container: &str,
    origin: ProjectedPoint,
    cell_size: CellSize,
    extent: GridExtent,
) -> ParseResult<ProjectionDefinition> {
    let mapping = table
        .get(container, "grid_mapping_name")
        .and_then(AttributeValue::as_str)
        .ok_or_else(|| {
            ParseError::MissingAttribute(format!("{}:grid_mapping_name", container))
        })?;
    if mapping != "polar_stereographic" {
        return Err(ParseError::InvalidMetadata(format!(
            "unsupported grid mapping '{}'",
            mapping
        )));
    }

    let central_meridian = table.required(container, "straight_vertical_longitude_from_pole")?;
    let lat_origin = table.required(container, "latitude_of_projection_origin")?;
    let false_easting = table.required(container, "false_easting")?;
    let false_northing = table.required(container, "false_northing")?;
    let standard_parallel = table.number(container, "standard_parallel")?;
    let scale_factor = table
        .number(container, "scale_factor_at_projection_origin")?
        .unwrap_or(1.0);

    let ellipsoid = match (
        table.number(container, "semi_major_axis")?,
        table.number(container, "inverse_flattening")?,
        table.number(container, "semi_minor_axis")?,
        table.number(container, "earth_radius")?,
    ) {
        (Some(a), Some(rf), _, _) => Ellipsoid {
            semi_major_axis: a,
            inverse_flattening: rf,
        },
        (Some(a), None, Some(b), _) => Ellipsoid::from_axes(a, b),
        (Some(a), None, None, _) => Ellipsoid::sphere(a),
        (None, _, _, Some(r)) => Ellipsoid::sphere(r),
        _ => Ellipsoid::wgs84(),
    };

    let stereo = PolarStereographic::new(
        ellipsoid,
        lat_origin,
        central_meridian,
        standard_parallel,
        scale_factor,
        false_easting,
        false_northing,
    )
    .map_err(|e| ParseError::InvalidMetadata(e.to_string()))?;

    ProjectionDefinition::new(
        ProjectionKind::PolarStereographic(stereo),
        origin,
        cell_size,
        extent,
    )
    .map_err(|e| ParseError::InvalidMetadata(e.to_string()))
}
