//! Test data generators for synthetic OPeNDAP responses.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Dashed line between the DDS and the data section.
pub const SEPARATOR: &str = "---------------------------------------------";

/// Builds an ASCII response body: DDS block, separator, data blocks.
///
/// # Example
///
/// ```
/// use test_utils::AsciiResponse;
///
/// let body = AsciiResponse::new("norkyst.nc")
///     .grid("salinity", "Int16", &[("Y", 1), ("X", 2)], &[5085.0, 5090.0])
///     .axis("X", &[0.0, 800.0])
///     .render();
/// assert!(body.contains("salinity.salinity[1][2]"));
/// assert!(body.contains("[0], 5085, 5090"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AsciiResponse {
    dataset: String,
    declarations: Vec<String>,
    blocks: Vec<String>,
    include_dds: bool,
}

impl AsciiResponse {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            include_dds: true,
            ..Default::default()
        }
    }

    /// Omit the DDS block and separator (data section only).
    pub fn without_dds(mut self) -> Self {
        self.include_dds = false;
        self
    }

    /// Add a gridded variable with named axes, values in row-major order.
    ///
    /// # Panics
    ///
    /// If `values.len()` does not match the product of the axis lengths.
    pub fn grid(mut self, name: &str, dtype: &str, axes: &[(&str, usize)], values: &[f64]) -> Self {
        let shape: Vec<usize> = axes.iter().map(|(_, len)| *len).collect();
        assert_eq!(
            values.len(),
            shape.iter().product::<usize>(),
            "value count does not match shape for {}",
            name
        );

        self.declarations.push(format!(
            "    {} {}{};",
            dtype,
            name,
            axes.iter()
                .map(|(axis, len)| format!("[{} = {}]", axis, len))
                .collect::<String>()
        ));

        let mut block = format!(
            "{}.{}{}\n",
            name,
            name,
            shape.iter().map(|d| format!("[{}]", d)).collect::<String>()
        );
        if shape.len() == 1 {
            block.push_str(&join_values(values));
            block.push('\n');
        } else {
            let outer = &shape[..shape.len() - 1];
            for (row, chunk) in values.chunks(shape[shape.len() - 1]).enumerate() {
                let index = row_index(row, outer);
                block.push_str(&format!(
                    "{}, {}\n",
                    index.iter().map(|i| format!("[{}]", i)).collect::<String>(),
                    join_values(chunk)
                ));
            }
        }
        self.blocks.push(block);
        self
    }

    /// Add a 1-D coordinate variable named after its own axis.
    pub fn axis(mut self, name: &str, values: &[f64]) -> Self {
        self.declarations.push(format!(
            "    Float64 {}[{} = {}];",
            name,
            name,
            values.len()
        ));
        self.blocks
            .push(format!("{}[{}]\n{}\n", name, values.len(), join_values(values)));
        self
    }

    /// Append raw text to the data section.
    pub fn raw_block(mut self, text: &str) -> Self {
        self.blocks.push(text.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.include_dds {
            out.push_str("Dataset {\n");
            for decl in &self.declarations {
                out.push_str(decl);
                out.push('\n');
            }
            out.push_str(&format!("}} {};\n", self.dataset));
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out.push_str(&self.blocks.join("\n"));
        out
    }
}

/// Multi-index of the `row`-th row for the given outer shape (row-major).
pub fn row_index(row: usize, outer_shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; outer_shape.len()];
    let mut rest = row;
    for (i, len) in outer_shape.iter().enumerate().rev() {
        index[i] = rest % len;
        rest /= len;
    }
    index
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw values for a grid where each cell encodes its own index.
///
/// Cell `(a, b, c, d)` holds `a * 1000 + b * 100 + c * 10 + d` (for up to
/// 4 axes of length < 10), making order checks trivial.
pub fn index_encoded_values(shape: &[usize]) -> Vec<f64> {
    let len: usize = shape.iter().product();
    (0..len)
        .map(|flat| {
            let mut rest = flat;
            let mut value = 0.0;
            let mut weight = 1.0;
            for dim in shape.iter().rev() {
                value += (rest % dim) as f64 * weight;
                rest /= dim;
                weight *= 10.0;
            }
            value
        })
        .collect()
}

/// Evenly spaced axis coordinates starting at `start`.
pub fn axis_coordinates(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

/// The 3 (time) x 2 (depth) x 2 (Y) x 3 (X) raw salinity grid.
///
/// Cell `[0][0][0][0]` carries the Int16 fill value; of its radius-1
/// neighbours at the same time and depth only `[0][0][0][1]` (raw `5085`)
/// is valid. Every other cell is `5100 + flat index`.
pub fn salinity_scenario_values() -> Vec<f64> {
    let mut values: Vec<f64> = (0..36).map(|i| 5100.0 + i as f64).collect();
    values[0] = -32767.0; // [0][0][0][0]
    values[1] = 5085.0; // [0][0][0][1]
    values[3] = -32767.0; // [0][0][1][0]
    values[4] = -32767.0; // [0][0][1][1]
    values
}

/// Shape of [`salinity_scenario_values`].
pub const SALINITY_SCENARIO_SHAPE: [(&str, usize); 4] =
    [("time", 3), ("depth", 2), ("Y", 2), ("X", 3)];

/// ASCII body for the salinity scenario, with time and depth axes.
pub fn salinity_scenario_response() -> String {
    AsciiResponse::new("norkyst_scenario.nc")
        .grid(
            "salinity",
            "Int16",
            &SALINITY_SCENARIO_SHAPE,
            &salinity_scenario_values(),
        )
        .axis("time", &[1_704_067_200.0, 1_704_153_600.0, 1_704_240_000.0])
        .axis("depth", &[0.0, 10.0])
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_index() {
        assert_eq!(row_index(0, &[3, 2, 2]), vec![0, 0, 0]);
        assert_eq!(row_index(1, &[3, 2, 2]), vec![0, 0, 1]);
        assert_eq!(row_index(2, &[3, 2, 2]), vec![0, 1, 0]);
        assert_eq!(row_index(11, &[3, 2, 2]), vec![2, 1, 1]);
        assert_eq!(row_index(0, &[]), Vec::<usize>::new());
    }

    #[test]
    fn test_index_encoded_values() {
        let values = index_encoded_values(&[2, 3]);
        assert_eq!(values, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_render_layout() {
        let body = AsciiResponse::new("t.nc")
            .grid("v", "Int16", &[("Y", 2), ("X", 2)], &[1.0, 2.0, 3.0, 4.0])
            .render();
        let expected = format!(
            "Dataset {{\n    Int16 v[Y = 2][X = 2];\n}} t.nc;\n{}\nv.v[2][2]\n[0], 1, 2\n[1], 3, 4\n",
            SEPARATOR
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn test_salinity_scenario_shape() {
        assert_eq!(salinity_scenario_values().len(), 36);
    }
}
