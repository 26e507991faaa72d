//! Integration tests for ASCII response parsing.

use dap_parser::{
    grid_geometry, parse_das, parse_dataset, parse_variable, projection_from_attributes,
    ParseError, SentinelPolicy, VariableSpec,
};
use projection::{MapProjection, PolarStereographic, ProjectionKind};
use test_utils::{
    index_encoded_values, salinity_scenario_response, AsciiResponse, NORKYST_DAS,
    SALINITY_SCENARIO_SHAPE,
};

fn raw(name: &str) -> VariableSpec {
    VariableSpec::new(name)
}

// ============================================================================
// Shape and order
// ============================================================================

#[test]
fn test_shape_equals_declared_dimensions() {
    let values = index_encoded_values(&[3, 2, 2, 3]);
    let body = AsciiResponse::new("t.nc")
        .grid("salinity", "Int16", &SALINITY_SCENARIO_SHAPE, &values)
        .render();

    let array = parse_variable(&body, &raw("salinity")).unwrap();
    assert_eq!(array.shape(), &[3, 2, 2, 3]);
    assert_eq!(array.len(), 36);
    assert_eq!(array.missing_count(), 0);
}

#[test]
fn test_order_preservation() {
    let values = index_encoded_values(&[3, 2, 2, 3]);
    let body = AsciiResponse::new("t.nc")
        .grid("salinity", "Int16", &SALINITY_SCENARIO_SHAPE, &values)
        .render();

    let array = parse_variable(&body, &raw("salinity")).unwrap();
    for t in 0..3 {
        for d in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    let expected = (t * 1000 + d * 100 + y * 10 + x) as f64;
                    assert_eq!(array.get(&[t, d, y, x]), Some(expected));
                }
            }
        }
    }
}

#[test]
fn test_bracket_indices_do_not_reorder_rows() {
    // Row prefixes are out of order; values are still taken in text order
    let body = "v.v[2][2]\n[1], 3, 4\n[0], 1, 2\n";
    let array = parse_variable(body, &raw("v")).unwrap();
    assert_eq!(array.get(&[0, 0]), Some(3.0));
    assert_eq!(array.get(&[1, 1]), Some(2.0));
}

#[test]
fn test_three_dimensional_variable() {
    let values = index_encoded_values(&[2, 3, 4]);
    let body = AsciiResponse::new("t.nc")
        .grid("u", "Int16", &[("time", 2), ("Y", 3), ("X", 4)], &values)
        .render();
    let array = parse_variable(&body, &raw("u")).unwrap();
    assert_eq!(array.shape(), &[2, 3, 4]);
    assert_eq!(array.get(&[1, 2, 3]), Some(123.0));
}

#[test]
fn test_variable_selected_among_several() {
    let body = AsciiResponse::new("t.nc")
        .grid("u", "Int16", &[("Y", 1), ("X", 2)], &[1.0, 2.0])
        .grid("v", "Int16", &[("Y", 1), ("X", 2)], &[3.0, 4.0])
        .render();
    let array = parse_variable(&body, &raw("v")).unwrap();
    assert_eq!(array.get(&[0, 0]), Some(3.0));
}

// ============================================================================
// Failure cases
// ============================================================================

#[test]
fn test_too_few_values_fails() {
    let body = "v.v[2][3]\n[0], 1, 2, 3\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert_eq!(
        err,
        ParseError::CountMismatch {
            variable: "v".to_string(),
            expected: 6,
            found: 3
        }
    );
}

#[test]
fn test_short_row_fails() {
    let body = "v.v[2][3]\n[0], 1, 2, 3\n[1], 4, 5\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert_eq!(err, ParseError::malformed_row("v", 3));
}

#[test]
fn test_wide_row_fails() {
    let body = "v.v[1][2]\n[0], 1, 2, 3\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert!(matches!(err, ParseError::MalformedRow { line: 2, .. }));
}

#[test]
fn test_uneven_rows_with_matching_total_fail() {
    // Six values in total, but the first row spills into the second
    let body = "v.v[2][3]\n[0], 1, 2, 3, 4\n[1], 5, 6\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert_eq!(err, ParseError::malformed_row("v", 2));
}

#[test]
fn test_extra_row_fails() {
    let body = "v.v[1][2]\n[0], 1, 2\n[1], 3, 4\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert!(matches!(err, ParseError::CountMismatch { expected: 2, found: 4, .. }));
}

#[test]
fn test_bad_token_fails() {
    let body = "v.v[1][3]\n[0], 1, x2, 3\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidToken {
            variable: "v".to_string(),
            line: 2,
            token: "x2".to_string()
        }
    );
}

#[test]
fn test_non_integer_dimension_fails() {
    let body = "v.v[2][two]\n[0], 1, 2\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert!(matches!(err, ParseError::InvalidDimension { ref token, .. } if token == "two"));
}

#[test]
fn test_rank_above_four_fails() {
    let body = "v.v[1][1][1][1][1]\n[0][0][0][0], 1\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedRank { rank: 5, .. }));
}

#[test]
fn test_wrong_row_prefix_fails() {
    let body = "v.v[2][2][2]\n[0], 1, 2\n";
    let err = parse_variable(body, &raw("v")).unwrap_err();
    assert!(matches!(err, ParseError::MalformedRow { line: 2, .. }));
}

#[test]
fn test_missing_header_fails() {
    let body = AsciiResponse::new("t.nc")
        .grid("u", "Int16", &[("Y", 1), ("X", 2)], &[1.0, 2.0])
        .render();
    let err = parse_variable(&body, &raw("salinity")).unwrap_err();
    assert_eq!(err, ParseError::MissingHeader("salinity".to_string()));
}

#[test]
fn test_empty_body_fails() {
    assert!(matches!(
        parse_variable("", &raw("v")),
        Err(ParseError::MissingHeader(_))
    ));
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_salinity_scenario_decoding() {
    let body = salinity_scenario_response();
    let array = parse_variable(&body, &VariableSpec::salinity()).unwrap();

    assert_eq!(array.get(&[0, 0, 0, 0]), None);
    let neighbour = array.get(&[0, 0, 0, 1]).unwrap();
    assert!((neighbour - 35.085).abs() < 1e-9);
    assert_eq!(array.missing_count(), 3);
}

#[test]
fn test_float_fill_is_missing() {
    let body = "ip.ip[1][3]\n[0], 0.5, 9.96921E36, 0.0\n";
    let array = parse_variable(body, &VariableSpec::infectious_pressure("ip")).unwrap();
    assert_eq!(array.get(&[0, 0]), Some(0.5));
    assert_eq!(array.get(&[0, 1]), None);
    // Zero is a value, not missing
    assert_eq!(array.get(&[0, 2]), Some(0.0));
}

#[test]
fn test_spec_from_yaml() {
    let yaml = r#"
name: temperature
scale: 0.01
offset: -10.0
sentinel:
  kind: equals
  value: -32767
axes: [time, depth, Y, X]
"#;
    let spec: VariableSpec = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(spec, VariableSpec::temperature());

    let minimal: VariableSpec = serde_yaml::from_str("name: time").unwrap();
    assert_eq!(minimal.scale, 1.0);
    assert_eq!(minimal.sentinel, SentinelPolicy::None);
}

// ============================================================================
// Datasets
// ============================================================================

#[test]
fn test_scenario_dataset_axes() {
    let body = salinity_scenario_response();
    let ds = parse_dataset(
        &body,
        &[
            VariableSpec::salinity(),
            VariableSpec::axis("time"),
            VariableSpec::axis("depth"),
        ],
    )
    .unwrap();

    assert_eq!(ds.len(), 3);
    assert_eq!(ds.axis_len("time"), Some(3));
    assert_eq!(ds.axis_len("depth"), Some(2));
    assert_eq!(ds.axis_len("Y"), Some(2));
    assert_eq!(ds.axis_len("X"), Some(3));
    assert_eq!(
        ds.axis_values("depth"),
        Some(vec![Some(0.0), Some(10.0)])
    );
}

#[test]
fn test_conflicting_axis_lengths_fail_dataset() {
    let body = AsciiResponse::new("t.nc")
        .grid("salinity", "Int16", &[("time", 2), ("X", 2)], &[1.0, 2.0, 3.0, 4.0])
        .axis("time", &[1.0, 2.0, 3.0])
        .render();
    let err = parse_dataset(&body, &[raw("salinity"), VariableSpec::axis("time")]).unwrap_err();
    assert!(matches!(err, ParseError::AxisMismatch { ref axis, .. } if axis == "time"));
}

#[test]
fn test_one_bad_variable_fails_dataset() {
    let body = AsciiResponse::new("t.nc")
        .grid("u", "Int16", &[("Y", 1), ("X", 2)], &[1.0, 2.0])
        .render();
    let result = parse_dataset(&body, &[raw("u"), raw("v")]);
    assert!(result.is_err());
}

#[test]
fn test_data_only_response_uses_configured_axes() {
    let body = AsciiResponse::new("t.nc")
        .without_dds()
        .grid("u", "Int16", &[("Y", 2), ("X", 2)], &[1.0, 2.0, 3.0, 4.0])
        .render();
    let spec = raw("u").with_axes(["Y", "X"]);
    let ds = parse_dataset(&body, &[spec]).unwrap();
    assert_eq!(ds.get("u").unwrap().axes, vec!["Y", "X"]);

    let anonymous = parse_dataset(&body, &[raw("u")]).unwrap();
    assert_eq!(anonymous.get("u").unwrap().axes, vec!["u#0", "u#1"]);
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_projection_from_das_and_axes() {
    let table = parse_das(NORKYST_DAS).unwrap();
    let container = table.grid_mapping_container().unwrap();
    assert_eq!(container, "projection_stere");

    let x = vec![Some(1_000_000.0), Some(1_000_800.0), Some(1_001_600.0)];
    let y = vec![Some(500_000.0), Some(500_800.0)];
    let (origin, cell, extent) = grid_geometry(&x, &y).unwrap();
    let def = projection_from_attributes(&table, container, origin, cell, extent).unwrap();

    assert_eq!(
        def.kind,
        ProjectionKind::PolarStereographic(PolarStereographic::norkyst800())
    );

    // The centre of cell (1, 2) resolves back to that cell
    let (lat, lon) = def
        .kind
        .inverse(projection::ProjectedPoint::new(500_800.0, 1_001_600.0));
    let index = def.locate(lat, lon).unwrap();
    assert_eq!((index.row, index.column), (1, 2));
}

#[test]
fn test_projection_survives_multi_line_global_attributes() {
    let das = NORKYST_DAS.replacen(
        "Attributes {\n",
        "Attributes {\n    NC_GLOBAL {\n        String history \"2024-01-01 created\nmodified by ncks\";\n        String comment \"commas, and; semicolons\";\n    }\n",
        1,
    );
    let table = parse_das(&das).unwrap();
    assert_eq!(
        table.get("NC_GLOBAL", "history").and_then(|v| v.as_str()),
        Some("2024-01-01 created\nmodified by ncks")
    );

    let container = table.grid_mapping_container().unwrap();
    let x = vec![Some(0.0), Some(800.0)];
    let y = vec![Some(0.0), Some(800.0)];
    let (origin, cell, extent) = grid_geometry(&x, &y).unwrap();
    assert!(projection_from_attributes(&table, container, origin, cell, extent).is_ok());
}
