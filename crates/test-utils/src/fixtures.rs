//! Common test fixtures for the aquaculture grid tests.
//!
//! This module provides canned response bodies and grid definitions that
//! mirror what the upstream services return.

/// A small axis-aligned grid with a linear projection.
///
/// Projected (0, 0) sits at (63.0 N, 8.0 E); one meter northing is 1e-5
/// degrees of latitude, one meter easting 2e-5 degrees of longitude.
pub mod linear_grid {
    pub const ORIGIN_LAT: f64 = 63.0;
    pub const ORIGIN_LON: f64 = 8.0;
    pub const DEG_PER_METER_LAT: f64 = 1e-5;
    pub const DEG_PER_METER_LON: f64 = 2e-5;
    pub const CELL_SIZE: f64 = 1000.0;
    pub const ROWS: usize = 8;
    pub const COLUMNS: usize = 10;

    /// Geographic centre of cell (row, column).
    pub fn cell_center(row: usize, column: usize) -> (f64, f64) {
        (
            ORIGIN_LAT + row as f64 * CELL_SIZE * DEG_PER_METER_LAT,
            ORIGIN_LON + column as f64 * CELL_SIZE * DEG_PER_METER_LON,
        )
    }

    /// Projected X axis (cell centres, meters).
    pub fn x_axis() -> Vec<f64> {
        crate::axis_coordinates(0.0, CELL_SIZE, COLUMNS)
    }

    /// Projected Y axis (cell centres, meters).
    pub fn y_axis() -> Vec<f64> {
        crate::axis_coordinates(0.0, CELL_SIZE, ROWS)
    }
}

/// Fish farm sites used across tests.
pub mod sites {
    /// (id, name, lat, lon) inside the linear grid, at cell (3, 4)
    pub const FJORD_SITE: (u32, &str, f64, f64) = (12345, "Testfjorden", 63.03, 8.08);

    /// (id, name, lat, lon) on the Helgeland coast
    pub const HELGELAND_SITE: (u32, &str, f64, f64) = (31961, "Hestøya", 65.84, 12.21);
}

/// DAS listing with a NorKyst-800 style polar stereographic grid mapping.
pub const NORKYST_DAS: &str = r#"Attributes {
    time {
        String units "seconds since 1970-01-01 00:00:00";
        String standard_name "time";
    }
    X {
        String units "meter";
        String standard_name "projection_x_coordinate";
    }
    Y {
        String units "meter";
        String standard_name "projection_y_coordinate";
    }
    salinity {
        String units "1e-3";
        Int16 _FillValue -32767;
        Float64 scale_factor 0.001;
        Float64 add_offset 30.0;
        String grid_mapping "projection_stere";
    }
    projection_stere {
        String grid_mapping_name "polar_stereographic";
        Float64 straight_vertical_longitude_from_pole 70.0;
        Float64 latitude_of_projection_origin 90.0;
        Float64 standard_parallel 60.0;
        Float64 false_easting 3192800.0;
        Float64 false_northing 1784000.0;
        String proj4 "+proj=stere +ellps=WGS84 +lat_0=90.0 +lat_ts=60.0 +x_0=3192800 +y_0=1784000 +lon_0=70";
    }
    NC_GLOBAL {
        String title "NorKyst-800 m ocean model";
        String institution "Norwegian Meteorological Institute";
    }
}
"#;

/// THREDDS catalog listing weekly lice pressure files, deliberately unsorted.
pub const LICE_CATALOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.0.1">
  <service name="all" serviceType="Compound" base="">
    <service name="odap" serviceType="OPENDAP" base="/thredds/dodsC/" />
    <service name="http" serviceType="HTTPServer" base="/thredds/fileServer/" />
  </service>
  <dataset name="Lice infectious pressure" ID="lice">
    <metadata inherited="true">
      <serviceName>all</serviceName>
    </metadata>
    <dataset name="lice_2024_09.nc" ID="lice/lice_2024_09.nc" urlPath="lice/lice_2024_09.nc">
      <dataSize units="Kbytes">512.0</dataSize>
      <date type="modified">2024-03-04T06:00:00Z</date>
    </dataset>
    <dataset name="lice_2024_10.nc" ID="lice/lice_2024_10.nc" urlPath="lice/lice_2024_10.nc">
      <dataSize units="Kbytes">512.0</dataSize>
      <date type="modified">2024-03-11T06:00:00Z</date>
    </dataset>
    <dataset name="lice_2023_52.nc" ID="lice/lice_2023_52.nc" urlPath="lice/lice_2023_52.nc">
      <dataSize units="Kbytes">498.0</dataSize>
      <date type="modified">2024-01-01T06:00:00Z</date>
    </dataset>
    <dataset name="lice_2024_08.nc" ID="lice/lice_2024_08.nc" urlPath="lice/lice_2024_08.nc">
      <dataSize units="Kbytes">510.0</dataSize>
      <date type="modified">2024-02-26T06:00:00Z</date>
    </dataset>
    <dataset name="readme.txt" ID="lice/readme.txt" urlPath="lice/readme.txt" />
    <catalogRef xlink:href="archive/catalog.xml" xlink:title="archive" name="" />
  </dataset>
</catalog>
"#;

/// Address search response with one match.
pub const MUNICIPALITY_JSON: &str = r#"{
  "metadata": {
    "viserFra": 0,
    "viserTil": 1,
    "totaltAntallTreff": 1,
    "sokeStreng": "lat=65.84&lon=12.21&radius=1000"
  },
  "adresser": [
    {
      "adressetekst": "Hestøyveien 12",
      "kommunenummer": "1820",
      "kommunenavn": "ALSTAHAUG",
      "representasjonspunkt": { "epsg": "EPSG:4258", "lat": 65.8402, "lon": 12.2113 },
      "meterDistanseTilPunkt": 214.5
    }
  ]
}"#;

/// Address search response with no match.
pub const MUNICIPALITY_EMPTY_JSON: &str = r#"{
  "metadata": { "viserFra": 0, "viserTil": 0, "totaltAntallTreff": 0 },
  "adresser": []
}"#;

/// Compact location forecast, first time step carrying the instant details.
pub const WEATHER_JSON: &str = r#"{
  "type": "Feature",
  "geometry": { "type": "Point", "coordinates": [12.21, 65.84, 4] },
  "properties": {
    "meta": {
      "updated_at": "2024-03-11T11:27:36Z",
      "units": { "air_temperature": "celsius", "relative_humidity": "%" }
    },
    "timeseries": [
      {
        "time": "2024-03-11T12:00:00Z",
        "data": {
          "instant": {
            "details": {
              "air_pressure_at_sea_level": 1003.4,
              "air_temperature": 4.2,
              "relative_humidity": 81.5,
              "wind_from_direction": 221.3,
              "wind_speed": 6.1
            }
          },
          "next_1_hours": { "summary": { "symbol_code": "cloudy" } }
        }
      },
      {
        "time": "2024-03-11T13:00:00Z",
        "data": {
          "instant": {
            "details": { "air_temperature": 4.6, "relative_humidity": 79.0 }
          }
        }
      }
    ]
  }
}"#;
