//! THREDDS `catalog.xml` discovery of weekly period files.

use grid_common::Period;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{SourceError, SourceResult};
use crate::urls::PeriodTemplate;

/// One period file listed in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Path relative to the service base, e.g. `lice/lice_2024_09.nc`
    pub url_path: String,
    pub period: Period,
}

/// Parse a catalog and keep the datasets named after `template`,
/// most recent period first.
///
/// Container datasets (no `urlPath`) and files that do not match the
/// template are skipped.
pub fn parse_catalog(xml: &str, template: &PeriodTemplate) -> SourceResult<Vec<CatalogEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"dataset" => {
                if let Some(entry) = dataset_entry(&e, template)? {
                    entries.push(entry);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Catalog(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    entries.sort_by(|a, b| b.period.cmp(&a.period));
    entries.dedup_by(|a, b| a.period == b.period);
    Ok(entries)
}

/// The `count` most recent entries.
pub fn most_recent(entries: &[CatalogEntry], count: usize) -> &[CatalogEntry] {
    &entries[..count.min(entries.len())]
}

fn dataset_entry(
    element: &BytesStart<'_>,
    template: &PeriodTemplate,
) -> SourceResult<Option<CatalogEntry>> {
    let mut name = None;
    let mut url_path = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| SourceError::Catalog(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SourceError::Catalog(e.to_string()))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value),
            b"urlPath" => url_path = Some(value),
            _ => {}
        }
    }

    let (Some(name), Some(url_path)) = (name, url_path) else {
        return Ok(None);
    };
    Ok(template.parse(&name).map(|period| CatalogEntry {
        name,
        url_path,
        period,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_and_empty_datasets() {
        let xml = r#"<catalog>
            <dataset name="root">
                <dataset name="f_2024_01.nc" urlPath="x/f_2024_01.nc"/>
                <dataset name="f_2024_02.nc" urlPath="x/f_2024_02.nc"></dataset>
            </dataset>
        </catalog>"#;
        let template = PeriodTemplate::new("f_{year}_{week:02}.nc").unwrap();
        let entries = parse_catalog(xml, &template).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period, Period::new(2024, 2));
        assert_eq!(entries[1].url_path, "x/f_2024_01.nc");
    }

    #[test]
    fn test_malformed_xml() {
        let template = PeriodTemplate::new("f_{year}_{week}").unwrap();
        assert!(parse_catalog("<catalog><dataset name=\"a\"></catalog>", &template).is_err());
    }

    #[test]
    fn test_most_recent_bounds() {
        let entries = vec![CatalogEntry {
            name: "a".into(),
            url_path: "a".into(),
            period: Period::new(2024, 1),
        }];
        assert_eq!(most_recent(&entries, 5).len(), 1);
        assert!(most_recent(&entries, 0).is_empty());
    }
}
