//! URL construction: weekly period file names and OPeNDAP queries.

use grid_common::Period;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SourceError, SourceResult};

/// A file-name pattern containing period placeholders.
///
/// Supported placeholders: `{year}`, `{week}` (no padding) and `{week:02}`
/// (two digits), e.g. `lice_{year}_{week:02}.nc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Year,
    Week,
    PaddedWeek,
}

impl PeriodTemplate {
    pub fn new(pattern: impl Into<String>) -> SourceResult<Self> {
        let pattern = pattern.into();
        let segments = tokenize(&pattern)?;
        if !segments.contains(&Segment::Year)
            || !segments
                .iter()
                .any(|s| matches!(s, Segment::Week | Segment::PaddedWeek))
        {
            return Err(SourceError::Config(format!(
                "period template '{}' needs {{year}} and {{week}}",
                pattern
            )));
        }
        Ok(Self { pattern, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn render(&self, period: Period) -> String {
        let mut out = String::with_capacity(self.pattern.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Year => out.push_str(&period.year.to_string()),
                Segment::Week => out.push_str(&period.week.to_string()),
                Segment::PaddedWeek => out.push_str(&format!("{:02}", period.week)),
            }
        }
        out
    }

    /// Recover the period from a name produced by this template.
    pub fn parse(&self, name: &str) -> Option<Period> {
        let mut rest = name;
        let mut year = None;
        let mut week = None;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rest = rest.strip_prefix(text.as_str())?,
                Segment::Year => {
                    let (digits, tail) = take_digits(rest, 4)?;
                    year = Some(digits.parse::<i32>().ok()?);
                    rest = tail;
                }
                Segment::Week => {
                    let (digits, tail) = take_digits(rest, 2)?;
                    week = Some(digits.parse::<u32>().ok()?);
                    rest = tail;
                }
                Segment::PaddedWeek => {
                    let (digits, tail) = take_digits(rest, 2)?;
                    if digits.len() != 2 {
                        return None;
                    }
                    week = Some(digits.parse::<u32>().ok()?);
                    rest = tail;
                }
            }
        }

        let week = week?;
        if !rest.is_empty() || !(1..=53).contains(&week) {
            return None;
        }
        Some(Period::new(year?, week))
    }
}

impl TryFrom<String> for PeriodTemplate {
    type Error = SourceError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(pattern)
    }
}

impl From<PeriodTemplate> for String {
    fn from(template: PeriodTemplate) -> Self {
        template.pattern
    }
}

fn tokenize(pattern: &str) -> SourceResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let close = rest[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| SourceError::Config(format!("unclosed '{{' in '{}'", pattern)))?;
        segments.push(match &rest[open + 1..close] {
            "year" => Segment::Year,
            "week" => Segment::Week,
            "week:02" => Segment::PaddedWeek,
            other => {
                return Err(SourceError::Config(format!(
                    "unknown placeholder '{{{}}}' in '{}'",
                    other, pattern
                )))
            }
        });
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// Split off up to `max` leading ASCII digits (at least one).
fn take_digits(text: &str, max: usize) -> Option<(&str, &str)> {
    let len = text
        .bytes()
        .take(max)
        .take_while(u8::is_ascii_digit)
        .count();
    (len > 0).then(|| text.split_at(len))
}

/// An OPeNDAP hyperslab selector `[start:stride:stop]`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: usize,
    pub stride: usize,
    pub stop: usize,
}

impl AxisRange {
    /// Every index from `start` to `stop` inclusive.
    pub fn new(start: usize, stop: usize) -> Self {
        Self {
            start,
            stride: 1,
            stop,
        }
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index)
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Number of indices selected.
    pub fn len(&self) -> usize {
        if self.stop < self.start {
            0
        } else {
            (self.stop - self.start) / self.stride.max(1) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{}]", self.start, self.stride, self.stop)
    }
}

/// Builder for `<dataset>.ascii?var[..][..],var2` requests.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiQuery {
    dataset_url: String,
    projections: Vec<(String, Vec<AxisRange>)>,
}

impl AsciiQuery {
    pub fn new(dataset_url: impl Into<String>) -> Self {
        Self {
            dataset_url: dataset_url.into(),
            projections: Vec::new(),
        }
    }

    /// Request a whole variable.
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.projections.push((name.into(), Vec::new()));
        self
    }

    /// Request a hyperslab of a variable, one range per axis in order.
    pub fn hyperslab(mut self, name: impl Into<String>, ranges: &[AxisRange]) -> Self {
        self.projections.push((name.into(), ranges.to_vec()));
        self
    }

    pub fn url(&self) -> String {
        let mut url = format!("{}.ascii", self.dataset_url);
        for (i, (name, ranges)) in self.projections.iter().enumerate() {
            url.push(if i == 0 { '?' } else { ',' });
            url.push_str(name);
            for range in ranges {
                url.push_str(&range.to_string());
            }
        }
        url
    }
}

/// URL of the file for `period` under `base`.
pub fn period_url(base: &str, template: &PeriodTemplate, period: Period) -> String {
    join_url(base, &template.render(period))
}

/// Attribute (DAS) response URL for a dataset.
pub fn das_url(dataset_url: &str) -> String {
    format!("{}.das", dataset_url)
}

/// Join a base URL and a relative path with exactly one slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
