//! Line lexer for OPeNDAP ASCII responses.
//!
//! An ASCII response is a DDS block (type declarations), a dashed
//! separator, then one block per variable:
//!
//! ```text
//! Dataset {
//!     Int16 salinity[time = 3][depth = 2][Y = 2][X = 3];
//! } norkyst.nc;
//! ---------------------------------------------
//! salinity.salinity[3][2][2][3]
//! [0][0][0], -32767, 5085, 5090
//! [0][0][1], 5101, 5102, 5103
//! ...
//!
//! salinity.time[3]
//! 1.7040672E9, 1.7041536E9, 1.70424E9
//! ```
//!
//! Each line is classified on its own, without lookahead or backtracking;
//! the parser drives a state machine over the resulting tokens.

/// Type names that start a DDS declaration.
const DAP_TYPES: &[&str] = &[
    "Byte", "Int8", "UInt8", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64", "Float32",
    "Float64", "String", "Url",
];

/// One axis of a DDS declaration: `[time = 3]` or `[3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisDecl<'a> {
    pub name: Option<&'a str>,
    pub len: &'a str,
}

/// A classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    Blank,
    /// Dashed line between the DDS and the data section
    Separator,
    /// `Int16 salinity[time = 3][X = 4];`
    Declaration {
        dtype: &'a str,
        name: &'a str,
        axes: Vec<AxisDecl<'a>>,
    },
    /// `salinity.salinity[3][2][2][3]`
    ArrayHeader { path: &'a str, dims: Vec<&'a str> },
    /// `[0][1][0], 5101, 5102, 5103`
    Row {
        index: Vec<&'a str>,
        values: &'a str,
    },
    /// Anything else (structure keywords, bare value lists)
    Text(&'a str),
}

/// Iterator over `(line_number, Line)` pairs, 1-based.
pub struct Lexer<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (usize, Line<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.lines.next()?;
        self.line_no += 1;
        Some((self.line_no, classify(raw)))
    }
}

/// Classify a single line.
pub fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();

    if line.is_empty() {
        return Line::Blank;
    }

    if line.len() >= 3 && line.bytes().all(|b| b == b'-') {
        return Line::Separator;
    }

    if line.starts_with('[') {
        if let Some((_, index, rest)) = split_brackets(line) {
            let rest = rest.trim_start();
            if let Some(values) = rest.strip_prefix(',') {
                return Line::Row {
                    index,
                    values: values.trim(),
                };
            }
        }
        return Line::Text(line);
    }

    if let Some(body) = line.strip_suffix(';') {
        if let Some(decl) = declaration(body) {
            return decl;
        }
    }

    if let Some((path, dims, rest)) = split_brackets(line) {
        let path = path.trim();
        if rest.trim().is_empty()
            && !dims.is_empty()
            && !path.is_empty()
            && !path.contains(char::is_whitespace)
        {
            return Line::ArrayHeader { path, dims };
        }
    }

    Line::Text(line)
}

fn declaration(body: &str) -> Option<Line<'_>> {
    let (dtype, rest) = body.split_once(char::is_whitespace)?;
    if !DAP_TYPES.contains(&dtype) {
        return None;
    }
    let (name, groups, tail) = match split_brackets(rest) {
        Some(parts) => parts,
        None => (rest, Vec::new(), ""),
    };
    if !tail.trim().is_empty() {
        return None;
    }

    let axes = groups
        .into_iter()
        .map(|group| match group.split_once('=') {
            Some((axis, len)) => AxisDecl {
                name: Some(axis.trim()),
                len: len.trim(),
            },
            None => AxisDecl {
                name: None,
                len: group.trim(),
            },
        })
        .collect();

    Some(Line::Declaration {
        dtype,
        name: name.trim(),
        axes,
    })
}

/// Split `prefix[a][b]rest` into `(prefix, [a, b], rest)`.
///
/// Only consecutive bracket groups are collected; `None` if there is no
/// `[` or a group is not closed.
fn split_brackets(s: &str) -> Option<(&str, Vec<&str>, &str)> {
    let open = s.find('[')?;
    let prefix = &s[..open];
    let mut groups = Vec::new();
    let mut rest = &s[open..];

    while let Some(inner) = rest.strip_prefix('[') {
        let close = inner.find(']')?;
        groups.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    Some((prefix, groups, rest))
}
