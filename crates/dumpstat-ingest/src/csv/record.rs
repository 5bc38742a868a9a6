//! Header-mapped records

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Column whose line breaks are folded into spaces before delivery
pub const DESCRIPTION_COLUMN: &str = "description";

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("static pattern"));

/// Column names of a dump, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }
}

/// One data row zipped with the header.
///
/// Values are raw strings; numeric and boolean interpretation is left to the
/// consumer through the lenient accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    header: Arc<Header>,
    values: Vec<String>,
}

impl Record {
    /// Zip `fields` with `header`: missing trailing fields become empty,
    /// surplus fields are dropped.
    pub fn from_fields(header: Arc<Header>, mut fields: Vec<String>) -> Self {
        fields.resize(header.len(), String::new());

        if let Some(i) = header.position(DESCRIPTION_COLUMN) {
            if fields[i].contains(['\r', '\n']) {
                fields[i] = LINE_BREAKS.replace_all(&fields[i], " ").into_owned();
            }
        }

        Self {
            header,
            values: fields,
        }
    }

    /// Raw value of `column`, `None` when the header has no such column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .position(column)
            .map(|i| self.values[i].as_str())
    }

    /// Raw value of `column`, empty when absent
    pub fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Lenient numeric value: anything unparsable or non-finite is 0
    pub fn number(&self, column: &str) -> f64 {
        self.field(column)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0)
    }

    /// Lenient boolean value: `t` / `true` in any case, everything else is false
    pub fn flag(&self, column: &str) -> bool {
        let raw = self.field(column).trim();
        raw.eq_ignore_ascii_case("t") || raw.eq_ignore_ascii_case("true")
    }

    /// Column/value pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}
