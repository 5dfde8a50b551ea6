use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Where a record came from: source identifier plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub line: usize,
}

impl Location {
    pub fn new(origin: &str, line: usize) -> Self {
        Self {
            origin: origin.to_string(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.line)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimeBaseError {
    #[error("epoch field '{0}' is not a number")]
    Unparseable(String),
    #[error("epoch day {day} is outside year {year}")]
    DayOutOfRange { year: i32, day: f64 },
    #[error("epoch {computed} disagrees with propagator epoch {propagator}")]
    Inconsistent {
        computed: DateTime<Utc>,
        propagator: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{at}: expected 69 columns, found {found}")]
    LineLength { at: Location, found: usize },
    #[error("{at}: line is not ASCII")]
    NotAscii { at: Location },
    #[error("{at}: expected a line starting with '{expected} '")]
    Marker { at: Location, expected: char },
    #[error("{at}: record ends before line 2")]
    Truncated { at: Location },
    #[error("{at}: checksum {found} does not match computed {computed}")]
    Checksum {
        at: Location,
        found: u32,
        computed: u32,
    },
    #[error("{at}: catalog number '{line1}' on line 1 differs from '{line2}' on line 2")]
    CatalogMismatch {
        at: Location,
        line1: String,
        line2: String,
    },
    #[error("{at}: {message}")]
    Field { at: Location, message: String },
    #[error("{at}: {error}")]
    TimeBase { at: Location, error: TimeBaseError },
    #[error("{at}: satellite {norad_id} already defined in this constellation")]
    Duplicate { at: Location, norad_id: u64 },
}

impl ParseError {
    pub fn location(&self) -> &Location {
        match self {
            ParseError::LineLength { at, .. }
            | ParseError::NotAscii { at }
            | ParseError::Marker { at, .. }
            | ParseError::Truncated { at }
            | ParseError::Checksum { at, .. }
            | ParseError::CatalogMismatch { at, .. }
            | ParseError::Field { at, .. }
            | ParseError::TimeBase { at, .. }
            | ParseError::Duplicate { at, .. } => at,
        }
    }

    pub fn is_time_base(&self) -> bool {
        matches!(self, ParseError::TimeBase { .. })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
}
