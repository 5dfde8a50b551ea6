use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sgp4::Elements;

use crate::tle::error::{Location, ParseError, TimeBaseError};
use crate::tle::types::{OrbitalElementSet, TleSource};

pub const LINE_LENGTH: usize = 69;

const EPOCH_COLUMNS: std::ops::Range<usize> = 18..32;
const CATALOG_COLUMNS: std::ops::Range<usize> = 2..7;
const EPOCH_TOLERANCE_MICROS: i64 = 1_000;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Everything one constellation's sources produced: accepted sets in input
/// order and every rejected record.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub elements: Vec<OrbitalElementSet>,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    /// Number of records presented, accepted or not.
    pub fn records(&self) -> usize {
        self.elements.len() + self.errors.len()
    }
}

struct RawRecord<'a> {
    name: Option<&'a str>,
    line1: (usize, &'a str),
    line2: (usize, &'a str),
}

/// Parse every source of one constellation. Duplicate catalog numbers keep
/// the first occurrence.
pub fn parse_sources(constellation: &str, sources: &[TleSource]) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut seen = BTreeSet::new();

    for source in sources {
        let (records, framing_errors) = frame_records(&source.name, &source.text);
        outcome.errors.extend(framing_errors);

        for record in records {
            match build_element_set(constellation, &source.name, &record) {
                Ok(set) => {
                    if seen.insert(set.norad_id) {
                        outcome.elements.push(set);
                    } else {
                        outcome.errors.push(ParseError::Duplicate {
                            at: Location::new(&source.name, set.line_number),
                            norad_id: set.norad_id,
                        });
                    }
                }
                Err(e) => outcome.errors.push(e),
            }
        }
    }

    for error in &outcome.errors {
        log::warn!("[{}] rejected TLE record: {}", constellation, error);
    }

    outcome
}

/// Group non-empty lines into 2-line or 3-line records.
fn frame_records<'a>(origin: &str, text: &'a str) -> (Vec<RawRecord<'a>>, Vec<ParseError>) {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (number, line) = lines[i];

        let (name, start) = if is_data_line(line, b'1') {
            (None, i)
        } else if is_data_line(line, b'2') {
            errors.push(ParseError::Marker {
                at: Location::new(origin, number),
                expected: '1',
            });
            i += 1;
            continue;
        } else {
            match lines.get(i + 1) {
                Some(&(_, l1)) if is_data_line(l1, b'1') => (Some(clean_name(line)), i + 1),
                Some(&(n1, _)) => {
                    errors.push(ParseError::Marker {
                        at: Location::new(origin, n1),
                        expected: '1',
                    });
                    i += 1;
                    continue;
                }
                None => {
                    errors.push(ParseError::Truncated {
                        at: Location::new(origin, number),
                    });
                    i += 1;
                    continue;
                }
            }
        };

        let line1 = lines[start];
        // A line 1 not followed by a line 2 ends its record; whatever comes
        // next is framed as the start of a new one.
        match lines.get(start + 1) {
            Some(&line2) if is_data_line(line2.1, b'2') => {
                records.push(RawRecord { name, line1, line2 });
                i = start + 2;
            }
            _ => {
                errors.push(ParseError::Truncated {
                    at: Location::new(origin, line1.0),
                });
                i = start + 1;
            }
        }
    }

    (records, errors)
}

fn is_data_line(line: &str, marker: u8) -> bool {
    let bytes = line.as_bytes();
    bytes.first() == Some(&marker) && bytes.get(1) == Some(&b' ')
}

fn clean_name(line: &str) -> &str {
    line.strip_prefix("0 ").unwrap_or(line).trim()
}

fn build_element_set(
    constellation: &str,
    origin: &str,
    record: &RawRecord<'_>,
) -> Result<OrbitalElementSet, ParseError> {
    let (n1, line1) = record.line1;
    let (n2, line2) = record.line2;

    check_line(origin, n1, line1, b'1')?;
    check_line(origin, n2, line2, b'2')?;

    let at = Location::new(origin, n1);
    if line1[CATALOG_COLUMNS] != line2[CATALOG_COLUMNS] {
        return Err(ParseError::CatalogMismatch {
            at,
            line1: line1[CATALOG_COLUMNS].trim().to_string(),
            line2: line2[CATALOG_COLUMNS].trim().to_string(),
        });
    }

    let epoch = parse_epoch(&line1[EPOCH_COLUMNS]).map_err(|error| ParseError::TimeBase {
        at: at.clone(),
        error,
    })?;

    let elements = Elements::from_tle(
        record.name.map(String::from),
        line1.as_bytes(),
        line2.as_bytes(),
    )
    .map_err(|e| ParseError::Field {
        at: at.clone(),
        message: e.to_string(),
    })?;

    let drift = (epoch.naive_utc() - elements.datetime).num_microseconds();
    if drift.map_or(true, |d| d.abs() > EPOCH_TOLERANCE_MICROS) {
        return Err(ParseError::TimeBase {
            at,
            error: TimeBaseError::Inconsistent {
                computed: epoch,
                propagator: elements.datetime,
            },
        });
    }

    Ok(OrbitalElementSet::from_elements(
        elements,
        epoch,
        constellation,
        origin,
        n1,
    ))
}

fn check_line(origin: &str, number: usize, line: &str, marker: u8) -> Result<(), ParseError> {
    let at = || Location::new(origin, number);

    if !line.is_ascii() {
        return Err(ParseError::NotAscii { at: at() });
    }
    if line.len() != LINE_LENGTH {
        return Err(ParseError::LineLength {
            at: at(),
            found: line.len(),
        });
    }
    if !is_data_line(line, marker) {
        return Err(ParseError::Marker {
            at: at(),
            expected: char::from(marker),
        });
    }

    let found = line.as_bytes()[LINE_LENGTH - 1];
    let computed = checksum(line);
    if !found.is_ascii_digit() || u32::from(found - b'0') != computed {
        return Err(ParseError::Checksum {
            at: at(),
            found: u32::from(found.wrapping_sub(b'0')),
            computed,
        });
    }

    Ok(())
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// minus signs count one.
pub fn checksum(line: &str) -> u32 {
    line.bytes()
        .take(LINE_LENGTH - 1)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

/// Decode the `YYDDD.DDDDDDDD` epoch field into an absolute UTC timestamp.
pub fn parse_epoch(field: &str) -> Result<DateTime<Utc>, TimeBaseError> {
    let field = field.trim();
    let unparseable = || TimeBaseError::Unparseable(field.to_string());

    if !field.is_ascii() || field.len() < 3 {
        return Err(unparseable());
    }

    let yy: i32 = field[..2].parse().map_err(|_| unparseable())?;
    let day: f64 = field[2..].trim().parse().map_err(|_| unparseable())?;
    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };

    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(unparseable)?;
    let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    if !day.is_finite() || day < 1.0 || day >= days_in_year + 1.0 {
        return Err(TimeBaseError::DayOutOfRange { year, day });
    }

    let micros = ((day - 1.0) * MICROS_PER_DAY).round() as i64;
    let midnight = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
    Ok(midnight + Duration::microseconds(micros))
}
