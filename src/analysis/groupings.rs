/// Date grouping utilities.
///
/// The data layer returns flat `(date, value)` rows. The precipitation and
/// tobs routes both publish those rows keyed by date string, but differ in
/// how they treat a date that appears more than once:
///
/// - precipitation keeps every value (one per reporting station)
/// - tobs is single-station, so the last value encountered wins
///
/// `BTreeMap` keeps the keys in ascending date order in the JSON output.

use std::collections::BTreeMap;

use crate::model::{DATE_FORMAT, DatedValue};

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Groups precipitation rows into `date -> [values]`.
///
/// Values for the same date stay in row order. Missing readings are kept
/// as `None` so the list length equals the number of rows for that date.
pub fn group_precipitation_by_date(rows: Vec<DatedValue>) -> BTreeMap<String, Vec<Option<f64>>> {
    let mut grouped: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

    for (date, value) in rows {
        grouped
            .entry(date.format(DATE_FORMAT).to_string())
            .or_default()
            .push(value);
    }

    grouped
}

/// Maps temperature rows into `date -> value`; last value wins on repeats.
pub fn temperatures_by_date(rows: Vec<DatedValue>) -> BTreeMap<String, Option<f64>> {
    rows.into_iter()
        .map(|(date, value)| (date.format(DATE_FORMAT).to_string(), value))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
