/// Builds small SQLite datasets with the production schema.
///
/// The service itself never writes to its dataset. This module exists for
/// unit tests, the integration tests under `tests/`, and for producing a
/// local sample file to run the service against.

use crate::model::{DATE_FORMAT, Measurement, Station};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use std::path::Path;

/// Table definitions matching the published dataset layout.
pub const SCHEMA_SQL: &str = "
    CREATE TABLE station (
        id INTEGER PRIMARY KEY,
        station TEXT NOT NULL,
        name TEXT NOT NULL,
        latitude FLOAT,
        longitude FLOAT,
        elevation FLOAT
    );
    CREATE TABLE measurement (
        id INTEGER PRIMARY KEY,
        station TEXT NOT NULL,
        date TEXT NOT NULL,
        prcp FLOAT,
        tobs FLOAT
    );
";

/// Creates a dataset file at `path` holding exactly the given rows.
///
/// Rows are inserted in slice order, which is the order `list_station_codes`
/// reports them in.
pub fn seed_database(
    path: &Path,
    stations: &[Station],
    measurements: &[Measurement],
) -> rusqlite::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA_SQL)?;

    let tx = conn.transaction()?;
    for s in stations {
        tx.execute(
            "INSERT INTO station (station, name, latitude, longitude, elevation)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.id, s.name, s.latitude, s.longitude, s.elevation],
        )?;
    }
    for m in measurements {
        tx.execute(
            "INSERT INTO measurement (station, date, prcp, tobs)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                m.station_id,
                m.date,
                m.precipitation,
                m.temperature_observation
            ],
        )?;
    }
    tx.commit()
}

/// Station with placeholder metadata.
pub fn station(code: &str) -> Station {
    Station {
        id: code.to_string(),
        name: format!("{} TEST STATION, HI US", code),
        latitude: 21.2716,
        longitude: -157.8168,
        elevation: 3.0,
    }
}

/// Measurement row; `date` must be `YYYY-MM-DD`.
///
/// # Panics
/// Panics on a malformed date, which is a bug in the calling test.
pub fn measurement(
    station_id: &str,
    date: &str,
    precipitation: Option<f64>,
    temperature_observation: Option<f64>,
) -> Measurement {
    Measurement {
        station_id: station_id.to_string(),
        date: NaiveDate::parse_from_str(date, DATE_FORMAT)
            .unwrap_or_else(|e| panic!("bad fixture date '{}': {}", date, e)),
        precipitation,
        temperature_observation,
    }
}
