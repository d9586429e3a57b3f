/// Read-only access to the climate dataset.
///
/// `DataSource` is the handle every route handler receives. The SQLite
/// implementation keeps only the file path; each operation opens its own
/// read-only connection and drops it before returning, on success and on
/// error alike. There is no pooling and no connection shared across calls.

use crate::model::{
    DATE_FORMAT, DatedValue, MEASUREMENT_TABLE, STATION_TABLE, Station, TemperatureStats,
};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by the data access layer.
#[derive(Debug, Error)]
pub enum DataError {
    /// The dataset file could not be opened read-only.
    #[error("failed to open dataset '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A table the queries rely on is absent from the dataset.
    #[error("required table '{0}' does not exist")]
    MissingTable(String),

    #[error("dataset query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// Caller-supplied input (usually a date path segment) was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DataError {
    /// True for failures of the store itself rather than of the request input.
    pub fn is_data_source(&self) -> bool {
        !matches!(self, DataError::InvalidArgument(_))
    }
}

// ---------------------------------------------------------------------------
// Data access surface
// ---------------------------------------------------------------------------

/// Read-only queries over the station and measurement collections.
pub trait DataSource: Send + Sync {
    /// Full station metadata in insertion order.
    fn list_stations(&self) -> Result<Vec<Station>, DataError>;

    /// All station codes in insertion order.
    fn list_station_codes(&self) -> Result<Vec<String>, DataError>;

    /// Every measurement with `date >= since`, any station, missing values included.
    fn precipitation_since(&self, since: NaiveDate) -> Result<Vec<DatedValue>, DataError>;

    /// Temperature observations for one station with `date >= since`, ordered by date.
    fn temperatures_for_station_since(
        &self,
        station_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DatedValue>, DataError>;

    /// Min/max/mean temperature over `start..=end`, open-ended when `end` is `None`.
    fn temperature_stats_in_range(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<TemperatureStats, DataError>;
}

/// Parses a `YYYY-MM-DD` path parameter.
pub fn parse_date_param(raw: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        DataError::InvalidArgument(format!("'{}' is not a date in YYYY-MM-DD format", raw))
    })
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

/// `DataSource` backed by a SQLite file opened read-only per call.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    /// Validates the dataset file and returns a handle to it.
    ///
    /// The file must exist, open read-only, and contain both the station
    /// and measurement tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let source = SqliteSource {
            path: path.as_ref().to_path_buf(),
        };

        let conn = source.connect()?;
        for table in [STATION_TABLE, MEASUREMENT_TABLE] {
            verify_table(&conn, table)?;
        }

        Ok(source)
    }

    /// Dataset file this handle reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a scoped read-only session. Dropping the connection closes it.
    fn connect(&self) -> Result<Connection, DataError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DataError::Open {
            path: self.path.clone(),
            source,
        })
    }
}

/// Checks that a required table exists in the dataset.
fn verify_table(conn: &Connection, table: &str) -> Result<(), DataError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(DataError::MissingTable(table.to_string())),
    }
}

impl DataSource for SqliteSource {
    fn list_stations(&self) -> Result<Vec<Station>, DataError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT station, name, latitude, longitude, elevation
             FROM station
             ORDER BY rowid",
        )?;

        let stations = stmt
            .query_map([], |row| {
                Ok(Station {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    elevation: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stations)
    }

    fn list_station_codes(&self) -> Result<Vec<String>, DataError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT station FROM station ORDER BY rowid")?;

        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(codes)
    }

    fn precipitation_since(&self, since: NaiveDate) -> Result<Vec<DatedValue>, DataError> {
        debug!("precipitation_since({})", since);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT date, prcp
             FROM measurement
             WHERE date >= ?1
             ORDER BY date, rowid",
        )?;

        let rows = stmt
            .query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<DatedValue>, _>>()?;

        Ok(rows)
    }

    fn temperatures_for_station_since(
        &self,
        station_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DatedValue>, DataError> {
        debug!("temperatures_for_station_since({}, {})", station_id, since);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT date, tobs
             FROM measurement
             WHERE station = ?1 AND date >= ?2
             ORDER BY date, rowid",
        )?;

        let rows = stmt
            .query_map(params![station_id, since], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<DatedValue>, _>>()?;

        Ok(rows)
    }

    fn temperature_stats_in_range(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<TemperatureStats, DataError> {
        debug!("temperature_stats_in_range({}, {:?})", start, end);
        let conn = self.connect()?;

        // An aggregate over zero rows yields a single all-NULL row.
        let stats = conn.query_row(
            "SELECT MIN(tobs), MAX(tobs), AVG(tobs)
             FROM measurement
             WHERE date >= ?1 AND (?2 IS NULL OR date <= ?2)",
            params![start, end],
            |row| {
                Ok(TemperatureStats {
                    min: row.get(0)?,
                    max: row.get(1)?,
                    avg: row.get(2)?,
                })
            },
        )?;

        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{measurement, seed_database, station};
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn sample_source() -> (TempDir, SqliteSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("climate.sqlite");
        seed_database(
            &path,
            &[station("S1"), station("S2")],
            &[
                measurement("S1", "2017-08-20", Some(0.1), Some(80.0)),
                measurement("S2", "2017-08-20", None, Some(78.0)),
                measurement("S1", "2017-08-25", Some(0.3), Some(75.0)),
                measurement("S2", "2017-08-10", Some(1.2), None),
            ],
        )
        .unwrap();
        let source = SqliteSource::open(&path).unwrap();
        (dir, source)
    }

    #[test]
    fn test_parse_date_param_accepts_iso_dates() {
        assert_eq!(parse_date_param("2017-08-23").unwrap(), date("2017-08-23"));
    }

    #[test]
    fn test_parse_date_param_rejects_malformed_input() {
        for raw in [
            "",
            "2017",
            "08-23-2017",
            "2017-13-01",
            "2017-02-30",
            "yesterday",
            " 2017-08-01",
            "2017-08-01\n",
        ] {
            match parse_date_param(raw) {
                Err(DataError::InvalidArgument(msg)) => assert!(msg.contains(raw)),
                other => panic!("expected InvalidArgument for '{}', got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_open_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteSource::open(dir.path().join("absent.sqlite"));
        match result {
            Err(DataError::Open { path, source }) => {
                assert!(path.ends_with("absent.sqlite"));
                // Cause stays reachable for logging.
                let err = DataError::Open { path, source };
                assert!(std::error::Error::source(&err).is_some());
                assert!(err.is_data_source());
            }
            other => panic!("expected open failure, got {:?}", other),
        }
    }

    #[test]
    fn test_open_fails_when_table_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE station (station TEXT)").unwrap();
        drop(conn);

        match SqliteSource::open(&path) {
            Err(DataError::MissingTable(table)) => assert_eq!(table, "measurement"),
            other => panic!("expected missing table error, got {:?}", other),
        }
    }

    #[test]
    fn test_query_failure_keeps_sqlite_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_tobs.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE station (station TEXT);
             CREATE TABLE measurement (station TEXT, date TEXT, prcp FLOAT);",
        )
        .unwrap();
        drop(conn);

        let source = SqliteSource::open(&path).unwrap();
        let err = source
            .temperature_stats_in_range(date("2017-01-01"), None)
            .unwrap_err();

        assert!(matches!(err, DataError::Query(_)), "got {:?}", err);
        assert!(err.is_data_source());
        let cause = std::error::Error::source(&err).expect("sqlite error as source");
        assert!(cause.to_string().contains("tobs"), "cause: {}", cause);
    }

    #[test]
    fn test_station_codes_in_insertion_order() {
        let (_dir, source) = sample_source();
        assert_eq!(source.list_station_codes().unwrap(), vec!["S1", "S2"]);
        // Stable across calls.
        assert_eq!(source.list_station_codes().unwrap(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_list_stations_returns_metadata() {
        let (_dir, source) = sample_source();
        let stations = source.list_stations().unwrap();
        assert!(source.path().ends_with("climate.sqlite"));
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0], station("S1"));
    }

    #[test]
    fn test_precipitation_since_excludes_earlier_rows() {
        let (_dir, source) = sample_source();
        let rows = source.precipitation_since(date("2017-08-20")).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(d, _)| *d >= date("2017-08-20")));
        assert!(rows.contains(&(date("2017-08-20"), None)));
        assert_eq!(rows, source.precipitation_since(date("2017-08-20")).unwrap());
    }

    #[test]
    fn test_temperatures_filter_by_station() {
        let (_dir, source) = sample_source();
        let rows = source
            .temperatures_for_station_since("S1", date("2017-08-01"))
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (date("2017-08-20"), Some(80.0)),
                (date("2017-08-25"), Some(75.0)),
            ]
        );
        assert!(
            source
                .temperatures_for_station_since("S9", date("2017-08-01"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_stats_respect_inclusive_bounds() {
        let (_dir, source) = sample_source();
        let stats = source
            .temperature_stats_in_range(date("2017-08-20"), Some(date("2017-08-25")))
            .unwrap();
        assert_eq!(stats.min, Some(75.0));
        assert_eq!(stats.max, Some(80.0));
        let avg = stats.avg.unwrap();
        assert!((avg - 233.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_empty_range_is_all_none() {
        let (_dir, source) = sample_source();
        let stats = source
            .temperature_stats_in_range(date("2099-01-01"), None)
            .unwrap();
        assert!(stats.is_empty());

        let reversed = source
            .temperature_stats_in_range(date("2017-08-25"), Some(date("2017-08-20")))
            .unwrap();
        assert!(reversed.is_empty());
    }

    #[test]
    fn test_open_ended_range_matches_range_to_max_date() {
        let (_dir, source) = sample_source();
        let open = source
            .temperature_stats_in_range(date("2017-08-01"), None)
            .unwrap();
        let closed = source
            .temperature_stats_in_range(date("2017-08-01"), Some(date("2017-08-25")))
            .unwrap();
        assert_eq!(open, closed);
    }
}
