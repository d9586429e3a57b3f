/// Shared data types for the climate API.
///
/// The dataset layout is fixed, so the schema is declared here rather than
/// discovered from the database at startup. Table and column names below
/// are the single source of truth for every query in `db`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Station metadata table.
pub const STATION_TABLE: &str = "station";
/// Daily observation table.
pub const MEASUREMENT_TABLE: &str = "measurement";

/// Date format used both in storage and in API path parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A fixed weather-recording location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Unique station code, e.g. "USC00519281".
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// One dated observation tied to a station.
///
/// Either value may be missing in the source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub station_id: String,
    pub date: NaiveDate,
    pub precipitation: Option<f64>,
    pub temperature_observation: Option<f64>,
}

/// Min/max/mean of temperature observations over a date range.
///
/// All three are `None` when the range matched no rows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemperatureStats {
    #[serde(rename = "Minimum Temperature")]
    pub min: Option<f64>,
    #[serde(rename = "Maximum Temperature")]
    pub max: Option<f64>,
    #[serde(rename = "Average Temperature")]
    pub avg: Option<f64>,
}

impl TemperatureStats {
    /// True when the aggregate ran over an empty row set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.avg.is_none()
    }
}

/// A `(date, value)` pair as returned by the row-level queries.
pub type DatedValue = (NaiveDate, Option<f64>);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_stats_serializes_with_display_keys() {
        let stats = TemperatureStats {
            min: Some(70.0),
            max: Some(80.0),
            avg: Some(75.0),
        };
        let json = serde_json::to_value(stats).unwrap();

        assert_eq!(json["Minimum Temperature"].as_f64(), Some(70.0));
        assert_eq!(json["Maximum Temperature"].as_f64(), Some(80.0));
        assert_eq!(json["Average Temperature"].as_f64(), Some(75.0));
    }

    #[test]
    fn test_empty_stats_serialize_as_nulls() {
        let json = serde_json::to_value(TemperatureStats::default()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "Minimum Temperature": null,
                "Maximum Temperature": null,
                "Average Temperature": null
            })
        );
        assert!(TemperatureStats::default().is_empty());
    }
}
