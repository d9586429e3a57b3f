/// climate_api: read-only HTTP API over a historical climate dataset.
///
/// # Module structure
///
/// ```text
/// climate_api
/// ├── model       — schema constants and record types (Station, Measurement, TemperatureStats)
/// ├── config      — service configuration loader (climate.toml)
/// ├── db          — DataSource trait + SQLite implementation, one read-only session per call
/// ├── endpoint    — routing, handlers, and the tiny_http server loop
/// ├── analysis
/// │   └── groupings — shapes flat (date, value) rows into date-keyed maps
/// └── fixtures    — builds small datasets with the production schema (tests, local runs)
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod fixtures;
pub mod model;
