/// Result shaping for the climate API.
///
/// Submodules:
/// - `groupings` — turns flat `(date, value)` rows into date-keyed maps.

pub mod groupings;
