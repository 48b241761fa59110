//! Payload records produced by the MaxMind loaders.

use serde::{Deserialize, Serialize};

/// Autonomous-system number and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsRecord {
    /// AS number.
    pub number: i64,
    /// AS description.
    pub description: String,
}

/// A location. Fields the source data leaves blank stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocRecord {
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
    /// Region or subdivision.
    pub region: String,
    /// City name.
    pub city: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}
