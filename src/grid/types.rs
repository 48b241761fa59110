//! Grid data types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by grid lookups.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Latitude or longitude outside `[-90, 90]` / `[-180, 180]`.
    #[error("geolocation value is out of range")]
    BadLocation,
}

/// Lifecycle state of a server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// The server is serving its resource.
    Online,
    /// The server is retired or unreachable.
    Offline,
}

/// One server lifecycle event or roster row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Whether the server is currently serving.
    pub status: ServerStatus,
    /// Identifier of the resource the server provides.
    pub resource_id: String,
    /// Identifier of the server, e.g. an address.
    pub server_id: String,
    /// Server latitude in degrees.
    pub lat: f64,
    /// Server longitude in degrees.
    pub lon: f64,
}

impl ServerEntry {
    /// Convenience constructor.
    pub fn new(
        status: ServerStatus,
        resource_id: impl Into<String>,
        server_id: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Self {
        ServerEntry {
            status,
            resource_id: resource_id.into(),
            server_id: server_id.into(),
            lat,
            lon,
        }
    }

    /// True when the entry is online.
    pub fn is_online(&self) -> bool {
        self.status == ServerStatus::Online
    }
}

/// Per-cell nearest-server table. Published cells are immutable; updates
/// install a freshly cloned cell in the writer's working matrix.
#[derive(Debug, Clone, Default)]
pub(crate) struct Cell {
    /// Resource id -> server id of the nearest online server.
    pub(crate) server_by_resource: HashMap<String, String>,
    /// Resource id -> distance in km to that server.
    pub(crate) dist_by_resource: HashMap<String, f64>,
}
