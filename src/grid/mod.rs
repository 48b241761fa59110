//! Nearest-server grid.
//!
//! A 181x361 matrix of one-degree cells, each holding the nearest online
//! server per resource. Lookups read the published snapshot through a shared
//! lock and never block on writers; updates are serialised by a writer lock,
//! build a new matrix off to the side, and publish it with one pointer swap.
//! A cell touched by an update is freshly cloned first (fresh maps), so a
//! published snapshot is never mutated and readers cannot observe a
//! half-written `(server, distance)` pair.

mod types;

pub use types::{GridError, ServerEntry, ServerStatus};

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::debug;

use crate::geo::distance;
use types::Cell;

/// Highest cell row index; rows span latitudes -90..=90.
pub const MAX_LAT: usize = 180;
/// Highest cell column index; columns span longitudes -180..=180.
pub const MAX_LON: usize = 360;

/// Lowest accepted latitude.
pub const LO_LAT: f64 = -90.0;
/// Highest accepted latitude.
pub const HI_LAT: f64 = 90.0;
/// Lowest accepted longitude.
pub const LO_LON: f64 = -180.0;
/// Highest accepted longitude.
pub const HI_LON: f64 = 180.0;

type CellMatrix = Vec<Vec<Arc<Cell>>>;

fn empty_matrix() -> CellMatrix {
    (0..=MAX_LAT)
        .map(|_| (0..=MAX_LON).map(|_| Arc::new(Cell::default())).collect())
        .collect()
}

/// Latitude of cell row `i`.
fn cell_lat(i: usize) -> f64 {
    i as f64 - 90.0
}

/// Longitude of cell column `j`.
fn cell_lon(j: usize) -> f64 {
    j as f64 - 180.0
}

/// Maps a geolocation and resource to the nearest online server.
///
/// Safe for many concurrent readers and one writer at a time; concurrent
/// writers queue on the writer lock. A batch applied with
/// [`update_multi`](LocationGrid::update_multi) becomes visible atomically.
///
/// # Examples
///
/// ```
/// use ipatlas::{LocationGrid, ServerEntry, ServerStatus};
///
/// let grid = LocationGrid::new();
/// let e = ServerEntry::new(ServerStatus::Online, "1", "154.67.34.2", -89.0, 90.0);
/// grid.update(Some(&e), &[]);
/// assert_eq!(grid.get_server(1.0, 2.0, "1").unwrap(), "154.67.34.2");
/// ```
#[derive(Debug)]
pub struct LocationGrid {
    /// Published snapshot pointer. Readers take the shared side; publishing
    /// takes the exclusive side for the duration of one pointer store.
    snapshot: RwLock<Arc<CellMatrix>>,
    /// Serialises mutation; at most one writer builds a matrix at a time.
    writer: Mutex<()>,
}

impl LocationGrid {
    /// Creates a grid with every cell allocated and empty.
    pub fn new() -> Self {
        LocationGrid {
            snapshot: RwLock::new(Arc::new(empty_matrix())),
            writer: Mutex::new(()),
        }
    }

    /// Returns the server id of the nearest online server for `resource_id`
    /// at the given geolocation, or the empty string when no server covers
    /// it. A miss is not an error; out-of-range coordinates are.
    pub fn get_server(&self, lat: f64, lon: f64, resource_id: &str) -> Result<String, GridError> {
        if !(LO_LAT..=HI_LAT).contains(&lat) || !(LO_LON..=HI_LON).contains(&lon) {
            return Err(GridError::BadLocation);
        }
        let i = (lat - LO_LAT).floor() as usize;
        let j = (lon - LO_LON).floor() as usize;
        let snap = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(snap[i][j]
            .server_by_resource
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Applies one server lifecycle event. `None` is a no-op.
    ///
    /// `all_entries` is the caller's authoritative roster; it is consulted
    /// only when `entry` goes offline, to elect replacement servers.
    pub fn update(&self, entry: Option<&ServerEntry>, all_entries: &[ServerEntry]) {
        let Some(entry) = entry else {
            return;
        };
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.working_copy();
        Self::apply(&mut next, entry, all_entries);
        self.publish(next);
    }

    /// Applies a batch of lifecycle events and publishes them together.
    /// Readers observe either none or all of the batch. An empty batch is a
    /// no-op.
    pub fn update_multi(&self, batch: &[ServerEntry], all_entries: &[ServerEntry]) {
        if batch.is_empty() {
            return;
        }
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.working_copy();
        for entry in batch {
            Self::apply(&mut next, entry, all_entries);
        }
        self.publish(next);
    }

    /// Shallow-copies the published matrix: new rows, shared cell pointers.
    fn working_copy(&self) -> CellMatrix {
        let snap = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snap.iter().map(|row| row.to_vec()).collect()
    }

    fn publish(&self, next: CellMatrix) {
        let mut snap = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *snap = Arc::new(next);
    }

    fn apply(matrix: &mut CellMatrix, entry: &ServerEntry, all_entries: &[ServerEntry]) {
        match entry.status {
            ServerStatus::Online => Self::add_server(matrix, entry),
            ServerStatus::Offline => Self::remove_server(matrix, entry, all_entries),
        }
    }

    /// Installs `entry` in every cell it is now nearest to.
    fn add_server(matrix: &mut CellMatrix, entry: &ServerEntry) {
        debug!(
            "grid: adding server {} for resource {}",
            entry.server_id, entry.resource_id
        );
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                let current = slot
                    .dist_by_resource
                    .get(&entry.resource_id)
                    .copied()
                    .unwrap_or(f64::MAX);
                let dist = distance(cell_lat(i), cell_lon(j), entry.lat, entry.lon);
                if dist < current {
                    // Clone-on-first-touch: the published snapshot may still
                    // share this cell.
                    let cell = Arc::make_mut(slot);
                    cell.server_by_resource
                        .insert(entry.resource_id.clone(), entry.server_id.clone());
                    cell.dist_by_resource.insert(entry.resource_id.clone(), dist);
                }
            }
        }
    }

    /// Evicts `entry` from every cell it serves and elects the nearest
    /// remaining online server for the resource, or marks the cell empty
    /// for it.
    fn remove_server(matrix: &mut CellMatrix, entry: &ServerEntry, all_entries: &[ServerEntry]) {
        debug!(
            "grid: removing server {} for resource {}",
            entry.server_id, entry.resource_id
        );
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                if slot.server_by_resource.get(&entry.resource_id) != Some(&entry.server_id) {
                    continue;
                }
                let mut winner = String::new();
                let mut min_dist = f64::MAX;
                for candidate in all_entries {
                    if candidate.resource_id == entry.resource_id && candidate.is_online() {
                        let dist =
                            distance(cell_lat(i), cell_lon(j), candidate.lat, candidate.lon);
                        if dist < min_dist {
                            winner = candidate.server_id.clone();
                            min_dist = dist;
                        }
                    }
                }
                let cell = Arc::make_mut(slot);
                cell.server_by_resource
                    .insert(entry.resource_id.clone(), winner);
                cell.dist_by_resource
                    .insert(entry.resource_id.clone(), min_dist);
            }
        }
    }
}

impl Default for LocationGrid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online(resource: &str, server: &str, lat: f64, lon: f64) -> ServerEntry {
        ServerEntry::new(ServerStatus::Online, resource, server, lat, lon)
    }

    fn offline(resource: &str, server: &str, lat: f64, lon: f64) -> ServerEntry {
        ServerEntry::new(ServerStatus::Offline, resource, server, lat, lon)
    }

    #[test]
    fn test_get_server_rejects_out_of_range() {
        let grid = LocationGrid::new();
        assert_eq!(grid.get_server(0.0, 400.0, "1"), Err(GridError::BadLocation));
        assert_eq!(grid.get_server(-91.0, 179.0, "2"), Err(GridError::BadLocation));
        assert_eq!(grid.get_server(90.5, 0.0, "1"), Err(GridError::BadLocation));
        assert_eq!(grid.get_server(0.0, -180.5, "1"), Err(GridError::BadLocation));
    }

    #[test]
    fn test_get_server_accepts_boundaries() {
        let grid = LocationGrid::new();
        for (lat, lon) in [(-90.0, -180.0), (90.0, 180.0), (0.0, 0.0)] {
            assert_eq!(grid.get_server(lat, lon, "1").unwrap(), "");
        }
    }

    #[test]
    fn test_empty_grid_miss_is_empty_string() {
        let grid = LocationGrid::new();
        assert_eq!(grid.get_server(12.0, 34.0, "nope").unwrap(), "");
    }

    #[test]
    fn test_add_server_covers_whole_grid() {
        let grid = LocationGrid::new();
        grid.update(Some(&online("1", "154.67.34.2", -89.0, 90.0)), &[]);
        for (lat, lon) in [(0.0, 0.0), (89.0, -179.0), (-90.0, 180.0)] {
            assert_eq!(grid.get_server(lat, lon, "1").unwrap(), "154.67.34.2");
        }
        // Other resources stay unserved.
        assert_eq!(grid.get_server(0.0, 0.0, "2").unwrap(), "");
    }

    #[test]
    fn test_nearest_server_wins_per_cell() {
        let grid = LocationGrid::new();
        grid.update(Some(&online("1", "A", -89.0, 90.0)), &[]);
        grid.update(Some(&online("1", "B", 88.0, 172.0)), &[]);
        assert_eq!(grid.get_server(1.0, 2.0, "1").unwrap(), "A");
        assert_eq!(grid.get_server(88.0, 172.0, "1").unwrap(), "B");
    }

    #[test]
    fn test_update_none_is_noop() {
        let grid = LocationGrid::new();
        grid.update(Some(&online("1", "A", 0.0, 0.0)), &[]);
        grid.update(None, &[]);
        assert_eq!(grid.get_server(0.0, 0.0, "1").unwrap(), "A");
    }

    #[test]
    fn test_remove_server_elects_replacement() {
        let grid = LocationGrid::new();
        let a = online("1", "A", -89.0, 90.0);
        let b = online("1", "B", 88.0, 172.0);
        grid.update(Some(&a), &[]);
        grid.update(Some(&b), &[]);
        assert_eq!(grid.get_server(88.0, 172.0, "1").unwrap(), "B");

        // B goes offline; the roster now holds only A online.
        let gone = offline("1", "B", 88.0, 172.0);
        let roster = vec![a.clone(), gone.clone()];
        grid.update(Some(&gone), &roster);
        assert_eq!(grid.get_server(88.0, 172.0, "1").unwrap(), "A");
        assert_eq!(grid.get_server(1.0, 2.0, "1").unwrap(), "A");
    }

    #[test]
    fn test_remove_last_server_empties_resource() {
        let grid = LocationGrid::new();
        let a = online("1", "A", 10.0, 10.0);
        grid.update(Some(&a), &[]);
        let gone = offline("1", "A", 10.0, 10.0);
        grid.update(Some(&gone), &[gone.clone()]);
        assert_eq!(grid.get_server(10.0, 10.0, "1").unwrap(), "");
    }

    #[test]
    fn test_remove_only_touches_matching_resource() {
        let grid = LocationGrid::new();
        let a1 = online("1", "A", 10.0, 10.0);
        let a2 = online("2", "A", 10.0, 10.0);
        grid.update(Some(&a1), &[]);
        grid.update(Some(&a2), &[]);
        let gone = offline("1", "A", 10.0, 10.0);
        grid.update(Some(&gone), &[a2.clone(), gone.clone()]);
        assert_eq!(grid.get_server(10.0, 10.0, "1").unwrap(), "");
        assert_eq!(grid.get_server(10.0, 10.0, "2").unwrap(), "A");
    }

    #[test]
    fn test_update_multi_empty_batch_is_noop() {
        let grid = LocationGrid::new();
        grid.update_multi(&[], &[]);
        assert_eq!(grid.get_server(0.0, 0.0, "1").unwrap(), "");
    }

    #[test]
    fn test_update_multi_applies_whole_batch() {
        let grid = LocationGrid::new();
        let batch = vec![
            online("1", "A", -89.0, 90.0),
            online("2", "A", -89.0, 90.0),
            online("3", "A", -89.0, 90.0),
            online("1", "B", 88.0, 172.0),
            online("3", "B", 88.0, 172.0),
        ];
        grid.update_multi(&batch, &[]);
        assert_eq!(grid.get_server(0.0, 0.0, "1").unwrap(), "A");
        assert_eq!(grid.get_server(0.0, 0.0, "2").unwrap(), "A");
        assert_eq!(grid.get_server(0.0, 0.0, "3").unwrap(), "A");
        assert_eq!(grid.get_server(88.0, 172.0, "1").unwrap(), "B");
        assert_eq!(grid.get_server(88.0, 172.0, "2").unwrap(), "A");
        assert_eq!(grid.get_server(88.0, 172.0, "3").unwrap(), "B");
    }

    #[test]
    fn test_published_snapshot_is_immutable() {
        // A snapshot captured before an update keeps serving the old view.
        let grid = LocationGrid::new();
        grid.update(Some(&online("1", "A", 0.0, 0.0)), &[]);
        let before = grid
            .snapshot
            .read()
            .unwrap()
            .clone();
        grid.update(Some(&online("1", "B", 50.0, 50.0)), &[]);
        let cell = &before[90][180];
        assert_eq!(cell.server_by_resource.get("1").map(String::as_str), Some("A"));
    }
}
