//! ipatlas: IP range lookup and nearest-server geolocation.
//!
//! Two cooperating in-memory structures answer operational lookups at
//! interactive latency:
//!
//! - [`IpTrie`] matches an IPv4 or IPv6 address to the smallest enclosing
//!   `[start, end]` range and returns the attribute payload stored with it
//!   (AS descriptor, location, or any caller type).
//! - [`LocationGrid`] maps a latitude/longitude and a resource id to the
//!   nearest online server, under many readers and occasional writers.
//!
//! The [`maxmind`] loaders feed GeoLite CSV data into a trie, and the
//! [`rangefile`] utilities prepare compact range files offline.
//!
//! # Example
//!
//! ```
//! use ipatlas::IpTrie;
//!
//! let trie = IpTrie::new();
//! trie.add_cidr("192.168.42.0/24", "office");
//! assert_eq!(trie.get("192.168.42.17"), Some("office"));
//! assert_eq!(trie.get("203.0.113.9"), None);
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod geo;
pub mod grid;
pub mod logging;
pub mod maxmind;
pub mod rangefile;
pub mod trie;

// Re-export the core API at the crate root.
pub use geo::distance;
pub use grid::{GridError, LocationGrid, ServerEntry, ServerStatus};
pub use trie::IpTrie;
