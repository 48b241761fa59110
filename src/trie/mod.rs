//! Range-trie over canonical 16-byte IP keys.
//!
//! The trie matches an address to the smallest enclosing `[start, end]`
//! range rather than just to a prefix. A range is stored as two endpoint
//! nodes: the start node carries the payload and anchors itself, the end
//! node anchors the start node. Lookups that cannot land on a payload walk
//! back up the trie probing subtrees with smaller byte values — finding a
//! start node means the query sits inside its open range; finding a bare
//! end node means the query walked off the end of a range and is a miss.
//!
//! Ranges are assumed non-overlapping; overlap behaviour is unspecified.

mod node;

use std::sync::{PoisonError, RwLock};

use log::debug;

use crate::codec::{self, AddrBytes};
use node::{trim_key, Arena};

/// A concurrent range-trie mapping IP addresses to attribute payloads.
///
/// Payloads are opaque to the trie. Inserts and lookups may run from
/// multiple threads; lookups never block each other. Callers that share one
/// payload across many ranges parameterize with `Arc<_>`.
///
/// # Examples
///
/// ```
/// use ipatlas::IpTrie;
///
/// let trie = IpTrie::new();
/// trie.add_range("192.168.42.1", "192.168.42.254", 20u32);
/// assert_eq!(trie.get("192.168.42.102"), Some(20));
/// assert_eq!(trie.get("192.168.43.1"), None);
/// ```
#[derive(Debug)]
pub struct IpTrie<T> {
    arena: RwLock<Arena<T>>,
}

impl<T> IpTrie<T> {
    /// Creates an empty trie.
    pub fn new() -> Self {
        IpTrie {
            arena: RwLock::new(Arena::new()),
        }
    }

    /// Inserts a single address with its payload.
    ///
    /// Malformed address strings are silently dropped.
    pub fn add(&self, addr: &str, data: T) {
        let Some(key) = codec::parse_addr(addr) else {
            debug!("dropping unparseable address {addr:?}");
            return;
        };
        self.add_key(&key, data);
    }

    /// Inserts a single IPv4 address given as a `u32`.
    pub fn add_num(&self, addr: u32, data: T) {
        self.add_key(&codec::u32_to_v4(addr), data);
    }

    /// Inserts the range `[start, end]` with its payload.
    ///
    /// Endpoint ordering is the caller's contract; malformed endpoints drop
    /// the whole insert.
    pub fn add_range(&self, start: &str, end: &str, data: T) {
        let (Some(s), Some(e)) = (codec::parse_addr(start), codec::parse_addr(end)) else {
            debug!("dropping range with unparseable endpoint {start:?}..{end:?}");
            return;
        };
        self.add_range_bytes(&s, &e, data);
    }

    /// Inserts an IPv4 range given as `u32` endpoints.
    pub fn add_range_num(&self, start: u32, end: u32, data: T) {
        self.add_range_bytes(&codec::u32_to_v4(start), &codec::u32_to_v4(end), data);
    }

    /// Inserts a range given as canonical 16-byte endpoints, e.g. read from
    /// a binary range file.
    pub fn add_range_bytes(&self, start: &AddrBytes, end: &AddrBytes, data: T) {
        let mut arena = self.write_arena();
        let s = arena.insert_key(trim_key(start));
        {
            let sn = arena.node_mut(s);
            sn.payload = Some(data);
            sn.range_start = Some(s);
        }
        let e = arena.insert_key(trim_key(end));
        arena.node_mut(e).range_start = Some(s);
    }

    /// Computes the usable-host range of a CIDR prefix and inserts it.
    ///
    /// Declined or malformed prefixes (see [`codec::cidr_to_range`]) are
    /// silently dropped.
    pub fn add_cidr(&self, cidr: &str, data: T) {
        let Some((s, e)) = codec::cidr_to_range(cidr) else {
            debug!("dropping undecodable CIDR {cidr:?}");
            return;
        };
        self.add_range_bytes(&s, &e, data);
    }

    /// Resets the trie to empty. Previously returned payloads stay valid;
    /// the trie's own references are discarded.
    pub fn rm_all(&self) {
        *self.write_arena() = Arena::new();
    }

    /// Reports whether the trie holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read_arena().is_empty()
    }

    fn add_key(&self, key: &AddrBytes, data: T) {
        let mut arena = self.write_arena();
        let id = arena.insert_key(trim_key(key));
        let node = arena.node_mut(id);
        node.payload = Some(data);
        node.range_start = Some(id);
    }

    fn read_arena(&self) -> std::sync::RwLockReadGuard<'_, Arena<T>> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_arena(&self) -> std::sync::RwLockWriteGuard<'_, Arena<T>> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> IpTrie<T> {
    /// Returns the payload of the smallest range or longest prefix covering
    /// `addr`, or `None` when the address is outside every entry. Malformed
    /// addresses are a miss, not an error.
    pub fn get(&self, addr: &str) -> Option<T> {
        self.get_key(&codec::parse_addr(addr)?)
    }

    /// Looks up an IPv4 address given as a `u32`.
    pub fn get_num(&self, addr: u32) -> Option<T> {
        self.get_key(&codec::u32_to_v4(addr))
    }

    fn get_key(&self, key: &AddrBytes) -> Option<T> {
        let arena = self.read_arena();

        // Descend along the full, untrimmed key. Trimmed insertion means the
        // trie may run out before the key does.
        let (mut k, i) = arena.descend(key);
        if let Some(data) = &arena.node(k).payload {
            // Exact match or a trimmed start node covering this subtree.
            return Some(data.clone());
        }

        let mut b = if i < key.len() {
            key[i]
        } else {
            let node = arena.node(k);
            let parent = node.parent?;
            let edge = node.edge;
            k = parent;
            edge
        };

        loop {
            if let Some(r) = arena.find_candidate(k, Some(b)) {
                return match &arena.node(r).payload {
                    // Inside the range anchored at the candidate.
                    Some(data) => Some(data.clone()),
                    // A bare end node: the query walked off the end of a
                    // range and is not covered.
                    None => None,
                };
            }
            let node = arena.node(k);
            let parent = node.parent?;
            b = node.edge;
            k = parent;
        }
    }
}

impl<T> Default for IpTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}
