//! City and country block loaders.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;

use super::reader_for;
use super::types::LocRecord;
use crate::trie::IpTrie;

/// Loads a MaxMind IPv6 city block file into the trie.
///
/// Each record needs at least 9 fields: the range endpoints as address
/// strings in fields 0 and 1, the country code in field 4, the region in
/// field 5 and latitude/longitude in fields 7 and 8. Short records and
/// records with unparseable coordinates are skipped.
pub fn load_ipv6_city(trie: &IpTrie<Arc<LocRecord>>, block: impl Read) -> Result<usize> {
    let mut reader = reader_for(block);
    let mut added = 0usize;
    for record in reader.records() {
        let record = record.context("failed to read IPv6 city record")?;
        if record.len() < 9 {
            continue;
        }
        let (Ok(lat), Ok(lon)) = (record[7].parse::<f64>(), record[8].parse::<f64>()) else {
            continue;
        };
        let payload = Arc::new(LocRecord {
            country_code: record[4].to_string(),
            region: record[5].to_string(),
            city: String::new(),
            lat,
            lon,
        });
        trie.add_range(&record[0], &record[1], payload);
        added += 1;
    }
    debug!("loaded {added} IPv6 city ranges");
    Ok(added)
}

/// Loads a MaxMind IPv4 city block/location file pair into the trie.
///
/// The location file (at least 7 fields per record) is indexed first: id in
/// field 0, country/region/city in fields 1-3, latitude/longitude in fields
/// 5 and 6. Block records (at least 3 fields) carry the range as decimal
/// `u32` endpoints and the location id; a block whose id is absent from the
/// location index is skipped.
pub fn load_ipv4_city(
    trie: &IpTrie<Arc<LocRecord>>,
    block: impl Read,
    location: impl Read,
) -> Result<usize> {
    let mut locations: HashMap<String, Arc<LocRecord>> = HashMap::new();
    let mut reader = reader_for(location);
    for record in reader.records() {
        let record = record.context("failed to read city location record")?;
        if record.len() < 7 {
            continue;
        }
        let (Ok(lat), Ok(lon)) = (record[5].parse::<f64>(), record[6].parse::<f64>()) else {
            continue;
        };
        locations.insert(
            record[0].to_string(),
            Arc::new(LocRecord {
                country_code: record[1].to_string(),
                region: record[2].to_string(),
                city: record[3].to_string(),
                lat,
                lon,
            }),
        );
    }
    debug!("indexed {} city locations", locations.len());

    let mut reader = reader_for(block);
    let mut added = 0usize;
    for record in reader.records() {
        let record = record.context("failed to read IPv4 city block record")?;
        if record.len() < 3 {
            continue;
        }
        let Some(loc) = locations.get(&record[2]) else {
            continue;
        };
        let (Ok(start), Ok(end)) = (record[0].parse::<u32>(), record[1].parse::<u32>()) else {
            continue;
        };
        trie.add_range_num(start, end, Arc::clone(loc));
        added += 1;
    }
    debug!("loaded {added} IPv4 city ranges");
    Ok(added)
}

/// Loads a MaxMind IPv4 country block/location file pair into the trie.
///
/// Intended for a trie of its own, consulted when a city lookup misses.
/// Location records (at least 4 fields) are indexed by the country code in
/// field 0 with latitude/longitude in fields 1 and 2; block records (at
/// least 5 fields) carry the range endpoints as address strings in fields
/// 0 and 1 and the country code in field 4.
pub fn load_ipv4_country(
    trie: &IpTrie<Arc<LocRecord>>,
    block: impl Read,
    location: impl Read,
) -> Result<usize> {
    let mut locations: HashMap<String, Arc<LocRecord>> = HashMap::new();
    let mut reader = reader_for(location);
    for record in reader.records() {
        let record = record.context("failed to read country location record")?;
        if record.len() < 4 {
            continue;
        }
        let (Ok(lat), Ok(lon)) = (record[1].parse::<f64>(), record[2].parse::<f64>()) else {
            continue;
        };
        locations.insert(
            record[0].to_string(),
            Arc::new(LocRecord {
                country_code: record[0].to_string(),
                region: String::new(),
                city: String::new(),
                lat,
                lon,
            }),
        );
    }
    debug!("indexed {} country locations", locations.len());

    let mut reader = reader_for(block);
    let mut added = 0usize;
    for record in reader.records() {
        let record = record.context("failed to read IPv4 country block record")?;
        if record.len() < 5 {
            continue;
        }
        let Some(loc) = locations.get(&record[4]) else {
            continue;
        };
        trie.add_range(&record[0], &record[1], Arc::clone(loc));
        added += 1;
    }
    debug!("loaded {added} IPv4 country ranges");
    Ok(added)
}
