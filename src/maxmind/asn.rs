//! ASN block loaders.

use std::io::Read;

use anyhow::{Context, Result};
use log::debug;

use super::reader_for;
use super::types::AsRecord;
use crate::trie::IpTrie;

/// Loads a MaxMind IPv6 ASN block file into the trie.
///
/// Each record needs at least 6 fields: the range endpoints as address
/// strings in fields 0 and 1, the AS number in field 4 and its description
/// in field 5. Short records and records with an unparseable AS number are
/// skipped.
pub fn load_ipv6_asn(trie: &IpTrie<AsRecord>, block: impl Read) -> Result<usize> {
    let mut reader = reader_for(block);
    let mut added = 0usize;
    for record in reader.records() {
        let record = record.context("failed to read IPv6 ASN record")?;
        if record.len() < 6 {
            continue;
        }
        let Ok(number) = record[4].parse::<i64>() else {
            continue;
        };
        let payload = AsRecord {
            number,
            description: record[5].to_string(),
        };
        trie.add_range(&record[0], &record[1], payload);
        added += 1;
    }
    debug!("loaded {added} IPv6 ASN ranges");
    Ok(added)
}

/// Loads a MaxMind IPv4 ASN block file into the trie.
///
/// Each record needs at least 4 fields: the range endpoints as decimal
/// `u32` values in fields 0 and 1, the AS number in field 2 and its
/// description in field 3. Short records and records with unparseable
/// numeric fields are skipped.
pub fn load_ipv4_asn(trie: &IpTrie<AsRecord>, block: impl Read) -> Result<usize> {
    let mut reader = reader_for(block);
    let mut added = 0usize;
    for record in reader.records() {
        let record = record.context("failed to read IPv4 ASN record")?;
        if record.len() < 4 {
            continue;
        }
        let (Ok(start), Ok(end)) = (record[0].parse::<u32>(), record[1].parse::<u32>()) else {
            continue;
        };
        let Ok(number) = record[2].parse::<i64>() else {
            continue;
        };
        let payload = AsRecord {
            number,
            description: record[3].to_string(),
        };
        trie.add_range_num(start, end, payload);
        added += 1;
    }
    debug!("loaded {added} IPv4 ASN ranges");
    Ok(added)
}
