//! MaxMind CSV ingestion.
//!
//! Loaders that stream MaxMind GeoLite block and location CSV files into an
//! [`IpTrie`](crate::IpTrie). Records are read leniently: short rows and
//! rows with unparseable numeric fields are skipped, only CSV-level read
//! failures propagate. See <http://www.maxmind.com/en/opensource> for the
//! data sources.

mod asn;
mod city;
mod types;

pub use asn::{load_ipv4_asn, load_ipv6_asn};
pub use city::{load_ipv4_city, load_ipv4_country, load_ipv6_city};
pub use types::{AsRecord, LocRecord};

use std::io::Read;

/// Builds the lenient CSV reader every loader uses: no header row, records
/// of varying width allowed.
fn reader_for<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::IpTrie;

    #[test]
    fn test_load_ipv4_asn() {
        let block = "\
3232235521,3232238335,15169,Example Carrier
garbage,3232238336,1,skipped
3232301313,3232369407,64512,Another Carrier
short,row\n";
        let trie = IpTrie::new();
        let added = load_ipv4_asn(&trie, block.as_bytes()).unwrap();
        assert_eq!(added, 2);
        let hit = trie.get("192.168.8.8").unwrap();
        assert_eq!(hit.number, 15169);
        assert_eq!(hit.description, "Example Carrier");
        assert!(trie.get("10.0.0.1").is_none());
    }

    #[test]
    fn test_load_ipv6_asn() {
        // Layout is start,end,_,_,asn,description; the second record is
        // short and skipped.
        let rows = "\
2001:db8::1,2001:db8::ff00,x,y,64496,Doc Net
2001:db8:1::1,2001:db8:1::00ff\n";
        let trie = IpTrie::new();
        let added = load_ipv6_asn(&trie, rows.as_bytes()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(trie.get("2001:db8::1234").unwrap().number, 64496);
        assert!(trie.get("2001:db8:1::12").is_none());
    }

    #[test]
    fn test_load_ipv6_city() {
        let rows = "\
2001:db8::1,2001:db8::ff00,x,y,ZA,Free State,z,-27.9864,26.7066
2001:db8:1::1,2001:db8:1::00ff,x,y,NA,Khomas,z,notalat,17.0836\n";
        let trie = IpTrie::new();
        let added = load_ipv6_city(&trie, rows.as_bytes()).unwrap();
        assert_eq!(added, 1);
        let hit = trie.get("2001:db8::42").unwrap();
        assert_eq!(hit.country_code, "ZA");
        assert_eq!(hit.region, "Free State");
        assert!((hit.lat + 27.9864).abs() < 1e-9);
    }

    #[test]
    fn test_load_ipv4_city_skips_unknown_location_id() {
        let location = "\
\"A\",\"ZA\",\"FS\",\"Welkom\",\"\",-27.9864,26.7066,,
\"B\",\"ZW\",\"HA\",\"Harare\",\"\",-17.8178,31.0447,,\n";
        let block = "\
\"3232235521\",\"3232238335\",\"A\"
\"3232253185\",\"3232301055\",\"MISSING\"\n";
        let trie = IpTrie::new();
        let added = load_ipv4_city(&trie, block.as_bytes(), location.as_bytes()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(trie.get("192.168.8.8").unwrap().city, "Welkom");
        assert!(trie.get("192.168.77.1").is_none());
    }

    #[test]
    fn test_load_ipv4_city_shares_location_payloads() {
        let location = "\"A\",\"ZA\",\"FS\",\"Welkom\",\"\",-27.9864,26.7066,,\n";
        let block = "\
\"3232235521\",\"3232238335\",\"A\"
\"3232301313\",\"3232369407\",\"A\"\n";
        let trie = IpTrie::new();
        load_ipv4_city(&trie, block.as_bytes(), location.as_bytes()).unwrap();
        let a = trie.get("192.168.8.8").unwrap();
        let b = trie.get("192.169.8.8").unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_load_ipv4_country() {
        let location = "\
ZA,-29.0,24.0,South Africa
ZW,-19.0,29.8,Zimbabwe\n";
        let block = "\
\"192.168.0.1\",\"192.168.10.255\",\"x\",\"y\",\"ZA\"
\"192.169.0.1\",\"192.169.10.255\",\"x\",\"y\",\"XX\"\n";
        let trie = IpTrie::new();
        let added = load_ipv4_country(&trie, block.as_bytes(), location.as_bytes()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(trie.get("192.168.5.5").unwrap().country_code, "ZA");
        assert!(trie.get("192.169.5.5").is_none());
    }
}
