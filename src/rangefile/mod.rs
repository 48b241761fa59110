//! Range-file tooling.
//!
//! Offline preparation of MaxMind IPv4 city ranges for shipping to edge
//! nodes: [`rewrite_range_locations`] re-keys each range from a location id
//! to the code of the grid cell containing it, and [`compress_ranges`]
//! merges adjacent ranges with equal codes into a compact CSV plus binary
//! form that [`IpTrie::add_range_bytes`](crate::IpTrie::add_range_bytes)
//! consumers can mmap or stream.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;

use crate::grid::{MAX_LAT, MAX_LON};

/// Cell code for grid cell `(i, j)`.
///
/// The longitude index is always below 1000, so the code is unambiguous.
/// Consumers decode it as `(code / 1000, code % 1000)`; keep the factor
/// fixed.
fn cell_code(i: usize, j: usize) -> u32 {
    (i * 1000 + j) as u32
}

fn lenient_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

/// Rewrites a `[start,end]:locId` block file so each range carries the code
/// of the grid cell its location falls in.
///
/// `locations` is a city location file (id in field 0, latitude and
/// longitude in fields 5 and 6; shorter records are skipped). Every block
/// record (`start,end,locId`) must resolve to a known location; an unknown
/// id or an out-of-range coordinate is an error naming the offending line.
///
/// Returns the number of ranges written.
pub fn rewrite_range_locations(locations: &Path, blocks: &Path, output: &Path) -> Result<usize> {
    let mut cell_by_loc: HashMap<String, u32> = HashMap::new();
    let mut reader = lenient_reader(locations)?;
    for (n, record) in reader.records().enumerate() {
        let record = record.context("failed to read location record")?;
        if record.len() < 7 {
            continue;
        }
        let Ok(lat) = record[5].parse::<f64>() else {
            bail!("latitude at line {} is not valid", n + 1);
        };
        let Ok(lon) = record[6].parse::<f64>() else {
            bail!("longitude at line {} is not valid", n + 1);
        };
        let i = (lat + (MAX_LAT as f64) / 2.0) as i64;
        let j = (lon + (MAX_LON as f64) / 2.0) as i64;
        if i < 0 || i > MAX_LAT as i64 || j < 0 || j > MAX_LON as i64 {
            bail!("geolocation at line {} is out of range", n + 1);
        }
        let code = cell_code(i as usize, j as usize);
        // For duplicate ids the lowest cell code wins, i.e. the first cell
        // in row-major scan order.
        cell_by_loc
            .entry(record[0].to_string())
            .and_modify(|c| *c = (*c).min(code))
            .or_insert(code);
    }
    info!("indexed {} locations", cell_by_loc.len());

    let mut reader = lenient_reader(blocks)?;
    let mut writer = csv::Writer::from_writer(
        File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?,
    );
    let mut written = 0usize;
    for (n, record) in reader.records().enumerate() {
        let record = record.context("failed to read block record")?;
        if record.is_empty() {
            continue;
        }
        if record.len() < 3 {
            bail!("block record at line {} is short", n + 1);
        }
        let Some(&code) = cell_by_loc.get(&record[2]) else {
            bail!("range at line {} has unknown location id {:?}", n + 1, &record[2]);
        };
        writer.write_record([&record[0], &record[1], code.to_string().as_str()])?;
        written += 1;
    }
    writer.flush().context("failed to flush output")?;
    info!("rewrote {written} ranges");
    Ok(written)
}

/// One `(start, end, code)` row while merging.
struct Run {
    start: u32,
    end: u32,
    code: u32,
}

/// Merges consecutive ranges with equal codes and touching endpoints
/// (`end + 1 == next start`) and writes the result twice: as CSV and as a
/// binary file of little-endian `u32` triples terminated by one newline
/// byte.
///
/// Returns the number of merged ranges written.
pub fn compress_ranges(input: &Path, output_csv: &Path, output_bin: &Path) -> Result<usize> {
    let mut reader = lenient_reader(input)?;
    let mut csv_out = csv::Writer::from_writer(
        File::create(output_csv)
            .with_context(|| format!("failed to create {}", output_csv.display()))?,
    );
    let mut bin_out = BufWriter::new(
        File::create(output_bin)
            .with_context(|| format!("failed to create {}", output_bin.display()))?,
    );

    let mut current: Option<Run> = None;
    let mut written = 0usize;
    for (n, record) in reader.records().enumerate() {
        let record = record.context("failed to read range record")?;
        if record.is_empty() {
            continue;
        }
        if record.len() < 3 {
            bail!("range record at line {} is short", n + 1);
        }
        let parse = |idx: usize| -> Result<u32> {
            record[idx]
                .parse::<u32>()
                .with_context(|| format!("bad number at line {}", n + 1))
        };
        let (start, end, code) = (parse(0)?, parse(1)?, parse(2)?);
        match current.as_mut() {
            Some(run) if run.code == code && run.end.wrapping_add(1) == start => {
                run.end = end;
            }
            Some(run) => {
                write_run(&mut csv_out, &mut bin_out, run)?;
                written += 1;
                *run = Run { start, end, code };
            }
            None => current = Some(Run { start, end, code }),
        }
    }
    let Some(run) = current else {
        bail!("input file is empty");
    };
    write_run(&mut csv_out, &mut bin_out, &run)?;
    written += 1;

    csv_out.flush().context("failed to flush csv output")?;
    bin_out
        .write_all(b"\n")
        .and_then(|()| bin_out.flush())
        .context("failed to finish binary output")?;
    info!("compressed into {written} ranges");
    Ok(written)
}

fn write_run<W: Write>(csv_out: &mut csv::Writer<W>, bin_out: &mut impl Write, run: &Run) -> Result<()> {
    csv_out.write_record([
        run.start.to_string(),
        run.end.to_string(),
        run.code.to_string(),
    ])?;
    bin_out.write_all(&run.start.to_le_bytes())?;
    bin_out.write_all(&run.end.to_le_bytes())?;
    bin_out.write_all(&run.code.to_le_bytes())?;
    Ok(())
}
