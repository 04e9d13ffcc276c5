//! On-disk tile record store.
//!
//! Layout: a 7-byte magic tag, two little-endian u32 header fields
//! (`record_size`, `n_tiles`), then exactly `n_tiles` records of
//! `record_size` bytes each. A record is a JSON payload zero-padded (or
//! truncated) to `record_size`; callers must pick `record_size` large enough
//! for the payload schema, truncation is not detected at write time.

use crate::grid::GeoGrid;
use memmap2::Mmap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// Magic tag at offset 0 of every store file.
pub const MAGIC: &[u8; 7] = b"TILEDB1";

/// Byte offset of the first record: magic + record_size + n_tiles.
pub const HEADER_SIZE: u64 = 7 + 4 + 4;

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bad magic header")]
    BadFormat,
    #[error("tile index {index} out of range (store holds {n_tiles} tiles)")]
    OutOfRange { index: u32, n_tiles: u32 },
    #[error("payload encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Synthetic per-tile observation stored as the record payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileObservation {
    pub tile: u32,
    pub temperature_c: f64,
    pub air_quality_index: u16,
    pub precipitation_mm: f64,
    pub proximity_alert_level: u8,
}

impl TileObservation {
    fn synth(tile: u32, rng: &mut impl Rng) -> Self {
        Self {
            tile,
            temperature_c: round1(rng.gen_range(-10.0..40.0)),
            air_quality_index: rng.gen_range(0..301),
            precipitation_mm: round1(rng.gen_range(0.0..25.0)),
            proximity_alert_level: rng.gen_range(1..5),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// A fetched record after padding removal.
///
/// Truncated payloads fail to parse; the raw text is kept so callers can
/// still display something.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedRecord {
    Parsed(TileObservation),
    Raw(String),
}

impl std::fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedRecord::Parsed(obs) => match serde_json::to_string(obs) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{:?}", obs),
            },
            DecodedRecord::Raw(text) => f.write_str(text),
        }
    }
}

/// Create a store of `grid.n_tiles()` records at `path`.
///
/// Returns `false` without touching the file if one already exists; callers
/// must not assume freshly generated data. Payloads are drawn from a ChaCha
/// stream seeded by `seed`, so repeated creation is reproducible.
pub fn create(
    path: &Path,
    grid: &GeoGrid,
    record_size: u32,
    seed: u64,
) -> Result<bool, StoreError> {
    if path.exists() {
        log::debug!("store {} already exists, skipping creation", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let n_tiles = grid.n_tiles();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut out = BufWriter::new(File::create(path)?);

    out.write_all(MAGIC)?;
    out.write_all(&record_size.to_le_bytes())?;
    out.write_all(&n_tiles.to_le_bytes())?;

    for tile in 0..n_tiles {
        let payload = serde_json::to_vec(&TileObservation::synth(tile, &mut rng))?;
        out.write_all(&pad_record(&payload, record_size as usize))?;
    }
    out.flush()?;
    Ok(true)
}

fn pad_record(payload: &[u8], record_size: usize) -> Vec<u8> {
    let mut record = vec![0u8; record_size];
    let take = payload.len().min(record_size);
    record[..take].copy_from_slice(&payload[..take]);
    record
}

/// Read and validate the header, returning `(record_size, n_tiles, header_size)`.
pub fn read_header(path: &Path) -> Result<(u32, u32, u64), StoreError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 7];
    file.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(StoreError::BadFormat);
    }
    let mut word = [0u8; 4];
    file.read_exact(&mut word)?;
    let record_size = u32::from_le_bytes(word);
    file.read_exact(&mut word)?;
    let n_tiles = u32::from_le_bytes(word);
    Ok((record_size, n_tiles, HEADER_SIZE))
}

/// Baseline (non-private) retrieval: seek to record `index` and read it.
///
/// The storage layer observes exactly which index was requested.
pub fn fetch(path: &Path, index: u32) -> Result<Vec<u8>, StoreError> {
    let (record_size, n_tiles, header_size) = read_header(path)?;
    if index >= n_tiles {
        return Err(StoreError::OutOfRange { index, n_tiles });
    }
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(
        header_size + index as u64 * record_size as u64,
    ))?;
    let mut record = vec![0u8; record_size as usize];
    file.read_exact(&mut record)?;
    Ok(record)
}

/// Read the full records region (everything after the header).
///
/// Used only to build the PIR database; the file is mapped rather than
/// streamed since the whole region is needed at once.
pub fn read_records_region(path: &Path) -> Result<Vec<u8>, StoreError> {
    read_header(path)?;
    let file = File::open(path)?;
    let map = unsafe { Mmap::map(&file)? };
    Ok(map[HEADER_SIZE as usize..].to_vec())
}

/// Strip the trailing zero padding from a record.
pub fn strip_padding(record: &[u8]) -> &[u8] {
    let end = record
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    &record[..end]
}

/// Decode a fetched record, degrading to the raw text when the payload does
/// not parse (e.g. truncated mid-structure).
pub fn decode_record(record: &[u8]) -> DecodedRecord {
    let payload = strip_padding(record);
    match serde_json::from_slice::<TileObservation>(payload) {
        Ok(obs) => DecodedRecord::Parsed(obs),
        Err(err) => {
            log::debug!("record payload did not parse: {err}");
            DecodedRecord::Raw(String::from_utf8_lossy(payload).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "geopir-store-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_file(&path);
        path
    }

    fn small_grid() -> GeoGrid {
        GeoGrid::new(10.0, 20.0, 0.5, 0.5, 4, 6)
    }

    #[test]
    fn test_header_roundtrip() {
        let path = temp_path("header");
        create(&path, &small_grid(), 256, 7).unwrap();
        let (record_size, n_tiles, header_size) = read_header(&path).unwrap();
        assert_eq!(record_size, 256);
        assert_eq!(n_tiles, 24);
        assert_eq!(header_size, HEADER_SIZE);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_length_matches_shape() {
        let path = temp_path("length");
        create(&path, &small_grid(), 128, 7).unwrap();
        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len, HEADER_SIZE + 24 * 128);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_create_is_idempotent() {
        let path = temp_path("idempotent");
        assert!(create(&path, &small_grid(), 128, 3).unwrap());
        let first = fs::read(&path).unwrap();
        // Different seed must not matter: the existing file is kept as is.
        assert!(!create(&path, &small_grid(), 99, 4).unwrap());
        assert_eq!(fs::read(&path).unwrap(), first);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_create_is_reproducible() {
        let a = temp_path("repro-a");
        let b = temp_path("repro-b");
        create(&a, &small_grid(), 128, 42).unwrap();
        create(&b, &small_grid(), 128, 42).unwrap();
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
        fs::remove_file(&a).unwrap();
        fs::remove_file(&b).unwrap();
    }

    #[test]
    fn test_fetch_parses_with_matching_tile() {
        let path = temp_path("fetch");
        create(&path, &small_grid(), 256, 11).unwrap();
        for index in [0u32, 5, 23] {
            let record = fetch(&path, index).unwrap();
            assert_eq!(record.len(), 256);
            match decode_record(&record) {
                DecodedRecord::Parsed(obs) => {
                    assert_eq!(obs.tile, index);
                    assert!(obs.air_quality_index <= 300);
                    assert!((1..=4).contains(&obs.proximity_alert_level));
                }
                DecodedRecord::Raw(text) => panic!("record {index} did not parse: {text}"),
            }
        }
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_fetch_out_of_range() {
        let path = temp_path("range");
        create(&path, &small_grid(), 128, 11).unwrap();
        let err = fetch(&path, 24).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { index: 24, n_tiles: 24 }));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_magic() {
        let path = temp_path("magic");
        fs::write(&path, b"NOTADB1\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();
        let err = read_header(&path).unwrap_err();
        assert!(matches!(err, StoreError::BadFormat));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_records_region_length() {
        let path = temp_path("region");
        create(&path, &small_grid(), 64, 11).unwrap();
        let region = read_records_region(&path).unwrap();
        assert_eq!(region.len(), 24 * 64);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_truncated_payload_degrades_to_raw() {
        let path = temp_path("truncated");
        // 24 bytes cuts the JSON mid-structure.
        create(&path, &small_grid(), 24, 11).unwrap();
        let record = fetch(&path, 0).unwrap();
        match decode_record(&record) {
            DecodedRecord::Raw(text) => assert!(text.starts_with("{\"tile\":0")),
            DecodedRecord::Parsed(obs) => panic!("unexpected parse of truncated record: {obs:?}"),
        }
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_strip_padding() {
        assert_eq!(strip_padding(b"abc\x00\x00"), b"abc");
        assert_eq!(strip_padding(b"\x00\x00"), b"");
        assert_eq!(strip_padding(b"a\x00b\x00"), b"a\x00b");
    }

    #[test]
    fn test_pad_record_truncates_and_pads() {
        assert_eq!(pad_record(b"abcd", 2), b"ab");
        assert_eq!(pad_record(b"ab", 4), b"ab\x00\x00");
    }
}
