//! Benchmark harness: drives the direct and private retrieval paths against
//! the same store and reports byte sizes and phase timings.
//!
//! Timing contract, per path: `client` covers query construction and
//! response decoding, `server` covers the fetch or answer computation,
//! `total` spans the whole request lifecycle. PIR setup runs before the
//! clock starts; it is a one-time amortizable cost, not a per-query cost.

use crate::adapter::{self, AdapterError};
use crate::engine::PirEngine;
use crate::tile_store::{self, StoreError};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Bytes a baseline client sends: one index in the clear.
pub const BASELINE_UPLOAD_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Measurements for one retrieval path.
#[derive(Clone, Debug, Serialize)]
pub struct PathResult {
    pub label: String,
    pub db_file: String,
    pub n_tiles: u32,
    pub record_size: u32,
    pub index: u32,
    pub upload_bytes: usize,
    pub download_bytes: usize,
    pub t_client_ms: f64,
    pub t_server_ms: f64,
    pub t_total_ms: f64,
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Baseline path: the storage layer sees the requested index.
pub fn run_baseline(db_path: &Path, index: u32) -> Result<PathResult, BenchError> {
    let (record_size, n_tiles, _) = tile_store::read_header(db_path)?;

    let total_start = Instant::now();
    let server_start = Instant::now();
    let record = tile_store::fetch(db_path, index)?;
    let t_server = server_start.elapsed();
    // Client-side work is just padding removal.
    let _ = tile_store::strip_padding(&record);
    let t_total = total_start.elapsed();

    Ok(PathResult {
        label: "baseline_direct".to_string(),
        db_file: file_label(db_path),
        n_tiles,
        record_size,
        index,
        upload_bytes: BASELINE_UPLOAD_BYTES,
        download_bytes: record.len(),
        t_client_ms: ms(t_total - t_server),
        t_server_ms: ms(t_server),
        t_total_ms: ms(t_total),
    })
}

/// Private path: setup, then one measured query/answer/extract round.
pub fn run_private<E: PirEngine>(
    engine: &E,
    db_path: &Path,
    index: u32,
    simple_variant: bool,
) -> Result<PathResult, BenchError> {
    let (record_size, n_tiles, _) = tile_store::read_header(db_path)?;
    let mut ctx =
        adapter::setup(engine, db_path, n_tiles as u64, record_size as usize, simple_variant)?;

    let total_start = Instant::now();

    let query_start = Instant::now();
    let query = adapter::make_query(engine, &mut ctx, index)?;
    let t_query = query_start.elapsed();

    let server_start = Instant::now();
    let response = adapter::answer(engine, &ctx, &query)?;
    let t_server = server_start.elapsed();

    let extract_start = Instant::now();
    let raw = adapter::extract(engine, &ctx, &response)?;
    let take = (record_size as usize).min(raw.len());
    let _record = raw[..take].to_vec();
    let t_extract = extract_start.elapsed();

    let t_total = total_start.elapsed();

    Ok(PathResult {
        label: "pir_lwe".to_string(),
        db_file: file_label(db_path),
        n_tiles,
        record_size,
        index,
        upload_bytes: query.len(),
        download_bytes: response.len(),
        t_client_ms: ms(t_query + t_extract),
        t_server_ms: ms(t_server),
        t_total_ms: ms(t_total),
    })
}

/// Render results as a fixed-column text table, one row per path.
pub fn render_table(results: &[PathResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<14} {:>8} {:>6} {:>8} {:>10} {:>10} {:>11} {:>11} {:>11}",
        "label", "db", "tiles", "recB", "idx", "upB", "downB", "client_ms", "server_ms", "total_ms"
    );
    for r in results {
        let _ = writeln!(
            out,
            "{:<16} {:<14} {:>8} {:>6} {:>8} {:>10} {:>10} {:>11.2} {:>11.2} {:>11.2}",
            r.label,
            r.db_file,
            r.n_tiles,
            r.record_size,
            r.index,
            r.upload_bytes,
            r.download_bytes,
            r.t_client_ms,
            r.t_server_ms,
            r.t_total_ms
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathResult {
        PathResult {
            label: "baseline_direct".to_string(),
            db_file: "tiles.bin".to_string(),
            n_tiles: 160_000,
            record_size: 256,
            index: 5557,
            upload_bytes: 4,
            download_bytes: 256,
            t_client_ms: 0.011,
            t_server_ms: 0.203,
            t_total_ms: 0.215,
        }
    }

    #[test]
    fn test_table_has_header_and_row() {
        let table = render_table(&[sample()]);
        let mut lines = table.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("label"));
        assert!(header.contains("client_ms"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("baseline_direct"));
        assert!(row.contains("tiles.bin"));
        assert!(row.contains("5557"));
    }

    #[test]
    fn test_results_serialize_to_json() {
        let text = serde_json::to_string(&[sample()]).unwrap();
        assert!(text.contains("\"upload_bytes\":4"));
        assert!(text.contains("\"label\":\"baseline_direct\""));
    }
}
