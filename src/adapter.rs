//! Bridges the tile store's record layout to the database shape a PIR
//! engine requires, and maps tile indices into the engine's query rows.

use crate::engine::{EngineError, PirEngine};
use crate::tile_store::{self, StoreError};
use std::path::Path;
use thiserror::Error;

/// The one public seed index every query uses.
pub const PUBLIC_SEED_INDEX: u32 = 0;

/// Errors raised while preparing or driving a PIR round.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("records region is empty, nothing to reshape")]
    EmptyDatabase,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Per-run protocol state: engine parameters plus the client and server
/// sides, exclusively owned by one benchmark run. Rebuilding re-derives
/// parameters and re-loads the reshaped database.
pub struct PirQueryContext<E: PirEngine> {
    pub params: E::Params,
    pub client: E::Client,
    pub server: E::Server,
    pub dim_log2: u32,
    pub required_db_bytes: usize,
    pub n_items: u64,
    pub item_size_bytes: usize,
}

impl<E: PirEngine> std::fmt::Debug for PirQueryContext<E>
where
    E::Params: std::fmt::Debug,
    E::Client: std::fmt::Debug,
    E::Server: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PirQueryContext")
            .field("params", &self.params)
            .field("client", &self.client)
            .field("server", &self.server)
            .field("dim_log2", &self.dim_log2)
            .field("required_db_bytes", &self.required_db_bytes)
            .field("n_items", &self.n_items)
            .field("item_size_bytes", &self.item_size_bytes)
            .finish()
    }
}

/// Fit the records region into exactly `required` bytes: truncate when the
/// region is long enough, otherwise tile it end-to-end and truncate.
///
/// Tiling aliases protocol rows onto duplicated record bytes; a query is
/// only guaranteed to see original data when its row lands in the
/// non-duplicated prefix. That approximation is a known, accepted
/// limitation.
pub fn reshape_records(records: &[u8], required: usize) -> Result<Vec<u8>, AdapterError> {
    if records.is_empty() {
        return Err(AdapterError::EmptyDatabase);
    }
    if records.len() >= required {
        return Ok(records[..required].to_vec());
    }
    let mut out = Vec::with_capacity(required);
    while out.len() < required {
        let take = (required - out.len()).min(records.len());
        out.extend_from_slice(&records[..take]);
    }
    Ok(out)
}

/// Derive parameters, reshape the store's records region, and build both
/// protocol states.
///
/// `n_items` and `item_size_bytes` must equal the store's actual
/// `(n_tiles, record_size)`; otherwise the client's index-to-row mapping
/// and the server's data silently disagree.
pub fn setup<E: PirEngine>(
    engine: &E,
    db_path: &Path,
    n_items: u64,
    item_size_bytes: usize,
    simple_variant: bool,
) -> Result<PirQueryContext<E>, AdapterError> {
    let params = engine.params_for(n_items, item_size_bytes, simple_variant)?;
    let dim_log2 = engine.query_dim_log2(&params);
    let required_db_bytes = engine.required_db_bytes(&params);

    let records = tile_store::read_records_region(db_path)?;
    let db_bytes = reshape_records(&records, required_db_bytes)?;
    let server = engine.server_new(&params, &db_bytes, false, true)?;
    let client = engine.client_new(&params)?;

    Ok(PirQueryContext {
        params,
        client,
        server,
        dim_log2,
        required_db_bytes,
        n_items,
        item_size_bytes,
    })
}

/// Build a packed query for `tile_index`.
///
/// The row is `tile_index mod 2^dim_log2`: a many-to-one mapping whenever
/// the store holds more tiles than the engine has rows.
pub fn make_query<E: PirEngine>(
    engine: &E,
    ctx: &mut PirQueryContext<E>,
    tile_index: u32,
) -> Result<Vec<u8>, AdapterError> {
    let row = tile_index as u64 & ((1u64 << ctx.dim_log2) - 1);
    let query = engine.query(
        &mut ctx.client,
        PUBLIC_SEED_INDEX,
        ctx.dim_log2,
        true,
        row,
        true,
    )?;
    Ok(query)
}

/// Server-side answer computation.
pub fn answer<E: PirEngine>(
    engine: &E,
    ctx: &PirQueryContext<E>,
    query_bytes: &[u8],
) -> Result<Vec<u8>, AdapterError> {
    Ok(engine.answer(&ctx.server, query_bytes)?)
}

/// Client-side decoding; callers truncate the result to `item_size_bytes`
/// to obtain a record-shaped value.
pub fn extract<E: PirEngine>(
    engine: &E,
    ctx: &PirQueryContext<E>,
    response_bytes: &[u8],
) -> Result<Vec<u8>, AdapterError> {
    Ok(engine.extract(&ctx.client, response_bytes)?)
}
