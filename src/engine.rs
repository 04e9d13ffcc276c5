//! Abstract PIR engine boundary.
//!
//! The orchestration layer never touches engine internals; it drives an
//! implementation of [`PirEngine`] through parameter derivation, state
//! construction, and the query/answer/extract round, exchanging opaque byte
//! messages. [`crate::lwe::LwePirEngine`] is the concrete implementation.

use thiserror::Error;

/// Failures originating inside a PIR engine. These are not recoverable by
/// the caller and must be propagated unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad engine parameters: {0}")]
    BadParameters(String),
    #[error("database length mismatch: expected {expected} bytes, got {actual}")]
    DatabaseShape { expected: usize, actual: usize },
    #[error("unsupported mode: {0}")]
    UnsupportedMode(&'static str),
    #[error("unknown public seed index {0}")]
    UnknownSeedIndex(u32),
    #[error("query row {row} out of range (engine accepts {limit} rows)")]
    RowOutOfRange { row: u64, limit: u64 },
    #[error("extract called with no pending query")]
    MissingQueryState,
    #[error("message codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// A PIR engine: derives protocol parameters from a claimed logical database
/// shape, owns client- and server-side protocol state, and exchanges opaque
/// query/response messages.
pub trait PirEngine {
    type Params;
    type Client;
    type Server;

    /// Derive parameters for a logical database of `n_items` items of
    /// `item_size_bytes` each. `simple_variant` selects the engine's
    /// simpler parameter preset.
    fn params_for(
        &self,
        n_items: u64,
        item_size_bytes: usize,
        simple_variant: bool,
    ) -> Result<Self::Params, EngineError>;

    /// log2 of the number of distinct query rows the engine accepts.
    fn query_dim_log2(&self, params: &Self::Params) -> u32;

    /// Exact byte length the server-side database buffer must have.
    fn required_db_bytes(&self, params: &Self::Params) -> usize;

    /// Client protocol state, built from public parameters only.
    fn client_new(&self, params: &Self::Params) -> Result<Self::Client, EngineError>;

    /// Server protocol state over a database buffer of exactly
    /// [`Self::required_db_bytes`] bytes. `transposed` declares the input
    /// layout; `pad_rows` allows zero-extending a short buffer.
    fn server_new(
        &self,
        params: &Self::Params,
        db_bytes: &[u8],
        transposed: bool,
        pad_rows: bool,
    ) -> Result<Self::Server, EngineError>;

    /// Produce a query message for `row`. The client retains the secret
    /// state needed by [`Self::extract`].
    #[allow(clippy::too_many_arguments)]
    fn query(
        &self,
        client: &mut Self::Client,
        public_seed_index: u32,
        dim_log2: u32,
        use_packing: bool,
        row: u64,
        pack_output: bool,
    ) -> Result<Vec<u8>, EngineError>;

    /// Server-side answer computation; a pure function of the server state
    /// and the query message.
    fn answer(&self, server: &Self::Server, query_bytes: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Client-side decoding of a response into the retrieved row's bytes,
    /// organized as fixed-width words; callers truncate to the item size.
    fn extract(&self, client: &Self::Client, response_bytes: &[u8])
        -> Result<Vec<u8>, EngineError>;
}
