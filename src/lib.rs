//! Geo-tile retrieval benchmark: direct fetch vs. private information
//! retrieval over the same fixed-size tile record store.
//!
//! A tile store is a flat binary file of `n_tiles` fixed-size records indexed
//! by a uniform latitude/longitude grid. The baseline path seeks and reads a
//! record directly (revealing the index to storage); the private path drives
//! an LWE-based PIR engine through setup, query, answer, and extract so the
//! server never learns which tile was requested. Both paths are measured
//! against identical data and reported side by side.

pub mod adapter;
pub mod bench;
pub mod engine;
pub mod grid;
pub mod lwe;
pub mod tile_store;

pub use engine::PirEngine;
pub use grid::GeoGrid;
pub use lwe::LwePirEngine;
