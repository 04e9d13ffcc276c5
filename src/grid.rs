//! Uniform latitude/longitude grid and the (lat, lon) -> tile index mapping.

/// A uniform geographic grid. Constructed once from fixed configuration;
/// `lat_step`/`lon_step` must be positive and `n_lat`/`n_lon` non-zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoGrid {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_step: f64,
    pub lon_step: f64,
    pub n_lat: u32,
    pub n_lon: u32,
}

impl GeoGrid {
    pub fn new(
        lat_min: f64,
        lon_min: f64,
        lat_step: f64,
        lon_step: f64,
        n_lat: u32,
        n_lon: u32,
    ) -> Self {
        debug_assert!(lat_step > 0.0 && lon_step > 0.0);
        debug_assert!(n_lat > 0 && n_lon > 0);
        Self { lat_min, lon_min, lat_step, lon_step, n_lat, n_lon }
    }

    /// Total number of tiles.
    pub fn n_tiles(&self) -> u32 {
        self.n_lat * self.n_lon
    }

    /// Map (lat, lon) to a flat tile index in `[0, n_tiles)`.
    ///
    /// Coordinates outside the grid extent clamp to the nearest edge tile;
    /// there is no failure mode.
    pub fn tile_index(&self, lat: f64, lon: f64) -> u32 {
        let i = ((lat - self.lat_min) / self.lat_step).floor() as i64;
        let j = ((lon - self.lon_min) / self.lon_step).floor() as i64;
        let i = i.clamp(0, self.n_lat as i64 - 1) as u32;
        let j = j.clamp(0, self.n_lon as i64 - 1) as u32;
        i * self.n_lon + j
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_grid() -> GeoGrid {
        GeoGrid::new(48.0, 8.0, 0.01, 0.01, 400, 400)
    }

    #[test]
    fn test_index_within_bounds() {
        let grid = demo_grid();
        for &(lat, lon) in &[
            (48.0, 8.0),
            (48.5, 9.5),
            (51.999, 11.999),
            (48.0049, 8.0049),
        ] {
            let idx = grid.tile_index(lat, lon);
            assert!(idx < grid.n_tiles(), "index {idx} out of range for ({lat}, {lon})");
        }
    }

    #[test]
    fn test_demo_query_point() {
        let grid = demo_grid();
        // (48.137, 11.575) -> i=13, j=357 -> 13*400 + 357
        assert_eq!(grid.tile_index(48.137, 11.575), 5557);
    }

    #[test]
    fn test_origin_is_tile_zero() {
        let grid = demo_grid();
        assert_eq!(grid.tile_index(48.0, 8.0), 0);
    }

    #[test]
    fn test_clamps_below_origin() {
        let grid = demo_grid();
        assert_eq!(grid.tile_index(-90.0, -180.0), 0);
        assert_eq!(grid.tile_index(47.5, 9.0), grid.tile_index(48.0, 9.0));
    }

    #[test]
    fn test_clamps_above_extent() {
        let grid = demo_grid();
        let last = grid.n_tiles() - 1;
        assert_eq!(grid.tile_index(90.0, 180.0), last);
        // Only latitude out of range: clamps to the last row, same column.
        let idx = grid.tile_index(90.0, 8.5);
        assert_eq!(idx / grid.n_lon, grid.n_lat - 1);
        assert_eq!(idx % grid.n_lon, 50);
    }

    #[test]
    fn test_deterministic() {
        let grid = demo_grid();
        assert_eq!(grid.tile_index(48.137, 11.575), grid.tile_index(48.137, 11.575));
    }

    #[test]
    fn test_n_tiles() {
        assert_eq!(demo_grid().n_tiles(), 160_000);
        assert_eq!(GeoGrid::new(0.0, 0.0, 1.0, 1.0, 3, 5).n_tiles(), 15);
    }
}
