use geopir::tile_store::{self, DecodedRecord};
use geopir::GeoGrid;
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("geopir-e2e-{}-{}", std::process::id(), name));
    let _ = fs::remove_file(&path);
    path
}

/// Full demo-scale scenario: 400x400 grid, 256-byte records.
#[test]
fn test_demo_scale_store() {
    let grid = GeoGrid::new(48.0, 8.0, 0.01, 0.01, 400, 400);
    let index = grid.tile_index(48.137, 11.575);
    assert_eq!(index, 5557); // i=13, j=357

    let path = temp_path("demo-scale");
    tile_store::create(&path, &grid, 256, 42).unwrap();

    let len = fs::metadata(&path).unwrap().len();
    assert_eq!(len, tile_store::HEADER_SIZE + 400 * 400 * 256);

    let record = tile_store::fetch(&path, index).unwrap();
    assert_eq!(record.len(), 256);
    match tile_store::decode_record(&record) {
        DecodedRecord::Parsed(obs) => assert_eq!(obs.tile, 5557),
        DecodedRecord::Raw(text) => panic!("record did not parse: {text}"),
    }

    fs::remove_file(&path).unwrap();
}
