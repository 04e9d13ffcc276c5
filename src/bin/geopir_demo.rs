use clap::Parser;
use geopir::bench::{render_table, run_baseline, run_private};
use geopir::tile_store::{self, decode_record};
use geopir::{GeoGrid, LwePirEngine};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Compare direct and private (PIR) retrieval from a synthetic geo-tile store")]
struct Args {
    /// Tile store path; created on first run, reused afterwards
    #[arg(long, default_value = "data/tiles.bin")]
    db: PathBuf,

    /// Bytes per tile record
    #[arg(long, default_value = "256")]
    record_size: u32,

    /// Seed for synthetic payload generation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Query point latitude
    #[arg(long, default_value = "48.137")]
    lat: f64,

    /// Query point longitude
    #[arg(long, default_value = "11.575")]
    lon: f64,

    /// Use the SimplePIR-grade engine parameter preset
    #[arg(long)]
    simple: bool,

    /// Output results as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // Demo grid: 400x400 tiles of 0.01 degrees starting at (48.0, 8.0).
    let grid = GeoGrid::new(48.0, 8.0, 0.01, 0.01, 400, 400);

    if tile_store::create(&args.db, &grid, args.record_size, args.seed)? {
        println!(
            "wrote {} ({} tiles, {} B records)",
            args.db.display(),
            grid.n_tiles(),
            args.record_size
        );
    } else {
        println!("reusing existing {}", args.db.display());
    }

    let index = grid.tile_index(args.lat, args.lon);
    println!("query point ({}, {}) -> tile {index}", args.lat, args.lon);

    let results = vec![
        run_baseline(&args.db, index)?,
        run_private(&LwePirEngine, &args.db, index, args.simple)?,
    ];

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("\n=== RESULTS ===");
        print!("{}", render_table(&results));
        let record = tile_store::fetch(&args.db, index)?;
        println!("\ntile {index} payload: {}", decode_record(&record));
    }
    Ok(())
}
