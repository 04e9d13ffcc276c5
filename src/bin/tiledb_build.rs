use clap::Parser;
use geopir::tile_store;
use geopir::GeoGrid;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Generate a synthetic geo-tile record store")]
struct Args {
    /// Output path for the store file
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "48.0")]
    lat_min: f64,

    #[arg(long, default_value = "8.0")]
    lon_min: f64,

    #[arg(long, default_value = "0.01")]
    lat_step: f64,

    #[arg(long, default_value = "0.01")]
    lon_step: f64,

    #[arg(long, default_value = "400")]
    n_lat: u32,

    #[arg(long, default_value = "400")]
    n_lon: u32,

    /// Bytes per tile record
    #[arg(long, default_value = "256")]
    record_size: u32,

    /// Seed for synthetic payload generation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Replace an existing file instead of skipping creation
    #[arg(long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.lat_step <= 0.0 || args.lon_step <= 0.0 {
        return Err("grid steps must be positive".into());
    }
    if args.n_lat == 0 || args.n_lon == 0 {
        return Err("grid counts must be non-zero".into());
    }

    if args.force && args.out.exists() {
        fs::remove_file(&args.out)?;
    }

    let grid = GeoGrid::new(
        args.lat_min,
        args.lon_min,
        args.lat_step,
        args.lon_step,
        args.n_lat,
        args.n_lon,
    );

    let created = tile_store::create(&args.out, &grid, args.record_size, args.seed)?;
    if !created {
        println!("{} already exists, skipped (use --force to replace)", args.out.display());
    }

    let (record_size, n_tiles, header_size) = tile_store::read_header(&args.out)?;
    let file_len = fs::metadata(&args.out)?.len();
    println!("store:       {}", args.out.display());
    println!("tiles:       {n_tiles}");
    println!("record size: {record_size} B");
    println!("file length: {file_len} B (header {header_size} B)");
    Ok(())
}
