//! Example: Query the terrain gradient at a point.
//!
//! Usage: cargo run --example query_gradient -- <lat> <lon> [zoom]

use std::env;
use std::time::Instant;
use tilesurf_region::{
    build_region, AssembleOptions, HttpTileSource, RegionDescriptor, TileCoord, TileFormat,
};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [zoom]", args[0]);
        eprintln!("Example: {} 35.3606 138.7274 14", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let zoom: u8 = args.get(3).map(|s| s.parse().expect("Invalid zoom")).unwrap_or(14);

    let tile = TileCoord::from_lat_lon(lat, lon, zoom).expect("Invalid coordinate");
    let (min_lat, max_lat, min_lon, max_lon) = tile.bounds();
    println!("Tile {} covers lat {:.4}° to {:.4}°, lon {:.4}° to {:.4}°", tile, min_lat, max_lat, min_lon, max_lon);

    let source = HttpTileSource::new().expect("Failed to create HTTP client");
    let descriptor = RegionDescriptor::new(tile, "dem", TileFormat::Txt);

    let start = Instant::now();
    let region = match build_region(&descriptor, &source, &AssembleOptions::default()) {
        Ok(region) => region,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "Fetched {:?} samples in {:.2}s ({} bytes)",
        region.surface().shape(),
        start.elapsed().as_secs_f64(),
        source.download_stats().bytes_downloaded
    );
    if !region.report().is_complete() {
        println!("Tile unavailable, surface is zero-filled");
    }

    // Position of the point inside the tile, in samples
    let surface = region.surface();
    let x = (lon - min_lon) / (max_lon - min_lon) * surface.width() as f64;
    let y = (max_lat - lat) / (max_lat - min_lat) * surface.height() as f64;

    match surface.gradient(x, y) {
        Ok(g) => println!(
            "Gradient at ({:.2}, {:.2}): gx={:.2} gy={:.2} |g|={:.2} dir={:.3} rad",
            x,
            y,
            g.gx,
            g.gy,
            g.magnitude(),
            g.direction()
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
