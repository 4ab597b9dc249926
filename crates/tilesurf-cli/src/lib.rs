//! # tilesurf-cli
//!
//! Command-line front end for `tilesurf-region`: resolve a region, assemble
//! it from a tile service or a local mirror, and query its gradient.
//!
//! Every command writes JSON to the given writer. `gradient` writes one JSON
//! object per line, one per query point, so a bad point does not hide the
//! others.

mod error;

pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tilesurf_region::{
    build_region, AssembleOptions, CancelToken, DirectoryTileSource, DownloadStats,
    HttpTileSource, Region, RegionDescriptor, ServiceConfig, Surface, TileCoord, TileMatrix,
    TileSource, MAX_ZOOM,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tilesurf", version)]
#[command(about = "Assemble XYZ map tiles into a surface and query its gradient", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assemble a region and print its shape and fallbacks
    Region(RegionArgs),
    /// Assemble a region and query the gradient at one or more points
    Gradient(GradientArgs),
    /// Print the tiles a region covers without fetching them
    Tiles(RegionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RegionArgs {
    /// Top-left tile as z/x/y
    #[arg(long, value_parser = parse_tile)]
    pub from: TileCoord,

    /// Bottom-right tile as z/x/y (defaults to --from)
    #[arg(long, value_parser = parse_tile)]
    pub to: Option<TileCoord>,

    /// Target zoom (defaults to the zoom of --from)
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Tile type path segment, e.g. std or dem
    #[arg(long, default_value = "std")]
    pub tile_type: String,

    /// Tile file extension: png, jpg or txt
    #[arg(long, default_value = "png")]
    pub ext: String,

    /// YAML service configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read tiles from a local directory laid out as {type}/{z}/{x}/{y}.{ext}
    #[arg(long)]
    pub tiles_dir: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the number of fetch threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Override the tile edge length in samples
    #[arg(long)]
    pub tile_size: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct GradientArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// Query point as X,Y in surface sample coordinates (repeatable)
    #[arg(long = "at", value_parser = parse_point, required = true)]
    pub points: Vec<(f64, f64)>,

    /// Channel to query (0 for elevation, 0-2 for RGB)
    #[arg(long, default_value_t = 0)]
    pub channel: usize,
}

impl RegionArgs {
    /// The region these arguments describe.
    pub fn descriptor(&self) -> Result<RegionDescriptor> {
        let mut descriptor =
            RegionDescriptor::with_extension(self.from, self.tile_type.clone(), &self.ext)?;
        if let Some(to) = self.to {
            descriptor = descriptor.with_to(to);
        }
        if let Some(zoom) = self.zoom {
            descriptor = descriptor.with_zoom(zoom);
        }
        Ok(descriptor)
    }

    /// Service configuration from `--config` with flag overrides applied.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }

        if config.tile_size == 0 {
            return Err(CliError::Config("tile_size must be at least 1".to_string()));
        }
        Ok(config)
    }
}

/// Where tiles are read from.
enum Source {
    Http(HttpTileSource),
    Directory(DirectoryTileSource),
}

impl Source {
    fn open(args: &RegionArgs, config: &ServiceConfig) -> Result<Self> {
        Ok(match &args.tiles_dir {
            Some(dir) => Source::Directory(DirectoryTileSource::new(dir)),
            None => Source::Http(HttpTileSource::with_config(config)?),
        })
    }

    fn as_tile_source(&self) -> &dyn TileSource {
        match self {
            Source::Http(source) => source,
            Source::Directory(source) => source,
        }
    }

    fn download_stats(&self) -> DownloadStats {
        match self {
            Source::Http(source) => source.download_stats(),
            Source::Directory(source) => source.download_stats(),
        }
    }
}

/// Summary printed by `tilesurf region`.
#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub tile_type: String,
    pub ext: String,
    pub zoom: u8,
    pub from: String,
    pub to: String,
    pub rows: usize,
    pub columns: usize,
    pub shape: Vec<usize>,
    pub tiles: usize,
    pub fetched: usize,
    pub fallbacks: Vec<FallbackSummary>,
}

#[derive(Debug, Serialize)]
pub struct FallbackSummary {
    pub tile: String,
    pub row: usize,
    pub column: usize,
    pub reason: String,
}

impl RegionSummary {
    pub fn new(region: &Region) -> Self {
        let descriptor = region.descriptor();
        let matrix = region.matrix();
        let report = region.report();
        Self {
            tile_type: descriptor.tile_type().to_string(),
            ext: descriptor.format().extension().to_string(),
            zoom: matrix.zoom(),
            from: descriptor.from_tile().to_string(),
            to: descriptor.to_tile().to_string(),
            rows: matrix.rows(),
            columns: matrix.columns(),
            shape: region.surface().shape(),
            tiles: report.tiles,
            fetched: report.fetched,
            fallbacks: report
                .fallbacks
                .iter()
                .map(|f| FallbackSummary {
                    tile: f.tile.to_string(),
                    row: f.row,
                    column: f.column,
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }
}

/// Resolved tile matrix printed by `tilesurf tiles`.
#[derive(Debug, Serialize)]
pub struct TilesSummary {
    pub zoom: u8,
    pub rows: usize,
    pub columns: usize,
    /// `z/x/y` per tile, north to south then west to east.
    pub tiles: Vec<Vec<String>>,
    /// Service URL per tile, row-major.
    pub urls: Vec<String>,
}

impl TilesSummary {
    pub fn new(matrix: &TileMatrix, descriptor: &RegionDescriptor, config: &ServiceConfig) -> Self {
        let ext = descriptor.format().extension();
        Self {
            zoom: matrix.zoom(),
            rows: matrix.rows(),
            columns: matrix.columns(),
            tiles: matrix
                .to_rows()
                .iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
            urls: matrix
                .tiles()
                .map(|tile| tile.url(&config.base_url, descriptor.tile_type(), ext))
                .collect(),
        }
    }
}

/// One gradient query and its outcome.
#[derive(Debug, Serialize)]
pub struct GradientQuery {
    pub x: f64,
    pub y: f64,
    pub channel: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GradientQuery {
    /// Evaluate the gradient of `channel` at `(x, y)`.
    pub fn evaluate(surface: &Surface, channel: usize, x: f64, y: f64) -> Self {
        let mut query = Self {
            x,
            y,
            channel,
            gx: None,
            gy: None,
            magnitude: None,
            direction: None,
            error: None,
        };
        match surface.channel_gradient(channel, x, y) {
            Ok(g) => {
                query.gx = Some(g.gx);
                query.gy = Some(g.gy);
                query.magnitude = Some(g.magnitude());
                query.direction = Some(g.direction());
            }
            Err(e) => query.error = Some(e.to_string()),
        }
        query
    }
}

/// Parse a `z/x/y` tile argument.
pub fn parse_tile(s: &str) -> std::result::Result<TileCoord, String> {
    s.parse::<TileCoord>().map_err(|e| e.to_string())
}

/// Parse an `X,Y` point argument.
pub fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("invalid X in '{}'", s))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("invalid Y in '{}'", s))?;
    Ok((x, y))
}

/// Install the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` is honored unless `-v` was given; the default level is `info`.
pub fn init_logging(verbose: u8) -> Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Run a parsed command, writing its JSON output to `out`.
pub fn run<W: Write>(cli: &Cli, cancel: &CancelToken, out: &mut W) -> Result<()> {
    match &cli.command {
        Command::Region(args) => {
            let region = build(args, cancel)?;
            serde_json::to_writer_pretty(&mut *out, &RegionSummary::new(&region))?;
            writeln!(out)?;
        }
        Command::Gradient(args) => {
            let region = build(&args.region, cancel)?;
            for &(x, y) in &args.points {
                let query = GradientQuery::evaluate(region.surface(), args.channel, x, y);
                serde_json::to_writer(&mut *out, &query)?;
                writeln!(out)?;
            }
        }
        Command::Tiles(args) => {
            let descriptor = args.descriptor()?;
            let config = args.service_config()?;
            let matrix = descriptor.resolve(config.max_zoom.min(MAX_ZOOM))?;
            serde_json::to_writer_pretty(
                &mut *out,
                &TilesSummary::new(&matrix, &descriptor, &config),
            )?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn build(args: &RegionArgs, cancel: &CancelToken) -> Result<Region> {
    let descriptor = args.descriptor()?;
    let config = args.service_config()?;
    let options = AssembleOptions::from_config(&config).with_cancel(cancel.clone());
    let source = Source::open(args, &config)?;

    let region = build_region(&descriptor, source.as_tile_source(), &options)?;

    let stats = source.download_stats();
    info!(
        tiles = stats.tiles_downloaded,
        bytes = stats.bytes_downloaded,
        failures = stats.failures,
        "Download statistics"
    );
    Ok(region)
}
