//! Tile sources: where raw tile bytes come from.
//!
//! The assembler only sees the [`TileSource`] trait. Two implementations are
//! provided:
//! - [`HttpTileSource`] fetches from an XYZ tile service over HTTP
//! - [`DirectoryTileSource`] reads a local mirror laid out like the service
//!   (`{root}/{tile_type}/{z}/{x}/{y}.{ext}`)
//!
//! Any `Fn(&TileRequest) -> Result<Vec<u8>, FetchError>` closure is also a
//! source, which keeps tests free of network access.
//!
//! ## Thread Safety
//!
//! Sources are shared across the fetch worker pool, so they must be
//! `Send + Sync`. Statistics are kept in atomics.

use crate::{FetchError, Result, ServiceConfig, TileCoord, TileFormat};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tilesurf_metrics::{metric_defs, metrics};
use tracing::trace;

/// Address of one tile in one layer and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest<'a> {
    /// Tile coordinates.
    pub coord: TileCoord,
    /// Layer name, e.g. `std` or `dem`.
    pub tile_type: &'a str,
    /// File format.
    pub format: TileFormat,
}

impl fmt::Display for TileRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.tile_type, self.coord, self.format)
    }
}

/// Something that can return the raw bytes of a tile.
pub trait TileSource: Send + Sync {
    /// Fetch the undecoded tile content.
    fn fetch(&self, request: &TileRequest<'_>) -> std::result::Result<Vec<u8>, FetchError>;
}

impl<F> TileSource for F
where
    F: Fn(&TileRequest<'_>) -> std::result::Result<Vec<u8>, FetchError> + Send + Sync,
{
    fn fetch(&self, request: &TileRequest<'_>) -> std::result::Result<Vec<u8>, FetchError> {
        self(request)
    }
}

/// Download statistics for a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of tiles fetched successfully this session.
    pub tiles_downloaded: usize,
    /// Total bytes fetched this session.
    pub bytes_downloaded: u64,
    /// Number of requests that failed this session.
    pub failures: usize,
}

#[derive(Debug, Default)]
struct StatsCounter {
    tiles: AtomicUsize,
    bytes: AtomicU64,
    failures: AtomicUsize,
}

impl StatsCounter {
    fn record<T: AsRef<[u8]>>(
        &self,
        result: &std::result::Result<T, FetchError>,
    ) {
        match result {
            Ok(bytes) => {
                let len = bytes.as_ref().len() as u64;
                self.tiles.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(len, Ordering::Relaxed);
                metrics::counter!(metric_defs::TILE_BYTES.name).increment(len);
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.tiles.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

/// Blocking HTTP client for an XYZ tile service.
pub struct HttpTileSource {
    /// Service root URL.
    base_url: String,
    /// HTTP client; its timeout bounds every tile request.
    client: reqwest::blocking::Client,
    /// Session statistics.
    stats: StatsCounter,
}

impl fmt::Debug for HttpTileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTileSource {
    /// Create a source for the default service.
    pub fn new() -> Result<Self> {
        Self::with_config(&ServiceConfig::default())
    }

    /// Create a source from a service configuration.
    pub fn with_config(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            stats: StatsCounter::default(),
        })
    }

    /// Service root URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a tile.
    pub fn url(&self, request: &TileRequest<'_>) -> String {
        request
            .coord
            .url(&self.base_url, request.tile_type, request.format.extension())
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        self.stats.snapshot()
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.stats.reset();
    }

    fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, request: &TileRequest<'_>) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.url(request);
        trace!(%url, "GET tile");
        let result = self.download(&url);
        self.stats.record(&result);
        result
    }
}

/// Tiles read from a local directory mirroring the service layout.
#[derive(Debug)]
pub struct DirectoryTileSource {
    root: PathBuf,
    stats: StatsCounter,
}

impl DirectoryTileSource {
    /// Create a source rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            stats: StatsCounter::default(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a tile under the root.
    pub fn tile_path(&self, request: &TileRequest<'_>) -> PathBuf {
        self.root
            .join(request.tile_type)
            .join(request.coord.z.to_string())
            .join(request.coord.x.to_string())
            .join(format!("{}.{}", request.coord.y, request.format.extension()))
    }

    /// Get read statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        self.stats.snapshot()
    }
}

impl TileSource for DirectoryTileSource {
    fn fetch(&self, request: &TileRequest<'_>) -> std::result::Result<Vec<u8>, FetchError> {
        let path = self.tile_path(request);
        trace!(path = %path.display(), "Read tile");
        let result = std::fs::read(&path).map_err(|_| FetchError::NotFound);
        self.stats.record(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tile_type: &str) -> TileRequest<'_> {
        TileRequest {
            coord: TileCoord::new(15, 29102, 12903),
            tile_type,
            format: TileFormat::Txt,
        }
    }

    #[test]
    fn test_http_url() {
        let config = ServiceConfig {
            base_url: "http://tiles.example.com/xyz/".to_string(),
            ..ServiceConfig::default()
        };
        let source = HttpTileSource::with_config(&config).unwrap();
        assert_eq!(source.base_url(), "http://tiles.example.com/xyz");
        assert_eq!(
            source.url(&request("dem")),
            "http://tiles.example.com/xyz/dem/15/29102/12903.txt"
        );
        assert_eq!(source.download_stats(), DownloadStats::default());
    }

    #[test]
    fn test_directory_tile_path() {
        let source = DirectoryTileSource::new("./tiles");
        assert_eq!(
            source.tile_path(&request("dem")),
            PathBuf::from("./tiles/dem/15/29102/12903.txt")
        );
    }

    #[test]
    fn test_directory_missing_tile() {
        let source = DirectoryTileSource::new("/nonexistent/tilesurf");
        assert!(matches!(
            source.fetch(&request("dem")),
            Err(FetchError::NotFound)
        ));
        assert_eq!(source.download_stats().failures, 1);
    }

    #[test]
    fn test_directory_reads_tile() {
        let root = std::env::temp_dir().join(format!("tilesurf-source-{}", std::process::id()));
        let source = DirectoryTileSource::new(&root);
        let path = source.tile_path(&request("dem"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"1,2\n3,4\n").unwrap();

        assert_eq!(source.fetch(&request("dem")).unwrap(), b"1,2\n3,4\n");
        let stats = source.download_stats();
        assert_eq!(stats.tiles_downloaded, 1);
        assert_eq!(stats.bytes_downloaded, 8);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_closure_source() {
        let source = |req: &TileRequest<'_>| -> std::result::Result<Vec<u8>, FetchError> {
            Ok(req.to_string().into_bytes())
        };
        assert_eq!(
            source.fetch(&request("std")).unwrap(),
            b"std/15/29102/12903.txt".to_vec()
        );
    }
}
