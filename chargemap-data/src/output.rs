//! Compressed snapshot output.
//!
//! Snapshots are written as compact JSON, gzip-compressed at the best level,
//! and published with an atomic replace so readers never see a partial file.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chargemap_core::{AggregatedResult, to_json_vec};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::debug;
use thiserror::Error;

/// Outcome of a successful snapshot write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotWriteReport {
    /// File that was written.
    pub path: Utf8PathBuf,
    /// Size of the compressed file in bytes.
    pub bytes: u64,
    /// Size of the uncompressed JSON document in bytes.
    pub json_bytes: u64,
}

/// Errors raised while writing output files.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The snapshot could not be serialised.
    #[error("failed to serialise snapshot: {0}")]
    Serialise(#[source] serde_json::Error),
    /// Compression failed.
    #[error("failed to compress snapshot: {0}")]
    Compress(#[source] io::Error),
    /// The file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Serialise, compress, and atomically write a snapshot to `path`.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use chargemap_core::{ElementKind, Pipeline, RawFeature, RawFeatureSet, RawGeometry};
/// use geo::Coord;
///
/// let features = RawFeatureSet {
///     points: vec![RawFeature::new(1, ElementKind::Node, Some(RawGeometry::Point(Coord { x: 8.5, y: 47.4 })))
///         .with_tag("amenity", "charging_station")],
///     ..RawFeatureSet::default()
/// };
/// let result = Pipeline::default().run_at(&features, 0)?;
///
/// let dir = tempfile::tempdir()?;
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("stations.json.gz"))
///     .map_err(|_| "non-UTF-8 temp dir")?;
/// let report = chargemap_data::write_snapshot(&path, &result)?;
/// assert!(report.bytes > 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn write_snapshot(
    path: &Utf8Path,
    result: &AggregatedResult,
) -> Result<SnapshotWriteReport, OutputError> {
    let json = to_json_vec(result).map_err(OutputError::Serialise)?;
    let compressed = gzip(&json).map_err(OutputError::Compress)?;
    write_file(path, &compressed)?;
    debug!(
        "wrote {} stations to {path} ({} bytes, {} uncompressed)",
        result.count(),
        compressed.len(),
        json.len()
    );
    Ok(SnapshotWriteReport {
        path: path.to_path_buf(),
        bytes: len_u64(&compressed),
        json_bytes: len_u64(&json),
    })
}

/// Atomically write raw bytes, such as an intermediate Overpass response.
///
/// # Errors
///
/// Returns [`OutputError::Write`] when the file cannot be replaced.
pub fn write_raw(path: &Utf8Path, bytes: &[u8]) -> Result<u64, OutputError> {
    write_file(path, bytes)?;
    Ok(len_u64(bytes))
}

fn write_file(path: &Utf8Path, bytes: &[u8]) -> Result<(), OutputError> {
    chargemap_fs::write_atomic(path, bytes).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn len_u64(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}
