//! Test helpers: a canned Overpass source and snapshot readers.

use super::*;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use chargemap_core::{Snapshot, from_json_slice};
use flate2::read::GzDecoder;
use tempfile::TempDir;

use crate::fetch::{FetchConfig, OverpassSource};

/// Overpass response with one station way around a single charge point.
pub(super) const STATION_RESPONSE: &str = r#"{
  "version": 0.6,
  "generator": "Overpass API",
  "elements": [
    {"type": "node", "id": 42, "lat": 47.5, "lon": 8.5, "version": 1,
     "timestamp": "2024-02-01T09:00:00Z", "tags": {"man_made": "charge_point"}},
    {"type": "way", "id": 500, "nodes": [1, 2, 3, 4, 1], "version": 3,
     "timestamp": "2024-01-01T00:00:00Z",
     "geometry": [{"lat": 47.4, "lon": 8.4}, {"lat": 47.4, "lon": 8.6},
                  {"lat": 47.6, "lon": 8.6}, {"lat": 47.6, "lon": 8.4},
                  {"lat": 47.4, "lon": 8.4}],
     "tags": {"amenity": "charging_station", "name": "Depot"}}
  ]
}"#;

/// Returns a fixed body instead of querying a server.
pub(super) struct StubOverpassSource(pub(super) &'static str);

impl OverpassSource for StubOverpassSource {
    fn download(&self, _config: &FetchConfig) -> Result<Vec<u8>, CliError> {
        Ok(self.0.as_bytes().to_vec())
    }
}

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, bytes: &[u8]) -> Utf8PathBuf {
        let path = self.path(name);
        std::fs::write(&path, bytes).expect("write workspace file");
        path
    }
}

pub(super) fn read_snapshot(path: &Utf8Path) -> Snapshot {
    let compressed = std::fs::read(path).expect("snapshot written");
    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .expect("valid gzip");
    from_json_slice(&json).expect("valid snapshot JSON")
}
