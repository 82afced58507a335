//! Feature sources and output writers for the chargemap engine.
//!
//! Responsibilities:
//! - Download charging infrastructure from an Overpass API endpoint and
//!   decode it into a [`chargemap_core::RawFeatureSet`].
//! - Read the same features from an OpenStreetMap PBF extract.
//! - Write compressed snapshots and raw intermediate files.
//!
//! Boundaries:
//! - Do not encode domain rules (live in `chargemap-core`).
//! - Blocking facades only; async clients stay internal.
//!
//! Invariants:
//! - Output files are replaced atomically.
//! - No global mutable state.

mod ingest;
mod output;
mod overpass;
mod rings;

pub use ingest::{
    OsmIngestError, OsmIngestReport, OsmIngestSummary, ingest_osm_pbf, ingest_osm_pbf_report,
};
pub use output::{OutputError, SnapshotWriteReport, write_raw, write_snapshot};
pub use overpass::{
    DEFAULT_USER_AGENT, LatLon, Member, OverpassClient, OverpassClientConfig, OverpassElement,
    OverpassEndpoint, OverpassError, OverpassResponse, ParseEndpointError, SWITZERLAND_URL,
    WORLD_URL, build_query, parse_response,
};
