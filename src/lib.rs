//! Facade crate for the chargemap snapshot builder.
//!
//! This crate re-exports the core aggregation types and exposes the data
//! sources (Overpass, OSM PBF) and snapshot writers behind the `data`
//! feature.

#![forbid(unsafe_code)]

pub use chargemap_core::{
    AggregatedResult, AggregatedStation, CancellationToken, ChargePointRecord, Diagnostics,
    ElementKind, FeatureError, Pipeline, PipelineError, RawFeature, RawFeatureSet, RawGeometry,
    Snapshot, SourceProjection, Tags, aggregate, from_json_slice, to_json_vec,
};

#[cfg(feature = "data")]
pub use chargemap_data::{
    OsmIngestError, OutputError, OverpassClient, OverpassEndpoint, OverpassError,
    ingest_osm_pbf, write_snapshot,
};
