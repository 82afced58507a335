//! Core aggregation engine for EV charging-station snapshots.
//!
//! Responsibilities:
//! - Normalise raw OpenStreetMap-style features into station and
//!   charge-point candidates.
//! - Resolve station geometry into WGS84 points, lines, or polygons.
//! - Match every charge point to at most one containing station polygon.
//! - Assemble and serialise the nested station → charge-points snapshot.
//!
//! Boundaries:
//! - No I/O. Feature sources and output writers live in `chargemap-data`.
//!
//! Invariants:
//! - A run is a stateless recompute over an immutable [`RawFeatureSet`].
//! - Output ordering does not depend on the number of worker threads.

mod aggregate;
mod error;
mod feature;
mod geometry;
mod index;
mod matcher;
mod normalize;
mod pipeline;
mod projection;
mod station;
mod wire;

pub use aggregate::{AggregatedResult, AggregatedStation, ChargePointRecord, assemble};
pub use error::{Diagnostics, FeatureError, MalformedReason, PipelineError, RingDefect};
pub use feature::{Collection, ElementKind, RawFeature, RawFeatureSet, RawGeometry, Tags};
pub use geometry::{ResolvedStation, resolve_charge_points, resolve_stations, validate_ring};
pub use index::{IndexedStation, StationIndex};
pub use matcher::{MatchTable, match_charge_points};
pub use normalize::{Candidates, normalize};
pub use pipeline::{CancellationToken, Pipeline, aggregate};
pub use projection::{ParseProjectionError, SourceProjection, WEB_MERCATOR_EXTENT};
pub use station::{
    CHARGE_POINT_TAG, ChargePointCandidate, ChargePointTags, RawStation, STATION_TAG,
    StationCandidate, StationGeometry, StationTags,
};
pub use wire::{
    Snapshot, WireChargePoint, WireStation, from_json_slice, to_json_string_pretty, to_json_vec,
};
