//! Serializer for the published JSON snapshot.
//!
//! Field order in the structs below is the key order on the wire.

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedResult, AggregatedStation, ChargePointRecord};
use crate::feature::ElementKind;
use crate::station::{ChargePointTags, StationTags};

/// Top-level envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix seconds at which the snapshot was aggregated.
    pub timestamp: u64,
    /// Number of entries in `elements`.
    pub count: usize,
    pub elements: Vec<WireStation>,
}

/// A station as published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireStation {
    pub id: u64,
    /// Latitude for point stations, `null` otherwise.
    pub lat: Option<f64>,
    /// Longitude for point stations, `null` otherwise.
    pub lon: Option<f64>,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub timestamp: String,
    pub version: u32,
    pub tags: StationTags,
    pub charge_points: Option<Vec<WireChargePoint>>,
}

/// A charge point nested inside a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChargePoint {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub timestamp: String,
    pub version: u32,
    pub tags: ChargePointTags,
}

impl From<&ChargePointRecord> for WireChargePoint {
    fn from(record: &ChargePointRecord) -> Self {
        Self {
            id: record.id,
            lat: record.point.y,
            lon: record.point.x,
            kind: ElementKind::Node,
            timestamp: record.timestamp.clone(),
            version: record.version,
            tags: record.tags.clone(),
        }
    }
}

impl From<&AggregatedStation> for WireStation {
    fn from(station: &AggregatedStation) -> Self {
        let location = station.geometry.location();
        Self {
            id: station.id,
            lat: location.map(|coord| coord.y),
            lon: location.map(|coord| coord.x),
            kind: station.kind,
            timestamp: station.timestamp.clone(),
            version: station.version,
            tags: station.tags.clone(),
            charge_points: station
                .charge_points
                .as_ref()
                .map(|records| records.iter().map(WireChargePoint::from).collect()),
        }
    }
}

impl From<&AggregatedResult> for Snapshot {
    fn from(result: &AggregatedResult) -> Self {
        let elements: Vec<WireStation> = result.stations.iter().map(WireStation::from).collect();
        Self {
            timestamp: result.timestamp,
            count: elements.len(),
            elements,
        }
    }
}

/// Render the snapshot as compact JSON.
///
/// # Examples
/// ```
/// use chargemap_core::{ElementKind, Pipeline, RawFeature, RawFeatureSet, RawGeometry};
/// use geo::Coord;
///
/// let station = RawFeature::new(
///     1,
///     ElementKind::Node,
///     Some(RawGeometry::Point(Coord { x: 8.5, y: 47.4 })),
/// )
/// .with_tag("amenity", "charging_station");
/// let set = RawFeatureSet {
///     points: vec![station],
///     ..RawFeatureSet::default()
/// };
/// let result = Pipeline::default().run_at(&set, 0)?;
/// let json = String::from_utf8(chargemap_core::to_json_vec(&result)?)?;
/// assert!(json.starts_with(r#"{"timestamp":0,"count":1,"elements":[{"id":1,"lat":47.4"#));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn to_json_vec(result: &AggregatedResult) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&Snapshot::from(result))
}

/// Render the snapshot as indented JSON.
pub fn to_json_string_pretty(result: &AggregatedResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Snapshot::from(result))
}

/// Parse a published snapshot.
pub fn from_json_slice(bytes: &[u8]) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_slice(bytes)
}
