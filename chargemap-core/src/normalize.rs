//! Entity normaliser: raw feature collections to typed candidates.
//!
//! Stations come from all three collections, charge points only from points.
//! Rows carrying neither tag are ignored. Tagged rows without usable geometry
//! are skipped with a [`FeatureError::Malformed`] diagnostic.

use std::collections::HashMap;

use log::debug;

use crate::error::{Diagnostics, FeatureError, MalformedReason};
use crate::feature::{Collection, RawFeature, RawFeatureSet, RawGeometry};
use crate::station::{
    CHARGE_POINT_TAG, ChargePointCandidate, ChargePointTags, RawStation, StationCandidate,
    StationTags, STATION_TAG,
};

/// Output of the normaliser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    /// Station candidates in scan order (points, then lines, then areas).
    pub stations: Vec<RawStation>,
    /// Charge-point candidates in the order they appear among the points.
    pub charge_points: Vec<ChargePointCandidate>,
}

/// Split the raw collections into station and charge-point candidates.
///
/// Station ids are deduplicated across all three collections and charge-point
/// ids within the points collection. When an id repeats, the later row takes
/// the earlier row's slot and a [`FeatureError::DuplicateId`] is recorded.
pub fn normalize(features: &RawFeatureSet, diagnostics: &mut Diagnostics) -> Candidates {
    let mut stations = Deduplicated::default();
    for (collection, rows) in features.collections() {
        for feature in rows.iter().filter(|f| f.has_tag(STATION_TAG.0, STATION_TAG.1)) {
            match station_geometry(collection, feature) {
                Ok(geometry) => {
                    stations.insert(feature.id, collection, station(feature, geometry), diagnostics);
                }
                Err(reason) => diagnostics.record(malformed(feature, reason)),
            }
        }
    }

    let mut charge_points = Deduplicated::default();
    for feature in features
        .points
        .iter()
        .filter(|f| f.has_tag(CHARGE_POINT_TAG.0, CHARGE_POINT_TAG.1))
    {
        match expect_point(feature) {
            Ok(point) => {
                let candidate = ChargePointCandidate {
                    id: feature.id,
                    point,
                    tags: ChargePointTags::from_tags(&feature.tags),
                    timestamp: feature.timestamp.clone(),
                    version: feature.version,
                };
                charge_points.insert(feature.id, Collection::Points, candidate, diagnostics);
            }
            Err(reason) => diagnostics.record(malformed(feature, reason)),
        }
    }

    let candidates = Candidates {
        stations: stations.into_vec(),
        charge_points: charge_points.into_vec(),
    };
    debug!(
        "Normalised {} rows into {} stations and {} charge points",
        features.len(),
        candidates.stations.len(),
        candidates.charge_points.len()
    );
    candidates
}

fn station(feature: &RawFeature, geometry: RawGeometry) -> RawStation {
    StationCandidate {
        id: feature.id,
        kind: feature.kind,
        geometry,
        tags: StationTags::from_tags(&feature.tags),
        timestamp: feature.timestamp.clone(),
        version: feature.version,
    }
}

fn malformed(feature: &RawFeature, reason: MalformedReason) -> FeatureError {
    FeatureError::Malformed {
        id: feature.id,
        kind: feature.kind,
        reason,
    }
}

fn station_geometry(
    collection: Collection,
    feature: &RawFeature,
) -> Result<RawGeometry, MalformedReason> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(MalformedReason::MissingGeometry)?;
    let expected = match collection {
        Collection::Points => "point",
        Collection::Lines => "line",
        Collection::Areas => "area",
    };
    if geometry.type_name() != expected {
        return Err(MalformedReason::UnexpectedGeometry {
            expected,
            found: geometry.type_name(),
        });
    }
    if geometry.is_empty() {
        return Err(MalformedReason::EmptyGeometry);
    }
    Ok(geometry.clone())
}

fn expect_point(feature: &RawFeature) -> Result<geo::Coord<f64>, MalformedReason> {
    match feature.geometry.as_ref() {
        Some(RawGeometry::Point(coord)) => Ok(*coord),
        Some(other) => Err(MalformedReason::UnexpectedGeometry {
            expected: "point",
            found: other.type_name(),
        }),
        None => Err(MalformedReason::MissingGeometry),
    }
}

/// Ordered collection that keeps one entry per id, later rows winning.
#[derive(Debug)]
struct Deduplicated<T> {
    slots: HashMap<u64, usize>,
    items: Vec<T>,
}

impl<T> Default for Deduplicated<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Deduplicated<T> {
    fn insert(&mut self, id: u64, collection: Collection, item: T, diagnostics: &mut Diagnostics) {
        if let Some(&slot) = self.slots.get(&id) {
            diagnostics.record(FeatureError::DuplicateId { id, collection });
            if let Some(existing) = self.items.get_mut(slot) {
                *existing = item;
            }
            return;
        }
        self.slots.insert(id, self.items.len());
        self.items.push(item);
    }

    fn into_vec(self) -> Vec<T> {
        self.items
    }
}
