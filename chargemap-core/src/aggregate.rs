//! Aggregator: nests matched charge points under their stations.

use std::collections::HashMap;

use geo::Coord;
use log::info;

use crate::error::Diagnostics;
use crate::feature::ElementKind;
use crate::geometry::ResolvedStation;
use crate::matcher::MatchTable;
use crate::station::{ChargePointCandidate, ChargePointTags, StationGeometry, StationTags};

/// A charge point attached to a station.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePointRecord {
    pub id: u64,
    /// WGS84 position.
    pub point: Coord<f64>,
    pub timestamp: String,
    pub version: u32,
    pub tags: ChargePointTags,
}

impl From<ChargePointCandidate> for ChargePointRecord {
    fn from(candidate: ChargePointCandidate) -> Self {
        Self {
            id: candidate.id,
            point: candidate.point,
            timestamp: candidate.timestamp,
            version: candidate.version,
            tags: candidate.tags,
        }
    }
}

/// A station with the charge points its polygon contains.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedStation {
    pub id: u64,
    pub kind: ElementKind,
    pub geometry: StationGeometry,
    pub timestamp: String,
    pub version: u32,
    pub tags: StationTags,
    /// `None` unless at least one charge point matched.
    pub charge_points: Option<Vec<ChargePointRecord>>,
}

/// Output of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    /// Unix seconds at which aggregation ran.
    pub timestamp: u64,
    /// Stations sorted by ascending id.
    pub stations: Vec<AggregatedStation>,
    /// Issues recovered during the run.
    pub diagnostics: Diagnostics,
}

impl AggregatedResult {
    /// Number of stations. Nested charge points do not count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.stations.len()
    }

    /// Total number of charge points attached to any station.
    #[must_use]
    pub fn charge_point_count(&self) -> usize {
        self.stations
            .iter()
            .filter_map(|station| station.charge_points.as_ref())
            .map(Vec::len)
            .sum()
    }
}

/// Group charge points under their owning stations.
///
/// `owners` must be aligned with `charge_points`. Charge points keep their
/// input order inside each group; unmatched ones are listed in
/// [`Diagnostics::unmatched_charge_points`] and left out of the result.
pub fn assemble(
    stations: Vec<ResolvedStation>,
    charge_points: Vec<ChargePointCandidate>,
    owners: &MatchTable,
    timestamp: u64,
    mut diagnostics: Diagnostics,
) -> AggregatedResult {
    let mut groups: HashMap<u64, Vec<ChargePointRecord>> = HashMap::new();
    for (candidate, owner) in charge_points.into_iter().zip(owners.iter()) {
        match owner {
            Some(station) => groups.entry(station).or_default().push(candidate.into()),
            None => diagnostics.unmatched_charge_points.push(candidate.id),
        }
    }
    if !diagnostics.unmatched_charge_points.is_empty() {
        info!(
            "{} charge points lie outside every station polygon and were left out",
            diagnostics.unmatched_charge_points.len()
        );
    }

    let mut stations: Vec<AggregatedStation> = stations
        .into_iter()
        .map(|resolved| {
            let station = resolved.station;
            AggregatedStation {
                charge_points: groups.remove(&station.id).filter(|group| !group.is_empty()),
                id: station.id,
                kind: station.kind,
                geometry: station.geometry,
                timestamp: station.timestamp,
                version: station.version,
                tags: station.tags,
            }
        })
        .collect();
    stations.sort_unstable_by_key(|station| station.id);

    let result = AggregatedResult {
        timestamp,
        stations,
        diagnostics,
    };
    info!(
        "Aggregated {} stations carrying {} charge points",
        result.count(),
        result.charge_point_count()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationCandidate;
    use rstest::rstest;

    fn station(id: u64) -> ResolvedStation {
        ResolvedStation {
            station: StationCandidate {
                id,
                kind: ElementKind::Node,
                geometry: StationGeometry::Point(Coord { x: 0.0, y: 0.0 }),
                tags: StationTags::default(),
                timestamp: "2024-01-01T00:00:00Z".into(),
                version: 1,
            },
            can_contain: false,
        }
    }

    fn charge_point(id: u64) -> ChargePointCandidate {
        ChargePointCandidate {
            id,
            point: Coord { x: 0.0, y: 0.0 },
            tags: ChargePointTags::default(),
            timestamp: String::new(),
            version: 1,
        }
    }

    fn table(owners: Vec<Option<u64>>) -> MatchTable {
        owners.into_iter().collect()
    }

    #[rstest]
    fn groups_preserve_scan_order_and_sort_stations() {
        let result = assemble(
            vec![station(30), station(10), station(20)],
            vec![charge_point(3), charge_point(1), charge_point(2), charge_point(4)],
            &table(vec![Some(10), Some(10), None, Some(30)]),
            1_700_000_000,
            Diagnostics::default(),
        );

        let ids: Vec<_> = result.stations.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        let nested: Vec<_> = result.stations[0]
            .charge_points
            .as_ref()
            .expect("station 10 has charge points")
            .iter()
            .map(|cp| cp.id)
            .collect();
        assert_eq!(nested, vec![3, 1]);
        assert!(result.stations[1].charge_points.is_none());
        assert_eq!(result.diagnostics.unmatched_charge_points, vec![2]);
        assert_eq!(result.count(), 3);
        assert_eq!(result.charge_point_count(), 3);
        assert_eq!(result.timestamp, 1_700_000_000);
    }
}
