//! Geometry resolver.
//!
//! Projects every candidate into WGS84, closes line stations whose first and
//! last vertices coincide into polygons, assembles multipolygon rings, and
//! validates the rings that will take part in containment tests.
//!
//! A station whose polygon has a defective ring keeps its polygon in the
//! output but is marked as unable to contain charge points.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Intersects, Line, LineString, MultiPolygon, Polygon};
use log::debug;

use crate::error::{Diagnostics, FeatureError, RingDefect};
use crate::feature::{ElementKind, RawGeometry};
use crate::projection::SourceProjection;
use crate::station::{ChargePointCandidate, RawStation, StationCandidate, StationGeometry};

/// A station with WGS84 geometry and its eligibility for containment tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStation {
    pub station: StationCandidate,
    /// True only for polygons whose rings are all valid.
    pub can_contain: bool,
}

/// Resolve station geometry. Stations that fail projection are dropped.
pub fn resolve_stations(
    stations: Vec<RawStation>,
    projection: SourceProjection,
    diagnostics: &mut Diagnostics,
) -> Vec<ResolvedStation> {
    let total = stations.len();
    let resolved: Vec<_> = stations
        .into_iter()
        .filter_map(|station| resolve_station(station, projection, diagnostics))
        .collect();
    let polygons = resolved.iter().filter(|s| s.can_contain).count();
    debug!(
        "Resolved {} of {total} stations; {polygons} can contain charge points",
        resolved.len()
    );
    resolved
}

/// Project charge points into WGS84. Charge points that fail projection are
/// dropped.
pub fn resolve_charge_points(
    charge_points: Vec<ChargePointCandidate>,
    projection: SourceProjection,
    diagnostics: &mut Diagnostics,
) -> Vec<ChargePointCandidate> {
    charge_points
        .into_iter()
        .filter_map(|mut candidate| match projection.to_wgs84(candidate.point) {
            Some(point) => {
                candidate.point = point;
                Some(candidate)
            }
            None => {
                diagnostics.record(projection_error(
                    candidate.id,
                    ElementKind::Node,
                    projection,
                    candidate.point,
                ));
                None
            }
        })
        .collect()
}

fn resolve_station(
    station: RawStation,
    projection: SourceProjection,
    diagnostics: &mut Diagnostics,
) -> Option<ResolvedStation> {
    let (id, kind) = (station.id, station.kind);
    let projected = match project_raw(&station.geometry, projection) {
        Ok(projected) => projected,
        Err(coord) => {
            diagnostics.record(projection_error(id, kind, projection, coord));
            return None;
        }
    };

    let (geometry, defect) = match projected {
        RawGeometry::Point(coord) => (StationGeometry::Point(coord), None),
        RawGeometry::Line(line) if is_closed(&line) => {
            let defect = validate_ring(&line).err();
            let polygon = Polygon::new(line, Vec::new());
            (StationGeometry::Polygon(MultiPolygon::new(vec![polygon])), defect)
        }
        RawGeometry::Line(line) => (StationGeometry::Line(line), None),
        RawGeometry::Area { outers, inners } => {
            let (polygons, defect) = assemble_multipolygon(outers, inners);
            (StationGeometry::Polygon(polygons), defect)
        }
    };

    if let Some(defect) = defect {
        diagnostics.record(FeatureError::Geometry { id, kind, defect });
    }
    let can_contain = matches!(geometry, StationGeometry::Polygon(_)) && defect.is_none();
    Some(ResolvedStation {
        station: station.with_geometry(geometry),
        can_contain,
    })
}

fn project_raw(
    geometry: &RawGeometry,
    projection: SourceProjection,
) -> Result<RawGeometry, Coord<f64>> {
    Ok(match geometry {
        RawGeometry::Point(coord) => RawGeometry::Point(projection.to_wgs84(*coord).ok_or(*coord)?),
        RawGeometry::Line(line) => RawGeometry::Line(projection.project(line)?),
        RawGeometry::Area { outers, inners } => RawGeometry::Area {
            outers: project_rings(outers, projection)?,
            inners: project_rings(inners, projection)?,
        },
    })
}

fn project_rings(
    rings: &[LineString<f64>],
    projection: SourceProjection,
) -> Result<Vec<LineString<f64>>, Coord<f64>> {
    rings.iter().map(|ring| projection.project(ring)).collect()
}

fn projection_error(
    id: u64,
    kind: ElementKind,
    projection: SourceProjection,
    coord: Coord<f64>,
) -> FeatureError {
    FeatureError::Projection {
        id,
        kind,
        projection,
        x: coord.x,
        y: coord.y,
    }
}

/// Exact comparison of the first and last vertex.
fn is_closed(line: &LineString<f64>) -> bool {
    match (line.0.first(), line.0.last()) {
        (Some(first), Some(last)) => line.0.len() > 1 && first == last,
        _ => false,
    }
}

/// Build polygons from outer rings and attach each inner ring to the first
/// outer ring that contains its first vertex. Returns the first defect found.
fn assemble_multipolygon(
    outers: Vec<LineString<f64>>,
    inners: Vec<LineString<f64>>,
) -> (MultiPolygon<f64>, Option<RingDefect>) {
    let mut defect = None;
    let mut note = |result: Result<(), RingDefect>| {
        if let Err(found) = result {
            defect.get_or_insert(found);
        }
    };

    let mut shells: Vec<(Polygon<f64>, Vec<LineString<f64>>)> = outers
        .into_iter()
        .filter(|ring| !ring.0.is_empty())
        .map(|ring| {
            note(validate_ring(&ring));
            (Polygon::new(ring, Vec::new()), Vec::new())
        })
        .collect();

    for inner in inners.into_iter().filter(|ring| !ring.0.is_empty()) {
        note(validate_ring(&inner));
        let owner = match inner.0.first() {
            Some(start) => shells.iter_mut().find(|(shell, _)| shell.intersects(start)),
            None => None,
        };
        match owner {
            Some((_, holes)) => holes.push(inner),
            None => note(Err(RingDefect::OrphanInnerRing)),
        }
    }

    let polygons = shells
        .into_iter()
        .map(|(shell, holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, holes)
        })
        .collect();
    (MultiPolygon::new(polygons), defect)
}

/// Check that a ring can bound an area.
///
/// Consecutive repeated vertices are tolerated. The ring must be closed,
/// hold at least four vertices, enclose a non-zero area, and have no edges
/// that cross or overlap other than neighbours sharing a vertex.
pub fn validate_ring(ring: &LineString<f64>) -> Result<(), RingDefect> {
    let mut coords = ring.0.clone();
    coords.dedup();
    if coords.len() < 4 {
        return Err(RingDefect::TooFewCoordinates);
    }
    if coords.first() != coords.last() {
        return Err(RingDefect::Unclosed);
    }

    let edges: Vec<Line<f64>> = LineString::new(coords).lines().collect();
    let twice_area: f64 = edges.iter().map(Line::determinant).sum();
    if twice_area == 0.0 {
        return Err(RingDefect::ZeroArea);
    }
    if has_self_intersection(&edges) {
        return Err(RingDefect::SelfIntersecting);
    }
    Ok(())
}

fn has_self_intersection(edges: &[Line<f64>]) -> bool {
    let count = edges.len();
    edges.iter().enumerate().any(|(i, a)| {
        edges.iter().enumerate().skip(i + 1).any(|(j, b)| {
            let adjacent = j == i + 1 || (i == 0 && j + 1 == count);
            match line_intersection(*a, *b) {
                None => false,
                Some(LineIntersection::Collinear { .. }) => true,
                Some(LineIntersection::SinglePoint { .. }) => !adjacent,
            }
        })
    })
}
