//! R\*-tree over station polygons.
//!
//! The tree holds the bounding boxes of every station that can contain
//! charge points. Queries prune by envelope first and then run an exact
//! point-in-polygon test that honours holes and counts boundary points as
//! inside.

use std::cmp::Ordering;

use geo::{Area, BoundingRect, Coord, Intersects, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::geometry::ResolvedStation;
use crate::station::StationGeometry;

/// Polygon entry stored in the tree.
#[derive(Debug, Clone)]
pub struct IndexedStation {
    /// Station id.
    pub id: u64,
    /// Planar area in squared degrees, used for tie-breaking.
    pub area: f64,
    polygon: MultiPolygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl IndexedStation {
    fn new(id: u64, polygon: &MultiPolygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            id,
            area: polygon.unsigned_area(),
            polygon: polygon.clone(),
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }

    /// Exact containment, boundary inclusive.
    #[must_use]
    pub fn contains(&self, point: Coord<f64>) -> bool {
        self.polygon.0.iter().any(|polygon| polygon.intersects(&point))
    }
}

impl RTreeObject for IndexedStation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Smallest area first, then lowest id.
fn ownership_order(a: &IndexedStation, b: &IndexedStation) -> Ordering {
    a.area.total_cmp(&b.area).then(a.id.cmp(&b.id))
}

/// Read-only spatial index answering "which station owns this point?".
#[derive(Debug, Default)]
pub struct StationIndex {
    tree: RTree<IndexedStation>,
}

impl StationIndex {
    /// Index every station flagged as able to contain charge points.
    ///
    /// # Examples
    /// ```
    /// use chargemap_core::StationIndex;
    ///
    /// let index = StationIndex::build(&[]);
    /// assert!(index.is_empty());
    /// ```
    #[must_use]
    pub fn build(stations: &[ResolvedStation]) -> Self {
        let entries: Vec<IndexedStation> = stations
            .iter()
            .filter(|resolved| resolved.can_contain)
            .filter_map(|resolved| match &resolved.station.geometry {
                StationGeometry::Polygon(polygon) => {
                    IndexedStation::new(resolved.station.id, polygon)
                }
                StationGeometry::Point(_) | StationGeometry::Line(_) => None,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns true when no polygon was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of the station that owns `point`, if any.
    ///
    /// Among overlapping polygons the smallest area wins; equal areas fall
    /// back to the lowest id.
    #[must_use]
    pub fn owner_of(&self, point: Coord<f64>) -> Option<u64> {
        let envelope = AABB::from_point([point.x, point.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|station| station.contains(point))
            .min_by(|a, b| ownership_order(a, b))
            .map(|station| station.id)
    }
}
