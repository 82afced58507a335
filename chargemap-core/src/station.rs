//! Station and charge-point candidates derived from raw features.

use geo::{Coord, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::feature::{ElementKind, RawGeometry, Tags};

/// Tag key and value that mark a charging station.
pub const STATION_TAG: (&str, &str) = ("amenity", "charging_station");

/// Tag key and value that mark an individual charge point.
pub const CHARGE_POINT_TAG: (&str, &str) = ("man_made", "charge_point");

/// Normalised geometry of a station.
///
/// Only [`StationGeometry::Polygon`] has an interior; points and open lines
/// can never contain a charge point.
#[derive(Debug, Clone, PartialEq)]
pub enum StationGeometry {
    /// A single WGS84 position (`x = longitude`, `y = latitude`).
    Point(Coord<f64>),
    /// An open coordinate sequence.
    Line(LineString<f64>),
    /// One or more polygons, each an outer ring with optional holes.
    Polygon(MultiPolygon<f64>),
}

impl StationGeometry {
    /// Position to report for the station, if it has a single one.
    #[must_use]
    pub const fn location(&self) -> Option<Coord<f64>> {
        match self {
            Self::Point(coord) => Some(*coord),
            Self::Line(_) | Self::Polygon(_) => None,
        }
    }
}

/// Recognised station tags. Absent keys stay `None` and serialise as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationTags {
    pub amenity: Option<String>,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub brand: Option<String>,
    pub capacity: Option<String>,
    pub fee: Option<String>,
}

impl StationTags {
    /// Pick the recognised keys out of a free-form tag map.
    #[must_use]
    pub fn from_tags(tags: &Tags) -> Self {
        let pick = |key: &str| tags.get(key).cloned();
        Self {
            amenity: pick("amenity"),
            name: pick("name"),
            operator: pick("operator"),
            brand: pick("brand"),
            capacity: pick("capacity"),
            fee: pick("fee"),
        }
    }
}

/// Recognised charge-point tags. Absent keys stay `None` and serialise as
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargePointTags {
    pub man_made: Option<String>,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub brand: Option<String>,
    pub capacity: Option<String>,
    pub fee: Option<String>,
}

impl ChargePointTags {
    /// Pick the recognised keys out of a free-form tag map.
    #[must_use]
    pub fn from_tags(tags: &Tags) -> Self {
        let pick = |key: &str| tags.get(key).cloned();
        Self {
            man_made: pick("man_made"),
            name: pick("name"),
            operator: pick("operator"),
            brand: pick("brand"),
            capacity: pick("capacity"),
            fee: pick("fee"),
        }
    }
}

/// A feature carrying the station tag.
///
/// The geometry parameter tracks the pipeline stage: the normaliser emits
/// candidates holding the [`RawGeometry`] in the source projection, and the
/// geometry resolver turns them into [`StationGeometry`] in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCandidate<G = StationGeometry> {
    pub id: u64,
    pub kind: ElementKind,
    pub geometry: G,
    pub tags: StationTags,
    pub timestamp: String,
    pub version: u32,
}

impl<G> StationCandidate<G> {
    /// Swap the geometry, keeping every other field.
    #[must_use]
    pub fn with_geometry<H>(self, geometry: H) -> StationCandidate<H> {
        StationCandidate {
            id: self.id,
            kind: self.kind,
            geometry,
            tags: self.tags,
            timestamp: self.timestamp,
            version: self.version,
        }
    }
}

/// Station candidate as emitted by the normaliser.
pub type RawStation = StationCandidate<RawGeometry>;

/// A point feature carrying the charge-point tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePointCandidate {
    pub id: u64,
    /// Position; source projection before resolution, WGS84 afterwards.
    pub point: Coord<f64>,
    pub tags: ChargePointTags,
    pub timestamp: String,
    pub version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn station_tags_keep_only_recognised_keys() {
        let tags = Tags::from([
            ("amenity".into(), "charging_station".into()),
            ("name".into(), "Foo".into()),
            ("socket:type2".into(), "2".into()),
        ]);
        let picked = StationTags::from_tags(&tags);
        assert_eq!(picked.amenity.as_deref(), Some("charging_station"));
        assert_eq!(picked.name.as_deref(), Some("Foo"));
        assert!(picked.operator.is_none());
        assert!(picked.fee.is_none());
    }

    #[rstest]
    fn charge_point_tags_serialise_absent_keys_as_null() {
        let tags = ChargePointTags::from_tags(&Tags::from([(
            "man_made".into(),
            "charge_point".into(),
        )]));
        let json = serde_json::to_string(&tags).expect("serialise tags");
        assert_eq!(
            json,
            r#"{"man_made":"charge_point","name":null,"operator":null,"brand":null,"capacity":null,"fee":null}"#
        );
    }

    #[rstest]
    fn only_points_report_a_location() {
        let point = StationGeometry::Point(Coord { x: 1.0, y: 2.0 });
        let line = StationGeometry::Line(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
        assert_eq!(point.location(), Some(Coord { x: 1.0, y: 2.0 }));
        assert_eq!(line.location(), None);
    }
}
