//! Raw features handed to the pipeline by a feature source.
//!
//! A [`RawFeature`] is an immutable snapshot of one OpenStreetMap element as
//! reported by the source: its identifier, element kind, geometry in the
//! source projection, free-form tags, and edit metadata. Sources deliver them
//! in three disjoint collections grouped by geometry type ([`RawFeatureSet`]).

use std::collections::HashMap;
use std::fmt;

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// OpenStreetMap-style free-form key/value tags.
pub type Tags = HashMap<String, String>;

/// OpenStreetMap element kind a feature originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A single node.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A relation, typically a multipolygon.
    Relation,
}

impl ElementKind {
    /// Lowercase name as used in OpenStreetMap payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry of a raw feature, in the source projection.
///
/// Coordinates use `x` for the easting or longitude and `y` for the northing
/// or latitude.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// A single position.
    Point(Coord<f64>),
    /// An ordered coordinate sequence, closed or open.
    Line(LineString<f64>),
    /// Rings of a multipolygon, split by role. Rings are kept exactly as the
    /// source delivered them so that unclosed rings remain detectable.
    Area {
        /// Outer boundaries.
        outers: Vec<LineString<f64>>,
        /// Holes, not yet assigned to an outer ring.
        inners: Vec<LineString<f64>>,
    },
}

impl RawGeometry {
    /// Short name of the geometry type for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Line(_) => "line",
            Self::Area { .. } => "area",
        }
    }

    /// Returns true when the geometry carries no coordinates to work with.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(_) => false,
            Self::Line(line) => line.0.is_empty(),
            Self::Area { outers, .. } => outers.iter().all(|ring| ring.0.is_empty()),
        }
    }
}

/// One element of the source snapshot.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use chargemap_core::{ElementKind, RawFeature, RawGeometry};
///
/// let feature = RawFeature::new(7, ElementKind::Node, Some(RawGeometry::Point(Coord { x: 8.5, y: 47.4 })))
///     .with_tag("amenity", "charging_station")
///     .with_meta("2024-03-01T10:00:00Z", 3);
///
/// assert!(feature.has_tag("amenity", "charging_station"));
/// assert_eq!(feature.version, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Identifier, unique within one run.
    pub id: u64,
    /// Element kind the feature was read from.
    pub kind: ElementKind,
    /// Geometry in the source projection; `None` when the source could not
    /// supply it.
    pub geometry: Option<RawGeometry>,
    /// Free-form tags.
    pub tags: Tags,
    /// Last-modified instant as reported by the source (ISO 8601).
    pub timestamp: String,
    /// Edit version.
    pub version: u32,
    /// Editor identity.
    pub user: Option<String>,
}

impl RawFeature {
    /// Construct a feature without tags or edit metadata.
    #[must_use]
    pub fn new(id: u64, kind: ElementKind, geometry: Option<RawGeometry>) -> Self {
        Self {
            id,
            kind,
            geometry,
            tags: Tags::new(),
            timestamp: String::new(),
            version: 0,
            user: None,
        }
    }

    /// Add or replace a single tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replace the tag map.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Set the timestamp and version.
    #[must_use]
    pub fn with_meta(mut self, timestamp: impl Into<String>, version: u32) -> Self {
        self.timestamp = timestamp.into();
        self.version = version;
        self
    }

    /// Set the editor identity.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Look up a tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns true when `key` is present with exactly `value`.
    #[must_use]
    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }
}

/// Which of the three source collections a feature came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Point features.
    Points,
    /// Line features.
    Lines,
    /// Polygonal area features.
    Areas,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Areas => "areas",
        })
    }
}

/// The full input snapshot of one run, split by geometry type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeatureSet {
    /// Point features (nodes).
    pub points: Vec<RawFeature>,
    /// Line features (ways).
    pub lines: Vec<RawFeature>,
    /// Polygonal area features (multipolygons).
    pub areas: Vec<RawFeature>,
}

impl RawFeatureSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.areas.len()
    }

    /// Returns true when no collection holds any row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.areas.is_empty()
    }

    /// Iterate the collections in scan order: points, lines, areas.
    pub fn collections(&self) -> impl Iterator<Item = (Collection, &[RawFeature])> {
        [
            (Collection::Points, self.points.as_slice()),
            (Collection::Lines, self.lines.as_slice()),
            (Collection::Areas, self.areas.as_slice()),
        ]
        .into_iter()
    }
}
