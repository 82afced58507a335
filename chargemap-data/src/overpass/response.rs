//! Overpass API JSON response types.
//!
//! Decodes the `[out:json]` format produced by `out meta geom qt;`. Ways and
//! relation members carry their node positions inline in `geometry`, so no
//! second lookup is needed to build feature geometry.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL#out>

use chargemap_core::{ElementKind, RawFeature, RawFeatureSet, RawGeometry, Tags};
use geo::{Coord, LineString};
use log::{debug, warn};
use serde::Deserialize;

use super::OverpassError;
use crate::rings::RingMembers;

/// Top-level Overpass response.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    /// Overpass output format version.
    #[serde(default)]
    pub version: Option<f64>,
    /// Server software banner.
    #[serde(default)]
    pub generator: Option<String>,
    /// Server message, typically set when a query timed out or failed.
    #[serde(default)]
    pub remark: Option<String>,
    /// Returned OSM elements.
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// One OSM element as returned by Overpass.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// OSM identifier.
    pub id: u64,
    /// Node latitude.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Node longitude.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Way geometry; `null` entries stand for nodes outside the result.
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
    /// Relation members.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Last edit instant (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Edit version.
    #[serde(default)]
    pub version: Option<u32>,
    /// Last editor.
    #[serde(default)]
    pub user: Option<String>,
    /// Element tags.
    #[serde(default)]
    pub tags: Tags,
}

/// Relation member reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    /// Member element type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Referenced element id.
    #[serde(rename = "ref")]
    pub reference: u64,
    /// Member role, e.g. `outer` or `inner`.
    #[serde(default)]
    pub role: String,
    /// Inline geometry for way members.
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(position: LatLon) -> Self {
        Self {
            x: position.lon,
            y: position.lat,
        }
    }
}

/// Decode an Overpass response body.
///
/// A response without elements is an error: Overpass reports failures such
/// as timeouts or memory exhaustion as an empty result with a `remark`.
///
/// # Examples
/// ```
/// use chargemap_data::{OverpassError, parse_response};
///
/// let body = br#"{"version":0.6,"elements":[],"remark":"runtime error: Query timed out"}"#;
/// let error = parse_response(body).expect_err("no elements");
/// assert!(matches!(error, OverpassError::Empty { remark: Some(_) }));
/// ```
pub fn parse_response(bytes: &[u8]) -> Result<OverpassResponse, OverpassError> {
    let response: OverpassResponse =
        serde_json::from_slice(bytes).map_err(|source| OverpassError::Decode { source })?;
    if response.elements.is_empty() {
        return Err(OverpassError::Empty {
            remark: response.remark,
        });
    }
    if let Some(remark) = &response.remark {
        warn!("Overpass returned a partial result: {remark}");
    }
    Ok(response)
}

impl OverpassResponse {
    /// Route elements into the three feature collections: nodes to points,
    /// ways to lines, and relations to areas.
    #[must_use]
    pub fn into_feature_set(self) -> RawFeatureSet {
        let mut features = RawFeatureSet::new();
        for element in self.elements {
            let kind = element.kind;
            let feature = element.into_feature();
            match kind {
                ElementKind::Node => features.points.push(feature),
                ElementKind::Way => features.lines.push(feature),
                ElementKind::Relation => features.areas.push(feature),
            }
        }
        debug!(
            "Decoded {} nodes, {} ways and {} relations",
            features.points.len(),
            features.lines.len(),
            features.areas.len()
        );
        features
    }
}

impl OverpassElement {
    fn into_feature(self) -> RawFeature {
        let geometry = match self.kind {
            ElementKind::Node => self
                .lat
                .zip(self.lon)
                .map(|(lat, lon)| RawGeometry::Point(Coord { x: lon, y: lat })),
            ElementKind::Way => self
                .geometry
                .and_then(resolve_positions)
                .map(|coords| RawGeometry::Line(LineString::new(coords))),
            ElementKind::Relation => relation_area(self.id, &self.members),
        };
        let mut feature = RawFeature::new(self.id, self.kind, geometry)
            .with_tags(self.tags)
            .with_meta(
                self.timestamp.unwrap_or_default(),
                self.version.unwrap_or_default(),
            );
        feature.user = self.user;
        feature
    }
}

/// Every position must be present; a gap leaves the geometry undefined.
fn resolve_positions(positions: Vec<Option<LatLon>>) -> Option<Vec<Coord<f64>>> {
    if positions.is_empty() {
        return None;
    }
    positions
        .into_iter()
        .map(|position| position.map(Coord::from))
        .collect()
}

fn relation_area(id: u64, members: &[Member]) -> Option<RawGeometry> {
    let mut rings = RingMembers::default();
    for member in members.iter().filter(|m| m.kind == ElementKind::Way) {
        let coords = member.geometry.clone().and_then(resolve_positions);
        match coords {
            Some(coords) => rings.push(&member.role, coords),
            None => {
                debug!("relation {id}: way member {} has no geometry", member.reference);
                return None;
            }
        }
    }
    let area = rings.into_area();
    if area.is_none() {
        debug!("relation {id}: member ways do not form closed rings");
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn decodes_node_with_meta() {
        let body = br#"{"elements":[{"type":"node","id":42,"lat":47.5,"lon":8.25,
            "timestamp":"2024-01-02T03:04:05Z","version":7,"user":"mapper",
            "tags":{"amenity":"charging_station"}}]}"#;
        let features = parse_response(body).expect("decodes").into_feature_set();
        let node = &features.points[0];
        assert_eq!(node.id, 42);
        assert_eq!(node.geometry, Some(RawGeometry::Point(Coord { x: 8.25, y: 47.5 })));
        assert_eq!(node.timestamp, "2024-01-02T03:04:05Z");
        assert_eq!(node.version, 7);
        assert_eq!(node.user.as_deref(), Some("mapper"));
    }

    #[rstest]
    fn way_with_missing_node_has_no_geometry() {
        let body = br#"{"elements":[{"type":"way","id":5,
            "geometry":[{"lat":1.0,"lon":2.0},null],"tags":{}}]}"#;
        let features = parse_response(body).expect("decodes").into_feature_set();
        assert_eq!(features.lines[0].geometry, None);
    }

    #[rstest]
    fn non_way_relation_members_are_ignored() {
        let body = br#"{"elements":[{"type":"relation","id":9,"members":[
            {"type":"node","ref":1,"role":"label"},
            {"type":"way","ref":2,"role":"outer","geometry":[
                {"lat":0.0,"lon":0.0},{"lat":0.0,"lon":1.0},{"lat":1.0,"lon":1.0},{"lat":0.0,"lon":0.0}]}
        ],"tags":{"amenity":"charging_station"}}]}"#;
        let features = parse_response(body).expect("decodes").into_feature_set();
        assert!(matches!(
            features.areas[0].geometry,
            Some(RawGeometry::Area { ref outers, .. }) if outers.len() == 1
        ));
    }

    #[rstest]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            parse_response(b"<html>busy</html>"),
            Err(OverpassError::Decode { .. })
        ));
    }
}
