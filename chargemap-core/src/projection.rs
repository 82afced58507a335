//! Coordinate reference frames accepted from feature sources.
//!
//! Every coordinate is brought into WGS84 (`x = longitude`, `y = latitude`,
//! degrees) before any spatial computation happens.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, MapCoords};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half the width of the Web Mercator plane in metres.
pub const WEB_MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

/// Semi-major axis used by Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Projection the raw coordinates are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceProjection {
    /// EPSG:4326 longitude/latitude in degrees.
    #[default]
    Wgs84,
    /// EPSG:3857 spherical Mercator in metres.
    WebMercator,
}

impl SourceProjection {
    /// Transform one coordinate into WGS84.
    ///
    /// Returns `None` for non-finite input or input outside the projection's
    /// domain.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use chargemap_core::SourceProjection;
    ///
    /// let origin = SourceProjection::WebMercator.to_wgs84(Coord { x: 0.0, y: 0.0 });
    /// assert_eq!(origin, Some(Coord { x: 0.0, y: 0.0 }));
    /// assert_eq!(SourceProjection::Wgs84.to_wgs84(Coord { x: 181.0, y: 0.0 }), None);
    /// ```
    #[must_use]
    pub fn to_wgs84(self, coord: Coord<f64>) -> Option<Coord<f64>> {
        if !(coord.x.is_finite() && coord.y.is_finite()) {
            return None;
        }
        match self {
            Self::Wgs84 => ((-180.0..=180.0).contains(&coord.x)
                && (-90.0..=90.0).contains(&coord.y))
            .then_some(coord),
            Self::WebMercator => {
                let extent = -WEB_MERCATOR_EXTENT..=WEB_MERCATOR_EXTENT;
                if !(extent.contains(&coord.x) && extent.contains(&coord.y)) {
                    return None;
                }
                let lon = (coord.x / EARTH_RADIUS_M).to_degrees();
                let lat = (coord.y / EARTH_RADIUS_M).sinh().atan().to_degrees();
                Some(Coord { x: lon, y: lat })
            }
        }
    }

    /// Transform every coordinate of a geometry, reporting the first one that
    /// fails.
    pub(crate) fn project<G>(self, geometry: &G) -> Result<G::Output, Coord<f64>>
    where
        G: MapCoords<f64, f64>,
    {
        geometry.try_map_coords(move |coord| self.to_wgs84(coord).ok_or(coord))
    }
}

impl fmt::Display for SourceProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wgs84 => "wgs84",
            Self::WebMercator => "web-mercator",
        })
    }
}

/// Error returned when parsing an unknown projection name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown projection '{0}'; expected 'wgs84' or 'web-mercator'")]
pub struct ParseProjectionError(pub String);

impl FromStr for SourceProjection {
    type Err = ParseProjectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "wgs84" | "epsg:4326" => Ok(Self::Wgs84),
            "web-mercator" | "epsg:3857" => Ok(Self::WebMercator),
            _ => Err(ParseProjectionError(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use rstest::rstest;

    fn assert_close(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= 1.0e-9,
            "expected {expected}, got {actual} (|Δ| = {delta})"
        );
    }

    #[rstest]
    fn mercator_edge_maps_to_antimeridian() {
        let coord = SourceProjection::WebMercator
            .to_wgs84(Coord {
                x: WEB_MERCATOR_EXTENT,
                y: 0.0,
            })
            .expect("edge of the plane is valid");
        assert_close(coord.x, 180.0);
        assert_close(coord.y, 0.0);
    }

    #[rstest]
    fn mercator_round_trips_a_known_city() {
        // Zurich, Hauptbahnhof.
        let coord = SourceProjection::WebMercator
            .to_wgs84(Coord {
                x: 949_477.332_823_068,
                y: 6_004_025.912_732_047,
            })
            .expect("valid mercator coordinate");
        assert!((coord.x - 8.5293).abs() < 1.0e-4, "longitude {}", coord.x);
        assert!((coord.y - 47.3782).abs() < 1.0e-4, "latitude {}", coord.y);
    }

    #[rstest]
    #[case(SourceProjection::Wgs84, Coord { x: f64::NAN, y: 0.0 })]
    #[case(SourceProjection::Wgs84, Coord { x: 0.0, y: 90.5 })]
    #[case(SourceProjection::WebMercator, Coord { x: 2.1e7, y: 0.0 })]
    #[case(SourceProjection::WebMercator, Coord { x: 0.0, y: f64::INFINITY })]
    fn rejects_out_of_domain(#[case] projection: SourceProjection, #[case] coord: Coord<f64>) {
        assert_eq!(projection.to_wgs84(coord), None);
    }

    #[rstest]
    fn project_reports_offending_coordinate() {
        let line = LineString::from(vec![(0.0, 0.0), (200.0, 1.0)]);
        let failed = SourceProjection::Wgs84
            .project(&line)
            .expect_err("second vertex is out of range");
        assert_eq!(failed, Coord { x: 200.0, y: 1.0 });
    }

    #[rstest]
    #[case("wgs84", SourceProjection::Wgs84)]
    #[case("EPSG:3857", SourceProjection::WebMercator)]
    #[case("web-mercator", SourceProjection::WebMercator)]
    fn parses_projection_names(#[case] input: &str, #[case] expected: SourceProjection) {
        assert_eq!(input.parse::<SourceProjection>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_projection_name() {
        assert!("utm32".parse::<SourceProjection>().is_err());
    }
}
