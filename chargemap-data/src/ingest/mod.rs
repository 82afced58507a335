//! OpenStreetMap PBF extract as a feature source.
//!
//! Reads stations and charge points straight from a `.osm.pbf` file instead
//! of querying Overpass. Coordinates in PBF files are always WGS84.

use std::path::{Path, PathBuf};

use chargemap_core::RawFeatureSet;
use geo::{Coord, Rect};
use log::{info, warn};
use osmpbf::{Element, ElementReader};
use thiserror::Error;

mod accumulator;
mod ids;
mod meta;
mod tags;

use accumulator::StationAccumulator;

/// Summary of raw OSM elements discovered during ingestion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmIngestSummary {
    /// Number of nodes discovered, including dense-node entries.
    pub nodes: u64,
    /// Number of ways discovered.
    pub ways: u64,
    /// Number of relations discovered.
    pub relations: u64,
    /// Bounding box covering all node coordinates, if any nodes were present.
    /// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    pub bounds: Option<Rect<f64>>,
}

impl OsmIngestSummary {
    fn combine(mut self, other: Self) -> Self {
        self.nodes += other.nodes;
        self.ways += other.ways;
        self.relations += other.relations;
        if let Some(bounds) = other.bounds {
            self.include_bounds(bounds);
        }
        self
    }

    fn include_bounds(&mut self, bounds: Rect<f64>) {
        match &mut self.bounds {
            Some(existing) => {
                let min = Coord {
                    x: existing.min().x.min(bounds.min().x),
                    y: existing.min().y.min(bounds.min().y),
                };
                let max = Coord {
                    x: existing.max().x.max(bounds.max().x),
                    y: existing.max().y.max(bounds.max().y),
                };
                *existing = Rect::new(min, max);
            }
            None => self.bounds = Some(bounds),
        }
    }

    fn record_node(&mut self, lon: f64, lat: f64) {
        self.nodes += 1;
        if let Some(bounds) = Self::coordinate_bounds(lon, lat) {
            self.include_bounds(bounds);
        }
    }

    fn record_way(&mut self) {
        self.ways += 1;
    }

    fn record_relation(&mut self) {
        self.relations += 1;
    }

    fn coordinate_bounds(lon: f64, lat: f64) -> Option<Rect<f64>> {
        (lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat))
        .then(|| {
            let coordinate = Coord { x: lon, y: lat };
            Rect::new(coordinate, coordinate)
        })
    }
}

/// Detailed report of an OSM ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmIngestReport {
    /// Element counts and bounding box information.
    pub summary: OsmIngestSummary,
    /// Station and charge-point features, each collection sorted by id.
    pub features: RawFeatureSet,
    /// Node references that never resolved to a coordinate.
    pub unresolved_nodes: usize,
    /// Relation member ways missing from the file.
    pub unresolved_ways: usize,
}

/// Errors returned when ingesting an OSM PBF file.
#[derive(Debug, Error)]
pub enum OsmIngestError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Underlying reader error.
        #[source]
        source: osmpbf::Error,
        /// File that was read.
        path: PathBuf,
    },
    /// A block could not be decoded.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Underlying reader error.
        #[source]
        source: osmpbf::Error,
        /// File that was read.
        path: PathBuf,
    },
}

/// Read every charging station and charge point from an OSM PBF file.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use chargemap_data::ingest_osm_pbf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let features = ingest_osm_pbf(Path::new("switzerland.osm.pbf"))?;
/// let snapshot = chargemap_core::aggregate(&features)?;
/// println!("{} stations", snapshot.count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_osm_pbf(path: &Path) -> Result<RawFeatureSet, OsmIngestError> {
    ingest_osm_pbf_report(path).map(|report| report.features)
}

/// Ingest an OSM PBF file, producing both counts and features.
///
/// The file is scanned in parallel once for tagged elements. When station
/// relations reference untagged member ways, a second pass collects their
/// node lists; a final pass resolves node coordinates for ways.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use chargemap_data::ingest_osm_pbf_report;
///
/// # fn main() -> Result<(), chargemap_data::OsmIngestError> {
/// let report = ingest_osm_pbf_report(Path::new("berlin.osm.pbf"))?;
/// println!("Scanned {} nodes", report.summary.nodes);
/// # Ok(())
/// # }
/// ```
pub fn ingest_osm_pbf_report(path: &Path) -> Result<OsmIngestReport, OsmIngestError> {
    let mut accumulator = open(path)?
        .par_map_reduce(
            |element| {
                let mut accumulator = StationAccumulator::default();
                accumulator.process_element(element);
                accumulator
            },
            StationAccumulator::default,
            StationAccumulator::combine,
        )
        .map_err(|source| decode_error(source, path))?;

    let mut unresolved_ways = 0;
    if accumulator.has_pending_ways() {
        let accumulator_ref = &mut accumulator;
        open(path)?
            .for_each(|element| {
                if let Element::Way(way) = element {
                    accumulator_ref.resolve_member_way(way.id(), way.refs());
                }
            })
            .map_err(|source| decode_error(source, path))?;
        if accumulator.has_pending_ways() {
            unresolved_ways = accumulator.pending_way_count();
            warn!("Skipped {unresolved_ways} relation member ways missing from the extract");
        }
    }

    let mut unresolved_nodes = 0;
    if accumulator.has_pending_nodes() {
        let accumulator_ref = &mut accumulator;
        open(path)?
            .for_each(|element| match element {
                Element::Node(node) => {
                    accumulator_ref.resolve_pending_node(node.id(), node.lon(), node.lat());
                }
                Element::DenseNode(node) => {
                    accumulator_ref.resolve_pending_node(node.id(), node.lon(), node.lat());
                }
                Element::Way(_) | Element::Relation(_) => {}
            })
            .map_err(|source| decode_error(source, path))?;
        if accumulator.has_pending_nodes() {
            unresolved_nodes = accumulator.pending_node_count();
            warn!("Skipped {unresolved_nodes} way node references without coordinates");
        }
    }

    let assembled = accumulator.assemble();
    info!(
        "Read {} nodes, {} ways and {} station relations from {}",
        assembled.features.points.len(),
        assembled.features.lines.len(),
        assembled.features.areas.len(),
        path.display()
    );
    if assembled.incomplete_ways + assembled.incomplete_relations > 0 {
        warn!(
            "{} ways and {} relations lack complete geometry",
            assembled.incomplete_ways, assembled.incomplete_relations
        );
    }
    Ok(OsmIngestReport {
        summary: assembled.summary,
        features: assembled.features,
        unresolved_nodes,
        unresolved_ways,
    })
}

fn open(path: &Path) -> Result<ElementReader<std::io::BufReader<std::fs::File>>, OsmIngestError> {
    ElementReader::from_path(path).map_err(|source| OsmIngestError::Open {
        source,
        path: path.to_path_buf(),
    })
}

fn decode_error(source: osmpbf::Error, path: &Path) -> OsmIngestError {
    OsmIngestError::Decode {
        source,
        path: path.to_path_buf(),
    }
}
