//! Internal accumulator for OpenStreetMap (OSM) PBF ingestion.
//!
//! The first, parallel pass keeps station and charge-point nodes, station
//! ways, and station relations, and notes which member ways and nodes are
//! still unresolved. Follow-up passes fill in member way references and
//! node coordinates before the features are assembled.
use std::collections::{HashMap, HashSet};

use chargemap_core::{ElementKind, RawFeature, RawFeatureSet, RawGeometry};
use geo::{Coord, LineString};
use osmpbf::{Element, RelMemberType};

use super::OsmIngestSummary;
use super::ids::checked_id;
use super::meta::EditMeta;
use super::tags::{Marker, collect_tags, marker};
use crate::rings::RingMembers;

#[derive(Debug, Default)]
pub(super) struct StationAccumulator {
    summary: OsmIngestSummary,
    points: Vec<RawFeature>,
    ways: Vec<WayCandidate>,
    relations: Vec<RelationCandidate>,
    nodes: HashMap<u64, Coord<f64>>,
    way_refs: HashMap<u64, Vec<u64>>,
    pending_nodes: HashSet<u64>,
    pending_ways: HashSet<u64>,
}

/// Features assembled from an accumulator, with unresolved reference counts.
#[derive(Debug)]
pub(super) struct Assembled {
    pub(super) summary: OsmIngestSummary,
    pub(super) features: RawFeatureSet,
    pub(super) incomplete_ways: usize,
    pub(super) incomplete_relations: usize,
}

impl StationAccumulator {
    pub(super) fn process_element(&mut self, element: Element<'_>) {
        match element {
            Element::Node(node) => self.process_node(
                node.id(),
                node.lon(),
                node.lat(),
                node.tags(),
                || EditMeta::from_info(&node.info()),
            ),
            Element::DenseNode(node) => self.process_node(
                node.id(),
                node.lon(),
                node.lat(),
                node.tags(),
                || EditMeta::from_dense(node.info()),
            ),
            Element::Way(way) => self.process_way(
                way.id(),
                way.refs(),
                way.tags(),
                || EditMeta::from_info(&way.info()),
            ),
            Element::Relation(relation) => {
                let members = relation.members().map(|member| {
                    (
                        member.member_id,
                        matches!(member.member_type, RelMemberType::Way),
                        member.role().unwrap_or_default(),
                    )
                });
                self.process_relation(
                    relation.id(),
                    members,
                    relation.tags(),
                    || EditMeta::from_info(&relation.info()),
                );
            }
        }
    }

    pub(super) fn process_node<'a, T>(
        &mut self,
        raw_id: i64,
        lon: f64,
        lat: f64,
        tags: T,
        meta: impl FnOnce() -> EditMeta,
    ) where
        T: IntoIterator<Item = (&'a str, &'a str)>,
        T::IntoIter: Clone,
    {
        self.summary.record_node(lon, lat);
        let tags = tags.into_iter();
        if marker(tags.clone()).is_none() {
            return;
        }
        let Some(id) = checked_id(ElementKind::Node, raw_id) else {
            return;
        };
        // The resolver drops positions outside WGS84 and records why.
        let geometry = Some(RawGeometry::Point(Coord { x: lon, y: lat }));
        let feature = RawFeature::new(id, ElementKind::Node, geometry).with_tags(collect_tags(tags));
        self.points.push(with_meta(feature, meta()));
    }

    pub(super) fn process_way<'a, I, T>(
        &mut self,
        raw_id: i64,
        refs: I,
        tags: T,
        meta: impl FnOnce() -> EditMeta,
    ) where
        I: IntoIterator<Item = i64>,
        T: IntoIterator<Item = (&'a str, &'a str)>,
        T::IntoIter: Clone,
    {
        self.summary.record_way();
        let tags = tags.into_iter();
        if marker(tags.clone()) != Some(Marker::Station) {
            return;
        }
        let Some(id) = checked_id(ElementKind::Way, raw_id) else {
            return;
        };
        let node_refs = node_ids(refs);
        self.pending_nodes.extend(node_refs.iter().copied());
        self.way_refs.insert(id, node_refs.clone());
        let feature = RawFeature::new(id, ElementKind::Way, None).with_tags(collect_tags(tags));
        self.ways.push(WayCandidate {
            feature: with_meta(feature, meta()),
            node_refs,
        });
    }

    /// Members are `(raw id, is a way, role)` triples.
    pub(super) fn process_relation<'a, M, T>(
        &mut self,
        raw_id: i64,
        members: M,
        tags: T,
        meta: impl FnOnce() -> EditMeta,
    ) where
        M: IntoIterator<Item = (i64, bool, &'a str)>,
        T: IntoIterator<Item = (&'a str, &'a str)>,
        T::IntoIter: Clone,
    {
        self.summary.record_relation();
        let tags = tags.into_iter();
        if marker(tags.clone()) != Some(Marker::Station) {
            return;
        }
        let Some(id) = checked_id(ElementKind::Relation, raw_id) else {
            return;
        };
        let members: Vec<(u64, String)> = members
            .into_iter()
            .filter(|&(_, is_way, _)| is_way)
            .filter_map(|(member_id, _, role)| {
                checked_id(ElementKind::Way, member_id).map(|way_id| (way_id, role.to_owned()))
            })
            .collect();
        self.pending_ways.extend(members.iter().map(|(way_id, _)| *way_id));
        let feature =
            RawFeature::new(id, ElementKind::Relation, None).with_tags(collect_tags(tags));
        self.relations.push(RelationCandidate {
            feature: with_meta(feature, meta()),
            members,
        });
    }

    pub(super) fn combine(mut self, other: Self) -> Self {
        self.summary = self.summary.combine(other.summary);
        self.points.extend(other.points);
        self.ways.extend(other.ways);
        self.relations.extend(other.relations);
        for (id, coord) in other.nodes {
            self.nodes.entry(id).or_insert(coord);
        }
        for (id, refs) in other.way_refs {
            self.way_refs.entry(id).or_insert(refs);
        }
        self.pending_nodes.extend(other.pending_nodes);
        self.pending_ways.extend(other.pending_ways);
        self.pending_ways.retain(|way_id| !self.way_refs.contains_key(way_id));
        self
    }

    pub(super) fn has_pending_ways(&self) -> bool {
        !self.pending_ways.is_empty()
    }

    pub(super) fn pending_way_count(&self) -> usize {
        self.pending_ways.len()
    }

    pub(super) fn has_pending_nodes(&self) -> bool {
        !self.pending_nodes.is_empty()
    }

    pub(super) fn pending_node_count(&self) -> usize {
        self.pending_nodes.len()
    }

    /// Record the node references of a relation member way.
    pub(super) fn resolve_member_way<I>(&mut self, raw_id: i64, refs: I)
    where
        I: IntoIterator<Item = i64>,
    {
        let Ok(id) = u64::try_from(raw_id) else {
            return;
        };
        if !self.pending_ways.remove(&id) {
            return;
        }
        let node_refs = node_ids(refs);
        self.pending_nodes.extend(
            node_refs
                .iter()
                .filter(|node_id| !self.nodes.contains_key(node_id))
                .copied(),
        );
        self.way_refs.insert(id, node_refs);
    }

    pub(super) fn resolve_pending_node(&mut self, raw_id: i64, lon: f64, lat: f64) {
        let Ok(id) = u64::try_from(raw_id) else {
            return;
        };
        if self.pending_nodes.remove(&id) {
            self.nodes.insert(id, Coord { x: lon, y: lat });
        }
    }

    pub(super) fn assemble(self) -> Assembled {
        let Self {
            summary,
            mut points,
            ways,
            relations,
            nodes,
            way_refs,
            ..
        } = self;
        let coords_of = |refs: &[u64]| -> Option<Vec<Coord<f64>>> {
            if refs.is_empty() {
                return None;
            }
            refs.iter().map(|node_id| nodes.get(node_id).copied()).collect()
        };

        let mut incomplete_ways = 0;
        let mut lines: Vec<RawFeature> = ways
            .into_iter()
            .map(|candidate| {
                let mut feature = candidate.feature;
                feature.geometry = coords_of(candidate.node_refs.as_slice())
                    .map(|coords| RawGeometry::Line(LineString::new(coords)));
                if feature.geometry.is_none() {
                    incomplete_ways += 1;
                }
                feature
            })
            .collect();

        let mut incomplete_relations = 0;
        let mut areas: Vec<RawFeature> = relations
            .into_iter()
            .map(|candidate| {
                let mut feature = candidate.feature;
                let mut rings = RingMembers::default();
                let resolved = candidate.members.iter().all(|(way_id, role)| {
                    match way_refs.get(way_id).and_then(|refs| coords_of(refs.as_slice())) {
                        Some(coords) => {
                            rings.push(role, coords);
                            true
                        }
                        None => false,
                    }
                });
                feature.geometry = if resolved { rings.into_area() } else { None };
                if feature.geometry.is_none() {
                    incomplete_relations += 1;
                }
                feature
            })
            .collect();

        // Blocks are reduced in arbitrary order.
        points.sort_by_key(|feature| feature.id);
        lines.sort_by_key(|feature| feature.id);
        areas.sort_by_key(|feature| feature.id);

        Assembled {
            summary,
            features: RawFeatureSet {
                points,
                lines,
                areas,
            },
            incomplete_ways,
            incomplete_relations,
        }
    }
}

#[derive(Debug)]
struct WayCandidate {
    feature: RawFeature,
    node_refs: Vec<u64>,
}

#[derive(Debug)]
struct RelationCandidate {
    feature: RawFeature,
    members: Vec<(u64, String)>,
}

fn node_ids<I: IntoIterator<Item = i64>>(refs: I) -> Vec<u64> {
    refs.into_iter()
        .filter_map(|node_id| checked_id(ElementKind::Node, node_id))
        .collect()
}

fn with_meta(feature: RawFeature, meta: EditMeta) -> RawFeature {
    let mut feature = feature.with_meta(meta.timestamp, meta.version);
    feature.user = meta.user;
    feature
}
