//! Joins multipolygon member ways into closed rings.
//!
//! OpenStreetMap splits long ring boundaries across several ways. Members
//! are joined end to end, reversing a segment when its far end is the one
//! that touches, until every chain closes on itself.

use chargemap_core::RawGeometry;
use geo::{Coord, LineString};

/// Member way geometry grouped by ring role.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RingMembers {
    pub(crate) outer: Vec<Vec<Coord<f64>>>,
    pub(crate) inner: Vec<Vec<Coord<f64>>>,
}

impl RingMembers {
    /// File a member way under its role. Roles other than `outer`, `inner`
    /// or empty are ignored; an empty role counts as `outer`.
    pub(crate) fn push(&mut self, role: &str, coords: Vec<Coord<f64>>) {
        match role {
            "" | "outer" => self.outer.push(coords),
            "inner" => self.inner.push(coords),
            _ => {}
        }
    }

    /// Assemble an area geometry, or `None` when a chain cannot be closed or
    /// no outer ring exists.
    pub(crate) fn into_area(self) -> Option<RawGeometry> {
        let outers = join_rings(self.outer)?;
        if outers.is_empty() {
            return None;
        }
        let inners = join_rings(self.inner)?;
        Some(RawGeometry::Area { outers, inners })
    }
}

/// Join segments into closed rings. Returns `None` if any chain stays open.
pub(crate) fn join_rings(segments: Vec<Vec<Coord<f64>>>) -> Option<Vec<LineString<f64>>> {
    let mut pending: Vec<Vec<Coord<f64>>> = segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect();
    let mut rings = Vec::new();

    while let Some(mut chain) = pending.pop() {
        while !is_closed(&chain) {
            let tail = *chain.last()?;
            let touches = |segment: &Vec<Coord<f64>>| {
                segment.first() == Some(&tail) || segment.last() == Some(&tail)
            };
            let position = pending.iter().position(touches)?;
            let mut next = pending.swap_remove(position);
            if next.first() != Some(&tail) {
                next.reverse();
            }
            chain.extend(next.into_iter().skip(1));
        }
        rings.push(LineString::new(chain));
    }
    Some(rings)
}

fn is_closed(chain: &[Coord<f64>]) -> bool {
    chain.len() > 1 && chain.first() == chain.last()
}
