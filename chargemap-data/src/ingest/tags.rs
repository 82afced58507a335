//! Tag predicates for charging infrastructure.
//!
//! Provides helpers to:
//! - detect station (`amenity=charging_station`) and charge point
//!   (`man_made=charge_point`) markers; and
//! - collect key/value tags into the feature tag map.
use chargemap_core::{CHARGE_POINT_TAG, STATION_TAG, Tags};

/// Marker carried by an element's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Marker {
    Station,
    ChargePoint,
}

/// Station tagging wins when an element carries both markers.
pub(super) fn marker<'a, T>(tags: T) -> Option<Marker>
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut found = None;
    for pair in tags {
        if pair == STATION_TAG {
            return Some(Marker::Station);
        }
        if pair == CHARGE_POINT_TAG {
            found = Some(Marker::ChargePoint);
        }
    }
    found
}

pub(super) fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
