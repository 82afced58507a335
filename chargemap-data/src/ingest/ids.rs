use log::warn;

use chargemap_core::ElementKind;

/// Largest identifier the snapshot carries. OSM ids are far below this; the
/// bound keeps ids clear of the sign bit and of two reserved high bits.
pub(super) const MAX_ELEMENT_ID: u64 = (1 << 62) - 1;

pub(super) fn checked_id(kind: ElementKind, raw_id: i64) -> Option<u64> {
    match u64::try_from(raw_id) {
        Ok(id) if id > MAX_ELEMENT_ID => {
            warn!(
                "Skipped OSM element: kind={kind}, raw_id={raw_id} (exceeds supported maximum {MAX_ELEMENT_ID})"
            );
            None
        }
        Ok(id) => Some(id),
        Err(_) => {
            warn!(
                "Skipped OSM element: kind={kind}, raw_id={raw_id} (negative identifiers are unsupported)"
            );
            None
        }
    }
}
