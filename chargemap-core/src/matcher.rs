//! Parallel containment matching.
//!
//! Every charge point is matched independently against the read-only
//! [`StationIndex`]. Rayon's indexed collect keeps results in input order, so
//! the table is identical for any number of workers.

use log::debug;
use rayon::prelude::*;

use crate::error::PipelineError;
use crate::index::StationIndex;
use crate::pipeline::CancellationToken;
use crate::station::ChargePointCandidate;

/// Owning station id for each charge point, aligned with the input slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchTable {
    owners: Vec<Option<u64>>,
}

impl MatchTable {
    /// Iterate owners in input order.
    pub fn iter(&self) -> impl Iterator<Item = Option<u64>> + '_ {
        self.owners.iter().copied()
    }

    /// Number of charge points that found an owner.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.owners.iter().filter(|owner| owner.is_some()).count()
    }

    /// Number of entries, matched or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true when nothing was matched against.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl FromIterator<Option<u64>> for MatchTable {
    fn from_iter<I: IntoIterator<Item = Option<u64>>>(iter: I) -> Self {
        Self {
            owners: iter.into_iter().collect(),
        }
    }
}

/// Match every charge point to at most one station.
///
/// Runs on the current rayon pool. Returns [`PipelineError::Cancelled`] as
/// soon as any worker observes the cancellation flag.
pub fn match_charge_points(
    index: &StationIndex,
    charge_points: &[ChargePointCandidate],
    cancellation: &CancellationToken,
) -> Result<MatchTable, PipelineError> {
    let owners = charge_points
        .par_iter()
        .map(|candidate| {
            if cancellation.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            Ok(index.owner_of(candidate.point))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let table = MatchTable { owners };
    debug!(
        "Matched {} of {} charge points against {} station polygons",
        table.matched(),
        table.len(),
        index.len()
    );
    Ok(table)
}
