//! Error types and run diagnostics.
//!
//! Only [`PipelineError`] aborts a run. Everything in [`FeatureError`] is
//! recovered locally: the offending row is skipped or demoted, a warning is
//! logged, and the issue is kept in [`Diagnostics`] for the caller.

use log::warn;
use thiserror::Error;

use crate::feature::{Collection, ElementKind};
use crate::projection::SourceProjection;

/// Errors that abort an aggregation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The feature source yielded no rows at all.
    #[error("feature source yielded no rows")]
    EmptyInput,
    /// The run was cancelled before it completed.
    #[error("aggregation run was cancelled")]
    Cancelled,
    /// The dedicated matching worker pool could not be created.
    #[error("failed to build matching worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a row that matched a tag filter could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    /// The source supplied no geometry.
    #[error("geometry is missing")]
    MissingGeometry,
    /// The geometry holds no coordinates.
    #[error("geometry has no coordinates")]
    EmptyGeometry,
    /// The geometry type does not fit the collection the row came from.
    #[error("expected {expected} geometry, found {found}")]
    UnexpectedGeometry {
        /// Geometry type the collection requires.
        expected: &'static str,
        /// Geometry type the row carried.
        found: &'static str,
    },
}

/// Defects that make a polygon ring unusable for containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingDefect {
    /// Fewer than four distinct-in-sequence coordinates.
    #[error("ring has fewer than four coordinates")]
    TooFewCoordinates,
    /// First and last coordinates differ.
    #[error("ring is not closed")]
    Unclosed,
    /// The ring encloses no area.
    #[error("ring encloses zero area")]
    ZeroArea,
    /// Two edges cross or overlap.
    #[error("ring intersects itself")]
    SelfIntersecting,
    /// An inner ring lies outside every outer ring.
    #[error("inner ring is not inside any outer ring")]
    OrphanInnerRing,
}

/// A problem with a single row, recovered without aborting the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// A tagged row lacks required geometry; the row is skipped.
    #[error("skipped {kind} {id}: {reason}")]
    Malformed {
        id: u64,
        kind: ElementKind,
        reason: MalformedReason,
    },
    /// A station ring is invalid; the station is kept but contains nothing.
    #[error("station {kind} {id} cannot contain charge points: {defect}")]
    Geometry {
        id: u64,
        kind: ElementKind,
        defect: RingDefect,
    },
    /// A coordinate could not be transformed into WGS84; the row is dropped.
    #[error("dropped {kind} {id}: coordinate ({x}, {y}) is outside the {projection} domain")]
    Projection {
        id: u64,
        kind: ElementKind,
        projection: SourceProjection,
        x: f64,
        y: f64,
    },
    /// Two rows share an id; the later-seen row replaced the earlier one.
    #[error("duplicate id {id} in {collection}; keeping the later row")]
    DuplicateId { id: u64, collection: Collection },
}

/// Issues collected while running the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Locally recovered row problems, in the order they were found.
    pub issues: Vec<FeatureError>,
    /// Charge points that no station polygon contains. They are left out of
    /// the output.
    pub unmatched_charge_points: Vec<u64>,
}

impl Diagnostics {
    /// Log and keep a recovered issue.
    pub(crate) fn record(&mut self, issue: FeatureError) {
        warn!("{issue}");
        self.issues.push(issue);
    }

    /// Number of issues satisfying `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&FeatureError) -> bool) -> usize {
        self.issues.iter().filter(|issue| predicate(issue)).count()
    }

    /// Returns true when no row needed recovery.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn malformed_message_names_the_row() {
        let issue = FeatureError::Malformed {
            id: 42,
            kind: ElementKind::Way,
            reason: MalformedReason::MissingGeometry,
        };
        assert_eq!(issue.to_string(), "skipped way 42: geometry is missing");
    }

    #[rstest]
    fn diagnostics_count_by_predicate() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.record(FeatureError::DuplicateId {
            id: 1,
            collection: Collection::Points,
        });
        diagnostics.record(FeatureError::Geometry {
            id: 2,
            kind: ElementKind::Way,
            defect: RingDefect::ZeroArea,
        });
        assert_eq!(
            diagnostics.count_where(|issue| matches!(issue, FeatureError::DuplicateId { .. })),
            1
        );
        assert!(!diagnostics.is_clean());
    }
}
