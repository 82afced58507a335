//! Staged aggregation pipeline.
//!
//! A run is a pure function of its input: normalise, resolve geometry, index
//! station polygons, match charge points in parallel, then assemble the
//! nested result. Nothing is shared between runs.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::aggregate::{AggregatedResult, assemble};
use crate::error::{Diagnostics, PipelineError};
use crate::feature::RawFeatureSet;
use crate::geometry::{resolve_charge_points, resolve_stations};
use crate::index::StationIndex;
use crate::matcher::{MatchTable, match_charge_points};
use crate::normalize::normalize;
use crate::projection::SourceProjection;
use crate::station::ChargePointCandidate;

/// Cloneable flag used to abort a run from another thread.
///
/// # Examples
/// ```
/// use chargemap_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let watcher = token.clone();
/// token.cancel();
/// assert!(watcher.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every run observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Configured aggregation run.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    projection: SourceProjection,
    threads: Option<NonZeroUsize>,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Projection of the incoming coordinates. Defaults to WGS84.
    #[must_use]
    pub fn with_projection(mut self, projection: SourceProjection) -> Self {
        self.projection = projection;
        self
    }

    /// Match charge points on a dedicated pool of `threads` workers instead
    /// of the global rayon pool.
    #[must_use]
    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Abort the run when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Aggregate `features`, stamping the result with the current time.
    pub fn run(&self, features: &RawFeatureSet) -> Result<AggregatedResult, PipelineError> {
        self.run_at(features, unix_now())
    }

    /// Aggregate `features`, stamping the result with `generated_at` (unix
    /// seconds).
    pub fn run_at(
        &self,
        features: &RawFeatureSet,
        generated_at: u64,
    ) -> Result<AggregatedResult, PipelineError> {
        if features.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        info!(
            "Aggregating {} points, {} lines and {} areas",
            features.points.len(),
            features.lines.len(),
            features.areas.len()
        );

        let mut diagnostics = Diagnostics::default();
        let candidates = normalize(features, &mut diagnostics);
        self.cancellation.check()?;

        let stations = resolve_stations(candidates.stations, self.projection, &mut diagnostics);
        let charge_points =
            resolve_charge_points(candidates.charge_points, self.projection, &mut diagnostics);
        self.cancellation.check()?;

        let index = StationIndex::build(&stations);
        let owners = self.match_all(&index, &charge_points)?;
        self.cancellation.check()?;

        Ok(assemble(
            stations,
            charge_points,
            &owners,
            generated_at,
            diagnostics,
        ))
    }

    fn match_all(
        &self,
        index: &StationIndex,
        charge_points: &[ChargePointCandidate],
    ) -> Result<MatchTable, PipelineError> {
        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.get())
                    .build()?;
                pool.install(|| match_charge_points(index, charge_points, &self.cancellation))
            }
            None => match_charge_points(index, charge_points, &self.cancellation),
        }
    }
}

/// Aggregate `features` with the default pipeline.
///
/// # Errors
/// Returns [`PipelineError::EmptyInput`] when all three collections are
/// empty.
///
/// # Examples
/// ```
/// use chargemap_core::{PipelineError, RawFeatureSet, aggregate};
///
/// let outcome = aggregate(&RawFeatureSet::default());
/// assert!(matches!(outcome, Err(PipelineError::EmptyInput)));
/// ```
pub fn aggregate(features: &RawFeatureSet) -> Result<AggregatedResult, PipelineError> {
    Pipeline::default().run(features)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ElementKind, RawFeature, RawGeometry};
    use crate::projection::WEB_MERCATOR_EXTENT;
    use geo::{Coord, LineString};
    use rstest::{fixture, rstest};

    fn square_way(id: u64, min: f64, max: f64) -> RawFeature {
        let ring = LineString::from(vec![
            (min, min),
            (max, min),
            (max, max),
            (min, max),
            (min, min),
        ]);
        RawFeature::new(id, ElementKind::Way, Some(RawGeometry::Line(ring)))
            .with_tag("amenity", "charging_station")
    }

    fn charge_point(id: u64, x: f64, y: f64) -> RawFeature {
        RawFeature::new(id, ElementKind::Node, Some(RawGeometry::Point(Coord { x, y })))
            .with_tag("man_made", "charge_point")
    }

    #[fixture]
    fn features() -> RawFeatureSet {
        RawFeatureSet {
            points: (0..64_u32)
                .map(|i| charge_point(1_000 + u64::from(i), 0.1 + f64::from(i) * 0.01, 0.5))
                .collect(),
            lines: vec![square_way(1, 0.0, 1.0)],
            areas: Vec::new(),
        }
    }

    #[rstest]
    fn output_is_independent_of_worker_count(features: RawFeatureSet) {
        let single = Pipeline::default()
            .with_threads(NonZeroUsize::MIN)
            .run_at(&features, 7)
            .expect("run succeeds");
        let many = Pipeline::default()
            .with_threads(NonZeroUsize::new(8).expect("non-zero"))
            .run_at(&features, 7)
            .expect("run succeeds");
        assert_eq!(single, many);
        assert_eq!(single.charge_point_count(), 64);
    }

    #[rstest]
    fn cancelled_run_returns_no_result(features: RawFeatureSet) {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = Pipeline::default()
            .with_cancellation(token)
            .run_at(&features, 0);
        assert!(matches!(outcome, Err(PipelineError::Cancelled)));
    }

    #[rstest]
    fn web_mercator_input_is_projected_before_matching() {
        let metres_per_degree = WEB_MERCATOR_EXTENT / 180.0;
        let features = RawFeatureSet {
            points: vec![charge_point(2, metres_per_degree * 0.5, 1_000.0)],
            lines: vec![square_way(1, 0.0, metres_per_degree)],
            areas: Vec::new(),
        };
        let result = Pipeline::default()
            .with_projection(SourceProjection::WebMercator)
            .run_at(&features, 0)
            .expect("run succeeds");
        let nested = result.stations[0]
            .charge_points
            .as_ref()
            .expect("charge point matched");
        assert!((nested[0].point.x - 0.5).abs() < 1.0e-9);
    }

    #[rstest]
    fn zero_stations_after_filtering_is_not_an_error() {
        let features = RawFeatureSet {
            points: vec![RawFeature::new(1, ElementKind::Node, None).with_tag("shop", "bakery")],
            ..RawFeatureSet::default()
        };
        let result = Pipeline::default().run_at(&features, 0).expect("run succeeds");
        assert_eq!(result.count(), 0);
    }
}
