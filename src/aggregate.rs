//! Point-in-polygon aggregation of sightings into per-region density.

use crate::types::{Observation, ObservationCollection, RegionCollection};
use geo::bounding_rect::BoundingRect;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{MultiPolygon, Point};
use rayon::prelude::*;
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Whether a point lying exactly on a region's edge or vertex counts as inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    #[default]
    Inclusive,
    Exclusive,
}

impl BoundaryRule {
    pub fn contains(self, geometry: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
        match geometry.coordinate_position(&point.0) {
            CoordPos::Inside => true,
            CoordPos::OnBoundary => self == BoundaryRule::Inclusive,
            CoordPos::Outside => false,
        }
    }
}

/// The subset of `points` inside `polygon`.
pub fn points_within(
    points: &[Observation],
    polygon: &MultiPolygon<f64>,
    rule: BoundaryRule,
) -> Vec<Observation> {
    points
        .iter()
        .filter(|o| rule.contains(polygon, &o.point))
        .copied()
        .collect()
}

/// Counts observations inside a region. Implementations may prefilter however
/// they like but must agree with [`points_within`].
pub trait ContainmentIndex: Sync {
    fn count_within(&self, geometry: &MultiPolygon<f64>, rule: BoundaryRule) -> usize;
}

/// Tests every observation against every region.
pub struct LinearScan<'a> {
    observations: &'a [Observation],
}

impl<'a> LinearScan<'a> {
    pub fn new(observations: &'a [Observation]) -> Self {
        Self { observations }
    }
}

impl ContainmentIndex for LinearScan<'_> {
    fn count_within(&self, geometry: &MultiPolygon<f64>, rule: BoundaryRule) -> usize {
        self.observations
            .iter()
            .filter(|o| rule.contains(geometry, &o.point))
            .count()
    }
}

/// R-tree over observation coordinates; only points inside a region's bounding
/// box reach the exact containment test.
pub struct BoundingBoxIndex {
    tree: RTree<[f64; 2]>,
}

impl BoundingBoxIndex {
    pub fn new(observations: &[Observation]) -> Self {
        // Non-finite coordinates can never be inside a polygon.
        let points: Vec<[f64; 2]> = observations
            .iter()
            .map(|o| [o.longitude(), o.latitude()])
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }
}

impl ContainmentIndex for BoundingBoxIndex {
    fn count_within(&self, geometry: &MultiPolygon<f64>, rule: BoundaryRule) -> usize {
        let Some(rect) = geometry.bounding_rect() else {
            return 0;
        };
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        self.tree
            .locate_in_envelope(&envelope)
            .filter(|p| rule.contains(geometry, &Point::new(p[0], p[1])))
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    Linear,
    #[default]
    BoundingBox,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationSummary {
    pub regions: usize,
    pub observations: usize,
    /// Sum of per-region counts. A sighting on a border shared by two regions
    /// is counted once for each of them.
    pub counted: usize,
    /// Observations inside at least one region.
    pub matched: usize,
    pub zero_population: usize,
}

impl AggregationSummary {
    /// Observations outside every region.
    pub fn unassigned(&self) -> usize {
        self.observations - self.matched
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregator {
    pub boundary: BoundaryRule,
    pub index: IndexStrategy,
}

impl Aggregator {
    pub fn new(boundary: BoundaryRule, index: IndexStrategy) -> Self {
        Self { boundary, index }
    }

    /// Attaches `metric = count inside / effective population` to every region.
    pub fn annotate(
        &self,
        regions: &mut RegionCollection,
        observations: &ObservationCollection,
    ) -> AggregationSummary {
        let summary = match self.index {
            IndexStrategy::Linear => {
                self.annotate_with(regions, observations, &LinearScan::new(observations.as_slice()))
            }
            IndexStrategy::BoundingBox => self.annotate_with(
                regions,
                observations,
                &BoundingBoxIndex::new(observations.as_slice()),
            ),
        };

        info!(
            regions = summary.regions,
            observations = summary.observations,
            counted = summary.counted,
            matched = summary.matched,
            unassigned = summary.unassigned(),
            zero_population = summary.zero_population,
            "aggregation complete"
        );
        summary
    }

    /// Same as [`Aggregator::annotate`] with a caller-supplied index built
    /// over `observations`.
    pub fn annotate_with<I: ContainmentIndex>(
        &self,
        regions: &mut RegionCollection,
        observations: &ObservationCollection,
        index: &I,
    ) -> AggregationSummary {
        let boundary = self.boundary;

        let counts: Vec<usize> = regions
            .regions
            .par_iter_mut()
            .map(|region| {
                let count = index.count_within(&region.geometry, boundary);
                if region.population == 0 {
                    debug!(region = %region.name, count, "zero population, dividing by 1");
                }
                region.metric = Some(count as f64 / region.effective_population() as f64);
                count
            })
            .collect();

        AggregationSummary {
            regions: regions.len(),
            observations: observations.len(),
            counted: counts.iter().sum(),
            matched: matched_observations(regions, observations, boundary),
            zero_population: regions.iter().filter(|r| r.population == 0).count(),
        }
    }
}

/// Number of observations inside at least one region. Region bounding boxes
/// are checked before the exact containment test.
fn matched_observations(
    regions: &RegionCollection,
    observations: &ObservationCollection,
    boundary: BoundaryRule,
) -> usize {
    let bounded: Vec<_> = regions
        .iter()
        .filter_map(|region| region.geometry.bounding_rect().map(|rect| (rect, &region.geometry)))
        .collect();

    observations
        .as_slice()
        .par_iter()
        .filter(|o| {
            let (x, y) = (o.longitude(), o.latitude());
            bounded.iter().any(|(rect, geometry)| {
                x >= rect.min().x
                    && x <= rect.max().x
                    && y >= rect.min().y
                    && y <= rect.max().y
                    && boundary.contains(geometry, &o.point)
            })
        })
        .count()
}
