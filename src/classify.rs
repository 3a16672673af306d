//! Step-function colour scale for the choropleth.
//!
//! A [`Classifier`] holds an ordered list of buckets with strictly decreasing
//! thresholds plus a floor bucket. A metric lands in the first bucket whose
//! threshold it exceeds, scanning from the top; metrics that exceed nothing
//! land in the floor. The scale is not interpolated.

use crate::error::PaletteError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub threshold: f64,
    pub label: String,
    pub color: String,
}

impl Bucket {
    pub fn new(threshold: f64, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            threshold,
            label: label.into(),
            color: color.into(),
        }
    }
}

/// The bucket for metrics below every threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorBucket {
    pub label: String,
    pub color: String,
}

/// How a metric is compared against a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `metric > threshold`; a metric equal to a threshold falls into the bucket below.
    #[default]
    Exceeds,
    /// `metric >= threshold`; a metric equal to a threshold lands in that
    /// threshold's bucket. With the default palette, 0.01 reads "1 per 100"
    /// and 5 sightings per 1,000 people (0.005) is `#E31A1C`.
    AtLeast,
}

impl Comparison {
    fn passes(self, metric: f64, threshold: f64) -> bool {
        match self {
            Comparison::Exceeds => metric > threshold,
            Comparison::AtLeast => metric >= threshold,
        }
    }
}

/// The bucket a metric was classified into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification<'a> {
    /// 0 is the highest bucket; `bucket_count()` is the floor.
    pub index: usize,
    pub label: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    buckets: Vec<Bucket>,
    floor: FloorBucket,
    comparison: Comparison,
}

impl Classifier {
    pub fn new(
        buckets: Vec<Bucket>,
        floor: FloorBucket,
        comparison: Comparison,
    ) -> Result<Self, PaletteError> {
        validate(&buckets, &floor)?;
        Ok(Self {
            buckets,
            floor,
            comparison,
        })
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn floor(&self) -> &FloorBucket {
        &self.floor
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Index of the bucket for `metric`. NaN never passes a comparison and so
    /// maps to the floor.
    pub fn bucket_index(&self, metric: f64) -> usize {
        self.buckets
            .iter()
            .position(|b| self.comparison.passes(metric, b.threshold))
            .unwrap_or(self.buckets.len())
    }

    pub fn classify(&self, metric: f64) -> Classification<'_> {
        let index = self.bucket_index(metric);
        let (label, color) = match self.buckets.get(index) {
            Some(bucket) => (bucket.label.as_str(), bucket.color.as_str()),
            None => (self.floor.label.as_str(), self.floor.color.as_str()),
        };
        Classification {
            index,
            label,
            color,
        }
    }

    pub fn color(&self, metric: f64) -> &str {
        self.classify(metric).color
    }

    pub fn label(&self, metric: f64) -> &str {
        self.classify(metric).label
    }

    /// Legend rows, highest bucket first and the floor last.
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.buckets
            .iter()
            .map(|b| LegendEntry {
                label: b.label.clone(),
                color: b.color.clone(),
            })
            .chain(std::iter::once(LegendEntry {
                label: self.floor.label.clone(),
                color: self.floor.color.clone(),
            }))
            .collect()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
            floor: default_floor(),
            comparison: Comparison::default(),
        }
    }
}

/// Sightings-per-person palette used for the Oregon county map.
pub fn default_buckets() -> Vec<Bucket> {
    vec![
        Bucket::new(0.02, "More than 1 per 50", "#800026"),
        Bucket::new(0.01, "1 per 100", "#BD0026"),
        Bucket::new(0.005, "1 per 200", "#E31A1C"),
        Bucket::new(0.001, "1 per 1,000", "#FC4E2A"),
        Bucket::new(0.0005, "1 per 2,000", "#FD8D3C"),
        Bucket::new(0.0001, "1 per 10,000", "#FEB24C"),
    ]
}

pub fn default_floor() -> FloorBucket {
    FloorBucket {
        label: "Fewer than 1 per 10,000".to_string(),
        color: "#FED976".to_string(),
    }
}

fn validate(buckets: &[Bucket], floor: &FloorBucket) -> Result<(), PaletteError> {
    if buckets.is_empty() {
        return Err(PaletteError::Empty);
    }

    for (index, bucket) in buckets.iter().enumerate() {
        if !bucket.threshold.is_finite() {
            return Err(PaletteError::NonFiniteThreshold {
                index,
                value: bucket.threshold,
            });
        }
        if index > 0 {
            let previous = buckets[index - 1].threshold;
            if bucket.threshold >= previous {
                return Err(PaletteError::NotDecreasing {
                    index,
                    previous,
                    current: bucket.threshold,
                });
            }
        }
        check_color(&bucket.color)?;
    }

    check_color(&floor.color)
}

fn check_color(color: &str) -> Result<(), PaletteError> {
    let valid = match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PaletteError::BadColor {
            color: color.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inclusive() -> Classifier {
        Classifier::new(default_buckets(), default_floor(), Comparison::AtLeast).unwrap()
    }

    #[test]
    fn picks_first_exceeded_threshold() {
        let c = Classifier::default();
        assert_eq!(c.color(0.5), "#800026");
        assert_eq!(c.color(0.015), "#BD0026");
        assert_eq!(c.color(0.007), "#E31A1C");
        assert_eq!(c.color(0.002), "#FC4E2A");
        assert_eq!(c.color(0.0007), "#FD8D3C");
        assert_eq!(c.color(0.0002), "#FEB24C");
        assert_eq!(c.color(0.00005), "#FED976");
    }

    #[test]
    fn metric_on_threshold_falls_below() {
        let c = Classifier::default();
        // 0.01 does not exceed 0.01, so it cannot be in the top two buckets.
        assert_eq!(c.bucket_index(0.01), 2);
        assert_eq!(c.label(0.01), "1 per 200");
        assert_eq!(c.color(0.01), "#E31A1C");
        assert_eq!(c.bucket_index(0.02), 1);
        assert_eq!(c.label(0.02), "1 per 100");
    }

    #[test]
    fn five_in_a_thousand() {
        let metric = 5.0 / 1000.0;
        assert_eq!(Classifier::default().color(metric), "#FC4E2A");
        assert_eq!(inclusive().color(metric), "#E31A1C");
    }

    #[test]
    fn at_least_includes_threshold() {
        let c = inclusive();
        assert_eq!(c.bucket_index(0.01), 1);
        assert_eq!(c.label(0.01), "1 per 100");
        assert_eq!(c.bucket_index(0.0), 6);
    }

    #[test]
    fn zero_and_nan_go_to_floor() {
        let c = Classifier::default();
        assert_eq!(c.bucket_index(0.0), c.bucket_count());
        assert_eq!(c.color(0.0), "#FED976");
        assert_eq!(c.color(f64::NAN), "#FED976");
        assert_eq!(c.label(0.0), "Fewer than 1 per 10,000");
    }

    #[test]
    fn legend_lists_buckets_then_floor() {
        let legend = Classifier::default().legend();
        assert_eq!(legend.len(), 7);
        assert_eq!(legend[0].color, "#800026");
        assert_eq!(legend[0].label, "More than 1 per 50");
        assert_eq!(legend[6].color, "#FED976");
    }

    #[test]
    fn rejects_bad_palettes() {
        let floor = default_floor();
        assert_eq!(
            Classifier::new(vec![], floor.clone(), Comparison::Exceeds).unwrap_err(),
            PaletteError::Empty
        );

        let tied = vec![Bucket::new(0.1, "a", "#fff"), Bucket::new(0.1, "b", "#000")];
        assert!(matches!(
            Classifier::new(tied, floor.clone(), Comparison::Exceeds),
            Err(PaletteError::NotDecreasing { index: 1, .. })
        ));

        let rising = vec![Bucket::new(0.1, "a", "#fff"), Bucket::new(0.2, "b", "#000")];
        assert!(Classifier::new(rising, floor.clone(), Comparison::Exceeds).is_err());

        let nan = vec![Bucket::new(f64::NAN, "a", "#fff")];
        assert!(matches!(
            Classifier::new(nan, floor.clone(), Comparison::Exceeds),
            Err(PaletteError::NonFiniteThreshold { index: 0, .. })
        ));

        let bad_color = vec![Bucket::new(0.1, "a", "red")];
        assert!(matches!(
            Classifier::new(bad_color, floor, Comparison::Exceeds),
            Err(PaletteError::BadColor { .. })
        ));
    }

    #[test]
    fn custom_palette() {
        let c = Classifier::new(
            vec![Bucket::new(10.0, "high", "#f00"), Bucket::new(1.0, "mid", "#0f0")],
            FloorBucket {
                label: "low".into(),
                color: "#00f".into(),
            },
            Comparison::Exceeds,
        )
        .unwrap();
        assert_eq!(c.label(11.0), "high");
        assert_eq!(c.label(10.0), "mid");
        assert_eq!(c.label(1.0), "low");
    }
}
