use crate::aggregate::{Aggregator, BoundaryRule, IndexStrategy};
use crate::classify::{self, Bucket, Classifier, Comparison, FloorBucket};
use crate::error::PaletteError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub regions: PathBuf,      // .geojson/.json or .shp
    pub observations: PathBuf, // .geojson/.json or .csv
    #[serde(default = "default_population_property")]
    pub population_property: String,
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,
    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    #[serde(default = "default_metric_property")]
    pub metric_property: String,
    #[serde(default)]
    pub boundary: BoundaryRule,
    #[serde(default)]
    pub index: IndexStrategy,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            metric_property: default_metric_property(),
            boundary: BoundaryRule::default(),
            index: IndexStrategy::default(),
        }
    }
}

impl AggregationConfig {
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.boundary, self.index)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassificationConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default = "classify::default_buckets")]
    pub buckets: Vec<Bucket>,
    #[serde(default = "classify::default_floor")]
    pub floor: FloorBucket,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            comparison: Comparison::default(),
            buckets: classify::default_buckets(),
            floor: classify::default_floor(),
        }
    }
}

impl ClassificationConfig {
    pub fn classifier(&self) -> Result<Classifier, PaletteError> {
        Classifier::new(self.buckets.clone(), self.floor.clone(), self.comparison)
    }
}

/// Path options handed to the map widget with every region.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub weight: f64,
    pub opacity: f64,
    pub color: String,
    pub dash_array: String,
    pub fill_opacity: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            weight: 2.0,
            opacity: 1.0,
            color: "white".to_string(),
            dash_array: "3".to_string(),
            fill_opacity: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub geojson: PathBuf,
    pub legend: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            geojson: PathBuf::from("output/regions.geojson"),
            legend: PathBuf::from("output/legend.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("."),
        }
    }
}

fn default_population_property() -> String {
    "Population".to_string()
}

fn default_name_property() -> String {
    "NAME".to_string()
}

fn default_longitude_column() -> String {
    "longitude".to_string()
}

fn default_latitude_column() -> String {
    "latitude".to_string()
}

fn default_metric_property() -> String {
    "spidersPerPerson".to_string()
}

fn default_title() -> String {
    "Spider sightings per person".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            regions = "data/counties.geojson"
            observations = "data/sightings.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.population_property, "Population");
        assert_eq!(config.input.name_property, "NAME");
        assert_eq!(config.aggregation.metric_property, "spidersPerPerson");
        assert_eq!(config.aggregation.boundary, BoundaryRule::Inclusive);
        assert_eq!(config.aggregation.index, IndexStrategy::BoundingBox);
        assert_eq!(config.classification.buckets.len(), 6);
        assert_eq!(config.classification.comparison, Comparison::Exceeds);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.style, StyleConfig::default());
        assert!(config.classification.classifier().is_ok());
    }

    #[test]
    fn custom_palette_and_rules() {
        let config = AppConfig::from_toml(
            r##"
            [input]
            regions = "counties.shp"
            observations = "observations.csv"
            population_property = "POP2020"

            [aggregation]
            metric_property = "density"
            boundary = "exclusive"
            index = "linear"

            [classification]
            title = "Density"
            comparison = "at_least"
            floor = { label = "none", color = "#ffffff" }

            [[classification.buckets]]
            threshold = 1.0
            label = "high"
            color = "#ff0000"

            [[classification.buckets]]
            threshold = 0.5
            label = "low"
            color = "#00ff00"

            [style]
            weight = 1.0
            opacity = 0.5
            color = "#333"
            dashArray = ""
            fillOpacity = 0.9
            "##,
        )
        .unwrap();

        assert_eq!(config.input.population_property, "POP2020");
        assert_eq!(config.aggregation.aggregator(), Aggregator::new(BoundaryRule::Exclusive, IndexStrategy::Linear));
        let classifier = config.classification.classifier().unwrap();
        assert_eq!(classifier.comparison(), Comparison::AtLeast);
        assert_eq!(classifier.label(1.0), "high");
        assert_eq!(classifier.label(0.1), "none");
        assert_eq!(config.style.fill_opacity, 0.9);
    }

    #[test]
    fn invalid_palette_is_reported() {
        let config = AppConfig::from_toml(
            r##"
            [input]
            regions = "r.geojson"
            observations = "o.geojson"

            [[classification.buckets]]
            threshold = 0.1
            label = "a"
            color = "#000"

            [[classification.buckets]]
            threshold = 0.2
            label = "b"
            color = "#111"
            "##,
        )
        .unwrap();

        assert!(matches!(
            config.classification.classifier(),
            Err(PaletteError::NotDecreasing { .. })
        ));
    }
}
