use crate::aggregate::AggregationSummary;
use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::data;
use crate::render::{self, Legend};
use crate::types::{ObservationCollection, RegionCollection};
use anyhow::{Context, Result};
use geojson::FeatureCollection;

/// Everything one rendering session needs: the configuration, the aggregated
/// regions and the colour scale. Built once and handed to the renderer or the
/// server.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: AppConfig,
    pub regions: RegionCollection,
    pub classifier: Classifier,
    pub summary: AggregationSummary,
}

impl Session {
    /// Loads both layers, then aggregates. Fails without aggregating if the
    /// palette is invalid or either layer cannot be loaded.
    pub async fn prepare(config: AppConfig) -> Result<Self> {
        let classifier = config
            .classification
            .classifier()
            .context("Invalid classification palette")?;

        let (regions, observations) = data::fetch_inputs(&config.input)
            .await
            .context("Failed to load input layers")?;

        Ok(Self::aggregate(config, classifier, regions, &observations))
    }

    pub fn from_parts(
        config: AppConfig,
        regions: RegionCollection,
        observations: &ObservationCollection,
    ) -> Result<Self> {
        let classifier = config
            .classification
            .classifier()
            .context("Invalid classification palette")?;
        Ok(Self::aggregate(config, classifier, regions, observations))
    }

    fn aggregate(
        config: AppConfig,
        classifier: Classifier,
        mut regions: RegionCollection,
        observations: &ObservationCollection,
    ) -> Self {
        let summary = config.aggregation.aggregator().annotate(&mut regions, observations);
        Self {
            config,
            regions,
            classifier,
            summary,
        }
    }

    pub fn styled_collection(&self) -> FeatureCollection {
        render::styled_collection(
            &self.regions,
            &self.classifier,
            &self.config.aggregation.metric_property,
            &self.config.style,
        )
    }

    pub fn legend(&self) -> Legend {
        render::legend(&self.config.classification.title, &self.classifier)
    }

    /// Writes the styled region layer and the legend to the configured paths.
    pub fn write_outputs(&self) -> Result<()> {
        render::write_json(&self.config.output.geojson, &self.styled_collection())?;
        render::write_json(&self.config.output.legend, &self.legend())?;
        Ok(())
    }
}
