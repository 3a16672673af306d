//! Display payload for the map widget: the region layer with per-feature
//! colours and a legend. The widget mounts whatever these functions build.

use crate::classify::{Classifier, LegendEntry};
use crate::config::StyleConfig;
use crate::types::RegionCollection;
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

pub fn legend(title: &str, classifier: &Classifier) -> Legend {
    Legend {
        title: title.to_string(),
        entries: classifier.legend(),
    }
}

/// The region layer with `metric_property`, `fillColor`, `bucket` and a
/// Leaflet `style` object added to every feature.
pub fn styled_collection(
    regions: &RegionCollection,
    classifier: &Classifier,
    metric_property: &str,
    style: &StyleConfig,
) -> FeatureCollection {
    let features = regions
        .iter()
        .map(|region| {
            let metric = region.metric.unwrap_or(0.0);
            let class = classifier.classify(metric);

            let mut properties = region.properties.clone();
            properties.insert(metric_property.to_string(), JsonValue::from(metric));
            properties.insert("fillColor".to_string(), JsonValue::from(class.color));
            properties.insert("bucket".to_string(), JsonValue::from(class.label));
            properties.insert(
                "style".to_string(),
                json!({
                    "fillColor": class.color,
                    "weight": style.weight,
                    "opacity": style.opacity,
                    "color": style.color,
                    "dashArray": style.dash_array,
                    "fillOpacity": style.fill_opacity,
                }),
            );

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&region.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(payload).context("Failed to serialize output")?;
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

    info!(path = ?path, "wrote output");
    Ok(())
}
