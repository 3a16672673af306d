use crate::config::InputConfig;
use crate::error::InputError;
use crate::types::{Observation, ObservationCollection, Region, RegionCollection};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::{FeatureCollection, GeoJson, Value};
use serde_json::{Map, Value as JsonValue};
use shapefile::dbase::FieldValue;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Loads both layers concurrently and waits for both. Either failing fails
/// the whole load; nothing is aggregated from a partial input.
pub async fn fetch_inputs(
    config: &InputConfig,
) -> Result<(RegionCollection, ObservationCollection), InputError> {
    let region_config = config.clone();
    let observation_config = config.clone();

    let regions = tokio::task::spawn_blocking(move || load_regions(&region_config));
    let observations = tokio::task::spawn_blocking(move || load_observations(&observation_config));

    tokio::try_join!(joined(regions), joined(observations))
}

async fn joined<T>(handle: JoinHandle<Result<T, InputError>>) -> Result<T, InputError> {
    handle.await?
}

pub fn load_regions(config: &InputConfig) -> Result<RegionCollection, InputError> {
    let path = &config.regions;
    let regions = match extension(path)?.as_str() {
        "shp" => load_shapefile_regions(config)?,
        "json" | "geojson" => load_geojson_regions(config)?,
        other => {
            return Err(InputError::UnsupportedFormat {
                path: path.clone(),
                extension: other.to_string(),
            })
        }
    };

    info!(count = regions.len(), path = ?path, "loaded regions");
    Ok(regions)
}

pub fn load_observations(config: &InputConfig) -> Result<ObservationCollection, InputError> {
    let path = &config.observations;
    let observations = match extension(path)?.as_str() {
        "csv" => load_csv_observations(config)?,
        "json" | "geojson" => load_geojson_observations(path)?,
        other => {
            return Err(InputError::UnsupportedFormat {
                path: path.clone(),
                extension: other.to_string(),
            })
        }
    };

    info!(count = observations.len(), path = ?path, "loaded observations");
    Ok(observations)
}

fn extension(path: &Path) -> Result<String, InputError> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| InputError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: String::new(),
        })
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection, InputError> {
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(|source| InputError::GeoJson {
        path: path.to_path_buf(),
        source,
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(InputError::NotFeatureCollection {
            path: path.to_path_buf(),
        }),
    }
}

fn load_geojson_regions(config: &InputConfig) -> Result<RegionCollection, InputError> {
    let path = &config.regions;
    let collection = read_feature_collection(path)?;

    let mut regions = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(geometry) if matches!(geometry.value, Value::Polygon(_) | Value::MultiPolygon(_)) => {
                let converted: geo::Geometry<f64> = geometry
                    .value
                    .try_into()
                    .map_err(|e: geojson::Error| geometry_error(path, e))?;
                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            _ => {
                skipped += 1;
                continue;
            }
        };

        let properties = feature.properties.unwrap_or_default();
        let name = match properties.get(&config.name_property) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => format!("region {}", regions.len()),
        };
        let population = json_population(properties.get(&config.population_property));

        regions.push(Region {
            name,
            population,
            geometry,
            properties,
            metric: None,
        });
    }

    if skipped > 0 {
        debug!(skipped, path = ?path, "ignored non-polygon features");
    }

    Ok(RegionCollection::new(regions))
}

fn load_shapefile_regions(config: &InputConfig) -> Result<RegionCollection, InputError> {
    let path = &config.regions;
    let shapefile_error = |source| InputError::Shapefile {
        path: path.clone(),
        source,
    };

    let mut reader = shapefile::Reader::from_path(path).map_err(shapefile_error)?;
    let mut regions = Vec::new();
    let mut skipped = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(shapefile_error)?;

        let geometry = match shape {
            shapefile::Shape::Polygon(polygon) => shape_to_multipolygon(path, polygon)?,
            shapefile::Shape::PolygonM(polygon) => shape_to_multipolygon(path, polygon)?,
            shapefile::Shape::PolygonZ(polygon) => shape_to_multipolygon(path, polygon)?,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let name = match record.get(&config.name_property) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            _ => format!("region {}", regions.len()),
        };
        let population = field_number(record.get(&config.population_property))
            .map(population_from)
            .unwrap_or(0);

        let mut properties = Map::new();
        properties.insert(config.name_property.clone(), JsonValue::from(name.clone()));
        properties.insert(config.population_property.clone(), JsonValue::from(population));

        regions.push(Region {
            name,
            population,
            geometry,
            properties,
            metric: None,
        });
    }

    if skipped > 0 {
        debug!(skipped, path = ?path, "ignored non-polygon shapes");
    }

    Ok(RegionCollection::new(regions))
}

fn shape_to_multipolygon<P>(path: &Path, polygon: P) -> Result<MultiPolygon<f64>, InputError>
where
    P: TryInto<MultiPolygon<f64>>,
    P::Error: std::fmt::Debug,
{
    polygon
        .try_into()
        .map_err(|e| geometry_error(path, format!("{:?}", e)))
}

fn load_geojson_observations(path: &Path) -> Result<ObservationCollection, InputError> {
    let collection = read_feature_collection(path)?;
    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let observation = match feature.geometry.map(|g| g.value) {
            Some(Value::Point(position)) => observation_at(&position),
            _ => None,
        };
        match observation {
            Some(observation) => observations.push(observation),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, path = ?path, "ignored non-point features");
    }

    Ok(ObservationCollection::new(observations))
}

fn observation_at(position: &[f64]) -> Option<Observation> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(Observation::new(*lon, *lat)),
        _ => None,
    }
}

/// Sightings from a CSV export with longitude/latitude columns. Rows with a
/// blank coordinate (obscured records) are skipped.
fn load_csv_observations(config: &InputConfig) -> Result<ObservationCollection, InputError> {
    let path = &config.observations;
    let csv_error = |source| InputError::Csv {
        path: path.clone(),
        source,
    };

    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.clone(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers().map_err(csv_error)?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| InputError::MissingColumn {
                path: path.clone(),
                column: name.to_string(),
            })
    };
    let lon_idx = column(&config.longitude_column)?;
    let lat_idx = column(&config.latitude_column)?;

    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let lon = record.get(lon_idx).unwrap_or("").trim();
        let lat = record.get(lat_idx).unwrap_or("").trim();
        if lon.is_empty() || lat.is_empty() {
            skipped += 1;
            continue;
        }

        let parse = |value: &str| {
            value.parse::<f64>().map_err(|_| InputError::BadCoordinate {
                path: path.clone(),
                line,
                value: value.to_string(),
            })
        };
        match observation_at(&[parse(lon)?, parse(lat)?]) {
            Some(observation) => observations.push(observation),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, path = ?path, "ignored rows without coordinates");
    }

    Ok(ObservationCollection::new(observations))
}

fn geometry_error(path: &Path, reason: impl ToString) -> InputError {
    InputError::Geometry {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

/// Missing, null or non-numeric populations read as zero.
fn json_population(value: Option<&JsonValue>) -> u64 {
    match value {
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(population_from))
            .unwrap_or(0),
        Some(JsonValue::String(s)) => s.trim().replace(',', "").parse::<f64>().map(population_from).unwrap_or(0),
        _ => 0,
    }
}

fn field_number(value: Option<&FieldValue>) -> Option<f64> {
    match value? {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn population_from(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
