use geo::{MultiPolygon, Point};
use serde_json::{Map, Value};

/// An administrative area (a county) from the polygon layer.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub population: u64,
    pub geometry: MultiPolygon<f64>,
    // Original feature attributes, passed through to the rendered output.
    pub properties: Map<String, Value>,
    pub metric: Option<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, population: u64, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            population,
            geometry,
            properties: Map::new(),
            metric: None,
        }
    }

    /// Population used as the divisor. Zero-population regions divide by one,
    /// so their metric is the raw observation count.
    pub fn effective_population(&self) -> u64 {
        self.population.max(1)
    }
}

/// A single sighting, longitude on `x` and latitude on `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub point: Point<f64>,
}

impl Observation {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            point: Point::new(longitude, latitude),
        }
    }

    pub fn longitude(&self) -> f64 {
        self.point.x()
    }

    pub fn latitude(&self) -> f64 {
        self.point.y()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionCollection {
    pub regions: Vec<Region>,
}

impl RegionCollection {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// True once every region carries a metric.
    pub fn is_aggregated(&self) -> bool {
        self.regions.iter().all(|r| r.metric.is_some())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservationCollection {
    pub observations: Vec<Observation>,
}

impl ObservationCollection {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }
}

impl FromIterator<Observation> for ObservationCollection {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
