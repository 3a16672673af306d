pub mod aggregate;
pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod render;
pub mod server;
pub mod session;
pub mod types;

pub use aggregate::{points_within, AggregationSummary, Aggregator, BoundaryRule, IndexStrategy};
pub use classify::{Bucket, Classifier, Comparison, FloorBucket};
pub use error::{InputError, PaletteError};
pub use session::Session;
pub use types::{Observation, ObservationCollection, Region, RegionCollection};
