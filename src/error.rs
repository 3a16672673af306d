use std::path::PathBuf;

/// Failure to load one of the two input layers. Any of these aborts the
/// session before aggregation starts.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse GeoJSON {path:?}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path:?} must contain a FeatureCollection")]
    NotFeatureCollection { path: PathBuf },

    #[error("failed to read CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column '{column}' not found in {path:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("invalid coordinate '{value}' on line {line} of {path:?}")]
    BadCoordinate {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("failed to read shapefile {path:?}: {source}")]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("failed to convert geometry in {path:?}: {reason}")]
    Geometry { path: PathBuf, reason: String },

    #[error("unsupported input format '{extension}' for {path:?}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("input loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Invalid threshold/label/colour configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaletteError {
    #[error("palette needs at least one bucket")]
    Empty,

    #[error("threshold {value} at position {index} is not finite")]
    NonFiniteThreshold { index: usize, value: f64 },

    #[error("thresholds must be strictly decreasing: {previous} then {current} at position {index}")]
    NotDecreasing {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("'{color}' is not a hex colour (expected #RGB or #RRGGBB)")]
    BadColor { color: String },
}
