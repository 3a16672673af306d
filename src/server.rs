use crate::render::Legend;
use crate::session::Session;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::bounding_rect::BoundingRect;
use geo::Point;
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Bounding box of one region, pointing back into `Session::regions`.
pub struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub session: Session,
    pub tree: RTree<RegionEnvelope>,
    pub styled: FeatureCollection,
    pub legend: Legend,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let envelopes: Vec<RegionEnvelope> = session
            .regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let rect = region.geometry.bounding_rect()?;
                Some(RegionEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(envelopes),
            styled: session.styled_collection(),
            legend: session.legend(),
            session,
        }
    }

    /// The first region containing the point, using the session's boundary rule.
    pub fn lookup(&self, lon: f64, lat: f64) -> Option<RegionInfo> {
        let point = Point::new(lon, lat);
        let boundary = self.session.config.aggregation.boundary;

        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter_map(|candidate| self.session.regions.regions.get(candidate.index))
            .find(|region| boundary.contains(&region.geometry, &point))
            .map(|region| {
                let metric = region.metric.unwrap_or(0.0);
                let class = self.session.classifier.classify(metric);
                RegionInfo {
                    name: region.name.clone(),
                    population: region.population,
                    metric,
                    label: class.label.to_string(),
                    color: class.color.to_string(),
                }
            })
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

/// What the info panel shows for the hovered region.
#[derive(Debug, Serialize, PartialEq)]
pub struct RegionInfo {
    pub name: String,
    pub population: u64,
    pub metric: f64,
    pub label: String,
    pub color: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.session.config.server.static_dir);

    Router::new()
        .route("/api/regions", get(regions_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(static_dir)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(session: Session) -> Result<()> {
    info!("building spatial index for API");
    let port = session.config.server.port;
    let state = Arc::new(AppState::new(session));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.styled.clone())
}

async fn legend_handler(State(state): State<Arc<AppState>>) -> Json<Legend> {
    Json(state.legend.clone())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<RegionInfo>> {
    Json(state.lookup(params.lon, params.lat))
}
