use spider_choropleth::config::AppConfig;
use spider_choropleth::Session;
use std::fs;
use tempfile::TempDir;

const COUNTIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"NAME": "Benton", "Population": 1000},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
        {"type": "Feature", "properties": {"NAME": "Wheeler", "Population": 0},
         "geometry": {"type": "Polygon", "coordinates": [[[20,0],[30,0],[30,10],[20,10],[20,0]]]}},
        {"type": "Feature", "properties": {"NAME": "Lake", "Population": 500},
         "geometry": {"type": "MultiPolygon", "coordinates": [[[[40,0],[50,0],[50,10],[40,10],[40,0]]]]}},
        {"type": "Feature", "properties": {"NAME": "Centroid"},
         "geometry": {"type": "Point", "coordinates": [5, 5]}}
    ]
}"#;

fn point(x: f64, y: f64) -> String {
    format!(r#"{{"type": "Feature", "properties": {{}}, "geometry": {{"type": "Point", "coordinates": [{x}, {y}]}}}}"#)
}

fn sightings() -> String {
    let mut features: Vec<String> = (1..=5).map(|i| point(i as f64, i as f64)).collect();
    features.extend((1..=3).map(|i| point(20.0 + i as f64, 5.0)));
    features.push(point(100.0, 100.0));
    features.push(r#"{"type": "Feature", "properties": {}, "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}"#.to_string());
    format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(","))
}

fn config(dir: &TempDir, regions: &str, observations: &str, extra: &str) -> AppConfig {
    let toml = format!(
        r#"
        [input]
        regions = {regions:?}
        observations = {observations:?}

        [output]
        geojson = {geojson:?}
        legend = {legend:?}
        {extra}
        "#,
        regions = dir.path().join(regions),
        observations = dir.path().join(observations),
        geojson = dir.path().join("out/regions.geojson"),
        legend = dir.path().join("out/legend.json"),
    );
    AppConfig::from_toml(&toml).unwrap()
}

fn fixtures() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("counties.geojson"), COUNTIES).unwrap();
    fs::write(dir.path().join("spiders.geojson"), sightings()).unwrap();
    dir
}

#[tokio::test]
async fn end_to_end_aggregation() {
    let dir = fixtures();
    let session = Session::prepare(config(&dir, "counties.geojson", "spiders.geojson", ""))
        .await
        .unwrap();

    let metrics: Vec<_> = session.regions.iter().map(|r| (r.name.as_str(), r.metric)).collect();
    assert_eq!(
        metrics,
        vec![("Benton", Some(0.005)), ("Wheeler", Some(3.0)), ("Lake", Some(0.0))]
    );
    assert_eq!(session.summary.observations, 9);
    assert_eq!(session.summary.counted, 8);
    assert_eq!(session.summary.matched, 8);
    assert_eq!(session.summary.unassigned(), 1);
    assert_eq!(session.summary.zero_population, 1);

    assert_eq!(session.classifier.color(3.0), "#800026");
    assert_eq!(session.classifier.color(0.0), "#FED976");

    session.write_outputs().unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/regions.geojson")).unwrap()).unwrap();
    let features = written["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["spidersPerPerson"], 0.005);
    assert_eq!(features[0]["properties"]["fillColor"], "#FC4E2A");
    assert_eq!(features[1]["properties"]["fillColor"], "#800026");
    assert!(dir.path().join("out/legend.json").exists());
}

#[tokio::test]
async fn inclusive_comparison_matches_threshold() {
    let dir = fixtures();
    let extra = "[classification]\ncomparison = \"at_least\"";
    let session = Session::prepare(config(&dir, "counties.geojson", "spiders.geojson", extra))
        .await
        .unwrap();

    assert_eq!(session.regions.regions[0].metric, Some(0.005));
    assert_eq!(session.classifier.color(0.005), "#E31A1C");
}

#[tokio::test]
async fn missing_layer_aborts_session() {
    let dir = fixtures();
    let result = Session::prepare(config(&dir, "counties.geojson", "nope.geojson", "")).await;
    assert!(result.is_err());

    let result = Session::prepare(config(&dir, "nope.geojson", "spiders.geojson", "")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn invalid_palette_aborts_before_loading() {
    let dir = fixtures();
    let extra = r##"
        [[classification.buckets]]
        threshold = 0.1
        label = "a"
        color = "not a colour"
    "##;
    let err = Session::prepare(config(&dir, "counties.geojson", "spiders.geojson", extra))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("hex colour"));
}
