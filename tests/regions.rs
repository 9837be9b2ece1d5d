use geocute::{GridOptions, RegionIndex};
use serde_json::json;

fn square(x0: f64, y0: f64, size: f64) -> serde_json::Value {
    json!([[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]]])
}

fn districts() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "wkr": 75, "name": "Mitte" },
              "geometry": { "type": "Polygon", "coordinates": square(13.0, 52.0, 1.0) } },
            { "type": "Feature", "properties": { "wkr": 76, "name": "Pankow" },
              "geometry": { "type": "Polygon", "coordinates": square(14.0, 52.0, 1.0) } },
            { "type": "Feature", "properties": { "wkr": 77, "name": "Island" },
              "geometry": { "type": "MultiPolygon", "coordinates": [square(13.2, 52.2, 0.1), square(16.0, 52.0, 0.5)] } }
        ]
    })
}

fn load(collection: &serde_json::Value, file: &str) -> (tempfile::TempDir, RegionIndex) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file);
    std::fs::write(&path, serde_json::to_vec(collection).unwrap()).unwrap();
    let index = RegionIndex::load(&path, GridOptions { cells: 16, padding: 1e-6 }).unwrap();
    (dir, index)
}

#[test]
fn loads_and_classifies_geojson() {
    let (_dir, index) = load(&districts(), "wahlkreise.geojson");
    assert_eq!(index.len(), 3);
    index.require_key("wkr").unwrap();
    assert!(index.require_key("AGS").is_err());

    let key = |x: f64, y: f64| index.classify(x, y).and_then(|f| f.key_string("wkr"));
    assert_eq!(key(13.7, 52.7).as_deref(), Some("75"));
    assert_eq!(key(14.5, 52.5).as_deref(), Some("76"));
    assert_eq!(key(16.25, 52.25).as_deref(), Some("77"));
    assert_eq!(key(15.5, 52.5), None);
    assert_eq!(key(0.0, 0.0), None);
}

#[test]
fn nested_island_wins_by_area() {
    let (_dir, index) = load(&districts(), "wahlkreise.geojson");
    assert_eq!(index.classify(13.25, 52.25).map(|f| f.index()), Some(2));
}

#[test]
fn membership_splits_points_by_state() {
    let (_dir, index) = load(&districts(), "wahlkreise.geojson");
    let east = index.membership(&["76", "77"], "wkr");
    assert!(east.contains(14.5, 52.5));
    assert!(east.contains(16.1, 52.1));
    assert!(!east.contains(13.5, 52.5));
}

#[test]
fn overlaps_between_collections() {
    let (_dir, index) = load(&districts(), "wahlkreise.geojson");
    let municipalities = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "AGS": "1" },
              "geometry": { "type": "Polygon", "coordinates": square(13.5, 52.0, 1.0) } }
        ]
    });
    let (_other, other) = load(&municipalities, "gemeinden.geojson");

    let overlaps = index.find_overlaps(&other.features()[0]);
    assert_eq!(overlaps.iter().map(|o| o.feature).collect::<Vec<_>>(), vec![0, 1]);
    assert!((overlaps[0].fraction - 0.5).abs() < 1e-9);
    assert!((overlaps[1].fraction - 0.5).abs() < 1e-9);
}

#[test]
fn rejects_point_geometries() {
    let collection = json!({
        "type": "FeatureCollection",
        "features": [{ "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1, 2] } }]
    });
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.geojson");
    std::fs::write(&path, serde_json::to_vec(&collection).unwrap()).unwrap();
    assert!(RegionIndex::load(&path, GridOptions::default()).is_err());
}
