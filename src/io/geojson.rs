//! GeoJSON reading (region sources) and writing (diagnostics side-files).

use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::common::{read_decompressed, write_compressed, Compression};
use crate::error::CodecError;
use crate::regions::RegionFeature;

const CONTEXT: &str = "io::geojson";

/// Read a FeatureCollection file, decompressing `.gz`/`.br` by extension.
pub fn read_features_file(path: &Path) -> Result<Vec<RegionFeature>> {
    let bytes = read_decompressed(path)?;
    read_features(&bytes)
        .with_context(|| format!("[io::geojson] Failed to read regions from {}", path.display()))
}

/// Parse a FeatureCollection of Polygon/MultiPolygon features.
/// Each feature's `index` is its position in the collection; null geometries become empty shapes.
pub fn read_features(bytes: &[u8]) -> Result<Vec<RegionFeature>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CodecError::format(CONTEXT, format!("invalid JSON: {e}")))?;
    let features = value.get("features").and_then(Value::as_array)
        .ok_or_else(|| CodecError::format(CONTEXT, "expected a FeatureCollection with a `features` array"))?;

    features.iter().enumerate()
        .map(|(index, feature)| -> Result<RegionFeature> {
            let shape = match feature.get("geometry") {
                None | Some(Value::Null) => MultiPolygon::new(Vec::new()),
                Some(geometry) => parse_geometry(geometry)
                    .with_context(|| format!("[io::geojson] Invalid geometry in feature {index}"))?,
            };
            let properties = match feature.get("properties") {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            Ok(RegionFeature::new(index, shape, properties))
        })
        .collect()
}

/// Parse a GeoJSON geometry object into a MultiPolygon.
fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = || geometry.get("coordinates").and_then(Value::as_array)
        .ok_or_else(|| CodecError::format(CONTEXT, "geometry has no `coordinates` array"));

    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => Ok(MultiPolygon::new(vec![parse_polygon(coords()?)?])),
        Some("MultiPolygon") => Ok(MultiPolygon::new(
            coords()?.iter()
                .map(|polygon| polygon.as_array()
                    .ok_or_else(|| CodecError::format(CONTEXT, "MultiPolygon member is not an array").into())
                    .and_then(|rings| parse_polygon(rings)))
                .collect::<Result<Vec<_>>>()?,
        )),
        Some("GeometryCollection") => {
            let members = geometry.get("geometries").and_then(Value::as_array)
                .ok_or_else(|| CodecError::format(CONTEXT, "GeometryCollection has no `geometries` array"))?;
            let mut polygons = Vec::new();
            for member in members {
                polygons.extend(parse_geometry(member)?.0);
            }
            Ok(MultiPolygon::new(polygons))
        }
        other => bail!(CodecError::format(CONTEXT, format!("unsupported geometry type {other:?}"))),
    }
}

/// Parse `[exterior, hole, hole, ...]`.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.as_array()
            .ok_or_else(|| CodecError::format(CONTEXT, "ring is not an array").into())
            .and_then(|positions| parse_ring(positions))
    });
    let exterior = rings.next()
        .ok_or_else(|| CodecError::format(CONTEXT, "polygon has no exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse `[[x, y], [x, y], ...]`, closing the ring if needed.
fn parse_ring(positions: &[Value]) -> Result<LineString<f64>> {
    let mut coords = positions.iter()
        .map(|position| -> Result<Coord<f64>> {
            let xy = position.as_array().filter(|a| a.len() >= 2)
                .ok_or_else(|| CodecError::format(CONTEXT, "position is not an [x, y] array"))?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(CodecError::format(CONTEXT, "position coordinates must be numbers").into()),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    Ok(LineString(coords))
}

/// Convert a MultiPolygon to a GeoJSON geometry object.
pub fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let polygons = mp.0.iter()
        .map(|polygon| std::iter::once(ring(polygon.exterior()))
            .chain(polygon.interiors().iter().map(ring))
            .collect::<Vec<_>>())
        .collect::<Vec<_>>();
    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// A Point feature with the given properties.
pub fn point_feature(x: f64, y: f64, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [x, y] },
        "properties": properties,
    })
}

/// A region feature with its original properties plus `_index`.
pub fn region_feature(feature: &RegionFeature) -> Value {
    let mut properties = feature.properties().clone();
    properties.insert("_index".to_string(), json!(feature.index()));
    json!({
        "type": "Feature",
        "geometry": multipolygon_to_geojson(feature.shape()),
        "properties": properties,
    })
}

/// Wrap features into a FeatureCollection.
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Serialize `value` to `path`, compressing by extension.
pub fn write_geojson(path: &Path, value: &Value) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .context("[io::geojson] Failed to serialize GeoJSON")?;
    write_compressed(path, &bytes, Compression::from_path(path))
}
