use geo::{Area, BoundingRect, MultiPolygon, Rect};
use serde_json::{Map, Value};

/// One polygon feature of a region collection.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    index: usize, // Position of the feature in its source collection
    shape: MultiPolygon<f64>,
    properties: Map<String, Value>,
    bbox: Option<Rect<f64>>,
    area: f64,
}

impl RegionFeature {
    /// Wrap a shape, caching its bounding box and area.
    pub fn new(index: usize, shape: MultiPolygon<f64>, properties: Map<String, Value>) -> Self {
        let bbox = shape.bounding_rect();
        let area = shape.unsigned_area();
        Self { index, shape, properties, bbox, area }
    }

    /// Move the feature to position `index` of a collection.
    #[inline]
    pub(super) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Get the dense index of this feature in its collection.
    #[inline] pub fn index(&self) -> usize { self.index }

    /// Get a reference to the feature's geometry.
    #[inline] pub fn shape(&self) -> &MultiPolygon<f64> { &self.shape }

    /// Get a reference to the feature's properties.
    #[inline] pub fn properties(&self) -> &Map<String, Value> { &self.properties }

    /// Bounding box, `None` for an empty shape.
    #[inline] pub fn bbox(&self) -> Option<Rect<f64>> { self.bbox }

    /// Planar area in squared degrees.
    #[inline] pub fn area(&self) -> f64 { self.area }

    /// Stringified value of property `key`, if present and not null.
    pub fn key_string(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(property_string)
    }

    /// Properties whose names don't start with an underscore.
    pub fn public_properties(&self) -> Map<String, Value> {
        self.properties.iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Render a property value the way it appears in matrix keys: strings unquoted, numbers as written.
pub fn property_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
