use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An attribute value attached to a record.
///
/// Loaders hand over whatever the source column holds: text for categorical
/// columns and either booleans or `0`/`1` integers for flag columns. Both flag
/// encodings compare equal through [`AttributeValue::truthy`].
///
/// # Examples
///
/// ```
/// use geocluster_types::point::AttributeValue;
///
/// assert!(AttributeValue::Integer(1).truthy());
/// assert!(AttributeValue::Flag(true).truthy());
/// assert!(!AttributeValue::Integer(0).truthy());
/// assert_eq!(AttributeValue::from("Kenya").as_text(), Some("Kenya"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl AttributeValue {
    /// Truthiness with the usual SQL/JSON conventions: non-zero integers and
    /// non-empty strings are true.
    pub fn truthy(&self) -> bool {
        match self {
            AttributeValue::Flag(flag) => *flag,
            AttributeValue::Integer(value) => *value != 0,
            AttributeValue::Text(text) => !text.is_empty(),
        }
    }

    /// The text payload, if this is a categorical value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Collapse integer flags into `Flag` so records echo back a single encoding.
    pub fn normalized_flag(&self) -> AttributeValue {
        AttributeValue::Flag(self.truthy())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Flag(flag) => write!(f, "{}", u8::from(*flag)),
            AttributeValue::Integer(value) => write!(f, "{}", value),
            AttributeValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Flag(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// A geo-tagged record with its filterable attributes.
///
/// Coordinates are expected to be validated by whoever constructs the record;
/// the cluster index trusts them.
///
/// # Examples
///
/// ```
/// use geocluster_types::point::GeoPoint;
///
/// let point = GeoPoint::new("abc", 8.6753, 9.0820);
/// assert_eq!(point.latitude(), 9.0820);
/// assert!(point.attributes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Opaque identifier from the source dataset
    pub id: String,
    /// Location as (longitude, latitude)
    pub location: Point<f64>,
    /// Attribute name to value, echoed back for unclustered points
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl GeoPoint {
    /// Create a record without attributes.
    pub fn new(id: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(longitude, latitude),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute, replacing any previous value under that name.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
