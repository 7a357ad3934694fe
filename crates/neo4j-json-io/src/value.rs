//! Property values and their canonical JSON encoding.
//!
//! Neo4j properties carry types JSON has no notion of (temporal values,
//! durations, spatial points, byte arrays, 64-bit integers). `PropertyValue`
//! is the typed form decoded from the Query API's typed JSON, and its
//! `Serialize` impl is the one place where those types degrade to JSON:
//!
//! | Kind | JSON |
//! |------|------|
//! | null, boolean, string | same |
//! | integer | integer |
//! | float | number, `null` when not finite |
//! | bytes | base64 string |
//! | list, map | array, object (recursively) |
//! | date, time, datetime, ... | ISO-8601 string |
//! | duration | ISO-8601 duration string |
//! | point | `{"srid", "x", "y"}` plus `"z"` for 3-D points |

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Property map of a node or relationship.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A typed property value as stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Absent value.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Byte array, kept base64-encoded.
    Bytes(String),
    /// Homogeneous or mixed list.
    List(Vec<PropertyValue>),
    /// Nested map.
    Map(BTreeMap<String, PropertyValue>),
    /// Date or time value in ISO-8601 form.
    Temporal {
        /// Which temporal type the server reported.
        kind: TemporalKind,
        /// ISO-8601 text.
        value: String,
    },
    /// ISO-8601 duration, e.g. `P14DT16H12M`.
    Duration(String),
    /// Spatial point.
    Point(Point),
}

/// Neo4j temporal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// `Date`
    Date,
    /// `Time` (with offset)
    Time,
    /// `LocalTime`
    LocalTime,
    /// `DateTime` (with offset or zone)
    DateTime,
    /// `LocalDateTime`
    LocalDateTime,
}

/// A 2-D or 3-D spatial point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Coordinate reference system id (4326, 4979, 7203, 9157).
    pub srid: u32,
    /// X or longitude.
    pub x: f64,
    /// Y or latitude.
    pub y: f64,
    /// Z or height, 3-D points only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    /// Parses the Query API's extended WKT form, e.g.
    /// `SRID=4326;POINT (12.5 55.6)` or `SRID=4979;POINT Z (12.5 55.6 10)`.
    pub fn parse_wkt(text: &str) -> Result<Self> {
        let invalid = || Error::Query(format!("Invalid point value: '{}'", text));

        let (srid_part, geometry) = text.split_once(';').ok_or_else(invalid)?;
        let srid = srid_part
            .trim()
            .strip_prefix("SRID=")
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(invalid)?;

        let body = geometry
            .trim()
            .strip_prefix("POINT")
            .ok_or_else(invalid)?
            .trim_start();
        let body = body.strip_prefix('Z').unwrap_or(body).trim();
        let coords = body
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let values = coords
            .split_whitespace()
            .map(|c| c.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;

        match values.as_slice() {
            [x, y] => Ok(Self {
                srid,
                x: *x,
                y: *y,
                z: None,
            }),
            [x, y, z] => Ok(Self {
                srid,
                x: *x,
                y: *y,
                z: Some(*z),
            }),
            _ => Err(invalid()),
        }
    }
}

impl PropertyValue {
    /// Decodes one value of the Query API typed JSON format
    /// (`{"$type": "...", "_value": ...}`).
    pub fn from_typed_json(value: &Value) -> Result<Self> {
        let type_name = value
            .get("$type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Query(format!("Value without '$type': {}", value)))?;
        let inner = value.get("_value").unwrap_or(&Value::Null);

        let decoded = match type_name {
            "Null" => Self::Null,
            "Boolean" => Self::Boolean(
                inner
                    .as_bool()
                    .ok_or_else(|| type_mismatch(type_name, inner))?,
            ),
            "Integer" => Self::Integer(parse_integer(inner)?),
            "Float" => Self::Float(parse_float(inner)?),
            "String" => Self::String(expect_str(type_name, inner)?.to_string()),
            "Base64" => Self::Bytes(expect_str(type_name, inner)?.to_string()),
            "List" => {
                let items = inner
                    .as_array()
                    .ok_or_else(|| type_mismatch(type_name, inner))?;
                Self::List(
                    items
                        .iter()
                        .map(Self::from_typed_json)
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            "Map" => Self::Map(decode_properties(inner)?),
            "Date" => temporal(TemporalKind::Date, type_name, inner)?,
            "Time" => temporal(TemporalKind::Time, type_name, inner)?,
            "LocalTime" => temporal(TemporalKind::LocalTime, type_name, inner)?,
            "DateTime" | "OffsetDateTime" | "ZonedDateTime" => {
                temporal(TemporalKind::DateTime, type_name, inner)?
            }
            "LocalDateTime" => temporal(TemporalKind::LocalDateTime, type_name, inner)?,
            "Duration" => Self::Duration(expect_str(type_name, inner)?.to_string()),
            "Point" => Self::Point(Point::parse_wkt(expect_str(type_name, inner)?)?),
            other => {
                return Err(Error::Query(format!(
                    "Unsupported property type '{}'",
                    other
                )))
            }
        };

        Ok(decoded)
    }
}

/// Decodes a typed JSON object (`{"key": {"$type": ..., "_value": ...}}`)
/// into a property map.
pub fn decode_properties(value: &Value) -> Result<Properties> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, val)| PropertyValue::from_typed_json(val).map(|v| (key.clone(), v)))
            .collect(),
        Value::Null => Ok(Properties::new()),
        other => Err(Error::Query(format!(
            "Expected a property map, got {}",
            other
        ))),
    }
}

fn type_mismatch(type_name: &str, value: &Value) -> Error {
    Error::Query(format!("Malformed {} value: {}", type_name, value))
}

fn expect_str<'a>(type_name: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| type_mismatch(type_name, value))
}

fn temporal(kind: TemporalKind, type_name: &str, value: &Value) -> Result<PropertyValue> {
    Ok(PropertyValue::Temporal {
        kind,
        value: expect_str(type_name, value)?.to_string(),
    })
}

// The Query API sends integers as strings to keep 64-bit precision.
fn parse_integer(value: &Value) -> Result<i64> {
    match value {
        Value::String(s) => s.parse().map_err(|_| type_mismatch("Integer", value)),
        Value::Number(n) => n.as_i64().ok_or_else(|| type_mismatch("Integer", value)),
        _ => Err(type_mismatch("Integer", value)),
    }
}

fn parse_float(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => s.parse().map_err(|_| type_mismatch("Float", value)),
        },
        Value::Number(n) => n.as_f64().ok_or_else(|| type_mismatch("Float", value)),
        _ => Err(type_mismatch("Float", value)),
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(_) => serializer.serialize_unit(),
            Self::String(s) | Self::Bytes(s) | Self::Duration(s) => serializer.serialize_str(s),
            Self::Temporal { value, .. } => serializer.serialize_str(value),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
            Self::Point(point) => point.serialize(serializer),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}

impl From<Point> for PropertyValue {
    fn from(value: Point) -> Self {
        Self::Point(value)
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
