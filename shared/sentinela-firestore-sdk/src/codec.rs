//! Firestore REST value codec
//!
//! Firestore's REST API wraps every field value in a single-key object naming
//! its type:
//!
//! ```text
//! {"stringValue": "hi"}            {"integerValue": "42"}
//! {"doubleValue": 1.5}             {"booleanValue": true}
//! {"timestampValue": "2025-..Z"}   {"nullValue": null}
//! {"arrayValue": {"values": [..]}} {"mapValue": {"fields": {..}}}
//! ```
//!
//! [`WireValue`] is that representation parsed into a closed enum;
//! [`encode`] and [`decode`] translate between it and the native [`Value`].
//! Integers always travel as decimal strings.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map};
use std::collections::BTreeMap;

use crate::value::{Fields, Value};

/// Field name to wire value mapping, the `fields` object of a document
pub type WireFields = BTreeMap<String, WireValue>;

/// A single Firestore REST field value
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// ISO-8601 text, carried as-is
    Timestamp(String),
    Array(Vec<WireValue>),
    Map(WireFields),
    Null,
    /// JSON that carries no recognized type tag, or a recognized tag with a
    /// payload of the wrong shape. Decoded by passthrough.
    Unrecognized(serde_json::Value),
}

impl WireValue {
    /// Parse one wire value from its JSON form. Never fails: shapes that are
    /// not understood become [`WireValue::Unrecognized`].
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(map) => Self::from_tagged(map),
            other => WireValue::Unrecognized(other),
        }
    }

    /// Tags are checked in a fixed order; the first one present decides.
    /// Container payloads are moved out only once their shape checks out,
    /// so a rejected map is returned intact.
    fn from_tagged(mut map: Map<String, serde_json::Value>) -> Self {
        let parsed = if let Some(payload) = map.get("stringValue") {
            payload.as_str().map(|s| WireValue::String(s.to_string()))
        } else if let Some(payload) = map.get("integerValue") {
            parse_integer(payload).map(WireValue::Integer)
        } else if let Some(payload) = map.get("doubleValue") {
            parse_double(payload).map(WireValue::Double)
        } else if let Some(payload) = map.get("booleanValue") {
            payload.as_bool().map(WireValue::Boolean)
        } else if let Some(payload) = map.get("timestampValue") {
            payload.as_str().map(|s| WireValue::Timestamp(s.to_string()))
        } else if map.contains_key("arrayValue") {
            take_array(&mut map)
        } else if map.contains_key("mapValue") {
            take_map(&mut map)
        } else if map.contains_key("nullValue") {
            Some(WireValue::Null)
        } else {
            None
        };

        parsed.unwrap_or_else(|| WireValue::Unrecognized(serde_json::Value::Object(map)))
    }

    /// Render the JSON form expected by the REST API
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            WireValue::String(s) => json!({ "stringValue": s }),
            WireValue::Integer(n) => json!({ "integerValue": n.to_string() }),
            WireValue::Double(f) => json!({ "doubleValue": double_to_json(*f) }),
            WireValue::Boolean(b) => json!({ "booleanValue": b }),
            WireValue::Timestamp(ts) => json!({ "timestampValue": ts }),
            WireValue::Array(values) => {
                let values: Vec<serde_json::Value> = values.iter().map(Self::to_json).collect();
                json!({ "arrayValue": { "values": values } })
            }
            WireValue::Map(fields) => json!({ "mapValue": { "fields": fields_to_json(fields) } }),
            WireValue::Null => json!({ "nullValue": null }),
            WireValue::Unrecognized(raw) => raw.clone(),
        }
    }
}

/// `{"arrayValue": {"values": [..]}}`, `values` optional
fn take_array(map: &mut Map<String, serde_json::Value>) -> Option<WireValue> {
    let wrapper = map.get_mut("arrayValue")?.as_object_mut()?;
    match wrapper.get("values") {
        None => Some(WireValue::Array(Vec::new())),
        Some(serde_json::Value::Array(_)) => match wrapper.remove("values") {
            Some(serde_json::Value::Array(items)) => Some(WireValue::Array(
                items.into_iter().map(WireValue::from_json).collect(),
            )),
            _ => None,
        },
        Some(_) => None,
    }
}

/// `{"mapValue": {"fields": {..}}}`, `fields` optional
fn take_map(map: &mut Map<String, serde_json::Value>) -> Option<WireValue> {
    let wrapper = map.get_mut("mapValue")?.as_object_mut()?;
    match wrapper.get("fields") {
        None => Some(WireValue::Map(WireFields::new())),
        Some(serde_json::Value::Object(_)) => match wrapper.remove("fields") {
            Some(serde_json::Value::Object(entries)) => Some(WireValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, WireValue::from_json(v)))
                    .collect(),
            )),
            _ => None,
        },
        Some(_) => None,
    }
}

fn parse_integer(payload: &serde_json::Value) -> Option<i64> {
    match payload {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// The REST API sends the non-finite doubles as strings.
fn parse_double(payload: &serde_json::Value) -> Option<f64> {
    match payload {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn double_to_json(f: f64) -> serde_json::Value {
    if f.is_nan() {
        json!("NaN")
    } else if f.is_infinite() {
        json!(if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        json!(f)
    }
}

fn fields_to_json(fields: &WireFields) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(WireValue::from_json)
    }
}

/// Parse a REST API body with no nesting limit.
///
/// Every native nesting level takes two JSON levels on the wire (`mapValue`
/// then `fields`), so serde_json's default limit of 128 would cap documents
/// at about 64 levels. The stack grows on demand instead.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// Translate a native value into its wire form
pub fn encode(value: Value) -> WireValue {
    match value {
        Value::String(s) => WireValue::String(s),
        Value::Integer(n) => WireValue::Integer(n),
        Value::Float(f) => WireValue::Double(f),
        Value::Boolean(b) => WireValue::Boolean(b),
        Value::Null => WireValue::Null,
        Value::List(items) => WireValue::Array(items.into_iter().map(encode).collect()),
        Value::Map(fields) => WireValue::Map(encode_fields(fields)),
    }
}

/// Encode every value of a field mapping, keeping all keys
pub fn encode_fields(fields: Fields) -> WireFields {
    fields.into_iter().map(|(k, v)| (k, encode(v))).collect()
}

/// Translate a wire value into its native form
pub fn decode(wire: WireValue) -> Value {
    match wire {
        WireValue::String(s) => Value::String(s),
        WireValue::Integer(n) => Value::Integer(n),
        WireValue::Double(f) => Value::Float(f),
        WireValue::Boolean(b) => Value::Boolean(b),
        WireValue::Timestamp(ts) => Value::String(ts),
        WireValue::Array(values) => Value::List(values.into_iter().map(decode).collect()),
        WireValue::Map(fields) => Value::Map(decode_fields(fields)),
        WireValue::Null => Value::Null,
        WireValue::Unrecognized(raw) => Value::from(raw),
    }
}

/// Decode every value of a wire field mapping, keeping all keys
pub fn decode_fields(fields: WireFields) -> Fields {
    fields.into_iter().map(|(k, v)| (k, decode(v))).collect()
}
