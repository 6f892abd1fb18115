//! Universal decoded-telemetry frame model.
//!
//! Every packet decoder normalizes its game-specific wire format into a
//! [`Frame`]: a flat map from field name to a numeric or string value, always
//! tagged with a capture timestamp `t` and a `packet_type` discriminator that
//! downstream consumers use for routing. Frames are plain values; once a
//! decoder returns one, ownership passes entirely to the caller and nothing
//! in the frame refers back to decoder state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single telemetry field value.
///
/// Serialized untagged so a frame round-trips as a flat JSON object
/// (`{"speed": 301, "name": "VER"}`), matching what charting clients consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Floating-point value.
    Float(f64),
    /// Integer value.
    Int(i64),
    /// String value.
    Text(String),
}

impl FieldValue {
    /// Numeric view of this value; strings yield `None`.
    #[expect(clippy::cast_precision_loss, reason = "display-precision accessor")]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Text(_) => None,
        }
    }

    /// Integer view of this value, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i8> for FieldValue {
    fn from(v: i8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// One decoded telemetry sample.
///
/// Immutable by convention once returned from a decoder: decoders build a
/// frame, hand it over and keep no reference to it (the derivative state they
/// retain is a separate snapshot of the raw inputs, not the frame itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture timestamp, assigned locally at decode time. Unit is
    /// per-format (milliseconds for the Forza and F1 families, seconds for
    /// Assetto Corsa) and matches what the charting layer of each game
    /// config expects.
    pub t: f64,

    /// Sub-type discriminator identifying which logical record this frame
    /// carries, used downstream for routing and multiplexing.
    pub packet_type: i32,

    /// Format-specific fields, keyed by the wire-spec field name.
    #[serde(flatten)]
    pub fields: HashMap<String, FieldValue>,
}

impl Frame {
    /// Creates an empty frame with the given discriminator and timestamp.
    pub fn new(packet_type: i32, t: f64) -> Self {
        Self {
            t,
            packet_type,
            fields: HashMap::new(),
        }
    }

    /// Inserts a field, overwriting any previous value under the same name.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_owned(), value.into());
    }

    /// Raw field lookup.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Numeric field lookup; missing fields and strings yield `None`.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(FieldValue::as_f64)
    }

    /// Integer field lookup.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(FieldValue::as_i64)
    }

    /// String field lookup.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
///
/// Frames only ever compare timestamps within one process run, so a clock
/// skew across restarts is harmless; an unreadable clock degrades to 0.
#[expect(clippy::cast_precision_loss, reason = "millisecond timestamps fit f64 comfortably")]
pub fn wall_clock_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

/// Wall-clock time in seconds since the Unix epoch.
pub fn wall_clock_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
