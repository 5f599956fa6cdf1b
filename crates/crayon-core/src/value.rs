//! Dynamic values carried by component props, state bindings and action payloads.
//!
//! [`DynamicValue`] is a closed tagged union over everything JSON can express.
//! Integral JSON numbers decode as [`DynamicValue::Int`] and encode back as
//! integers, so `42` never turns into `42.0` on a round trip.
//!
//! # Example
//!
//! ```rust
//! use crayon_core::value::{decode, encode, DynamicValue};
//!
//! let value = decode(br#"{"count": 42, "ratio": 0.5}"#).unwrap();
//! assert_eq!(value.get("count"), Some(&DynamicValue::Int(42)));
//! assert_eq!(encode(&value).unwrap(), br#"{"count":42,"ratio":0.5}"#.to_vec());
//! ```

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Mapping from string keys to dynamic values
pub type ValueMap = BTreeMap<String, DynamicValue>;

/// Any JSON-representable value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicValue {
    /// JSON `null`
    #[default]
    Null,
    /// JSON boolean
    Bool(bool),
    /// Integral number
    Int(i64),
    /// Non-integral (or out of `i64` range) number. Integral JSON numbers
    /// such as `2.0` decode as [`DynamicValue::Int`].
    Float(f64),
    /// String
    String(String),
    /// Ordered sequence
    Array(Vec<DynamicValue>),
    /// String-keyed mapping
    Object(ValueMap),
}

/// Codec errors
#[derive(Debug, Error)]
pub enum ValueError {
    /// Bytes were not JSON or matched none of the value shapes
    #[error("Failed to decode dynamic value: {0}")]
    Decoding(String),

    /// Value contains something JSON cannot represent
    #[error("Failed to encode dynamic value: {0}")]
    Encoding(String),
}

/// Decode JSON bytes into a [`DynamicValue`]. Integers are tried before
/// floats, so an integral number written as `2.0` or `1e3` comes back as an
/// `Int`; only non-integral or out-of-range numbers become `Float`.
pub fn decode(bytes: &[u8]) -> Result<DynamicValue, ValueError> {
    serde_json::from_slice(bytes).map_err(|e| ValueError::Decoding(e.to_string()))
}

/// Encode a [`DynamicValue`] as compact JSON bytes.
pub fn encode(value: &DynamicValue) -> Result<Vec<u8>, ValueError> {
    serde_json::to_vec(value).map_err(|e| ValueError::Encoding(e.to_string()))
}

impl DynamicValue {
    /// Short name of the variant, used in log lines and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of either number variant
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is an object
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Truthiness used by expressions: `null`, `false`, zero, the empty
    /// string and empty collections are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
        }
    }

    /// Equality where numbers compare by value across `Int` and `Float`.
    ///
    /// Arrays and objects compare structurally with the same rule applied to
    /// their elements.
    pub fn loose_eq(&self, other: &DynamicValue) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => self == other,
        }
    }

    /// Plain-text rendering: strings verbatim, `null` as the empty string,
    /// collections as compact JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => {
                if !f.is_finite() {
                    return Err(ser::Error::custom(format!("non-finite number {f}")));
                }
                serializer.serialize_f64(*f)
            }
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn number_from_f64(v: f64) -> DynamicValue {
    if v.is_finite() && v.fract() == 0.0 && (-I64_FLOAT_BOUND..I64_FLOAT_BOUND).contains(&v) {
        DynamicValue::Int(v as i64)
    } else {
        DynamicValue::Float(v)
    }
}

struct DynamicValueVisitor;

impl<'de> Visitor<'de> for DynamicValueVisitor {
    type Value = DynamicValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, boolean, number, string, array or object")
    }

    fn visit_unit<E: de::Error>(self) -> Result<DynamicValue, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<DynamicValue, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<DynamicValue, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<DynamicValue, E> {
        Ok(DynamicValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<DynamicValue, E> {
        Ok(DynamicValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<DynamicValue, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => DynamicValue::Int(i),
            Err(_) => DynamicValue::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<DynamicValue, E> {
        Ok(number_from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DynamicValue, E> {
        Ok(DynamicValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<DynamicValue, E> {
        Ok(DynamicValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DynamicValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DynamicValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<DynamicValue, A::Error> {
        let mut map = ValueMap::new();
        while let Some((key, value)) = access.next_entry::<String, DynamicValue>()? {
            map.insert(key, value);
        }
        Ok(DynamicValue::Object(map))
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DynamicValueVisitor)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => number_from_f64(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Non-finite floats have no JSON form and become `null`.
impl From<DynamicValue> for serde_json::Value {
    fn from(value: DynamicValue) -> Self {
        match value {
            DynamicValue::Null => Self::Null,
            DynamicValue::Bool(b) => Self::Bool(b),
            DynamicValue::Int(i) => Self::Number(i.into()),
            DynamicValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Self::Number)
                .unwrap_or(Self::Null),
            DynamicValue::String(s) => Self::String(s),
            DynamicValue::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            DynamicValue::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(v: Vec<DynamicValue>) -> Self {
        Self::Array(v)
    }
}

impl From<ValueMap> for DynamicValue {
    fn from(v: ValueMap) -> Self {
        Self::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_integral_numbers_stay_integers() {
        let value = decode(b"[1, 2.0, -3, 2.5, 1e3, -0.0]").unwrap();
        assert_eq!(
            value,
            DynamicValue::Array(vec![
                DynamicValue::Int(1),
                DynamicValue::Int(2),
                DynamicValue::Int(-3),
                DynamicValue::Float(2.5),
                DynamicValue::Int(1000),
                DynamicValue::Int(0),
            ])
        );
        assert_eq!(encode(&value).unwrap(), b"[1,2,-3,2.5,1000,0]".to_vec());
    }

    #[test]
    fn test_integral_float_out_of_range_stays_float() {
        assert!(matches!(decode(b"1e19").unwrap(), DynamicValue::Float(_)));
        assert_eq!(
            DynamicValue::from(serde_json::json!(4.0)),
            DynamicValue::Int(4)
        );
    }

    #[test]
    fn test_large_unsigned_decodes_as_float() {
        let value = decode(b"18446744073709551615").unwrap();
        assert!(matches!(value, DynamicValue::Float(_)));
    }

    #[test]
    fn test_typed_tokens_not_text() {
        assert_eq!(decode(b"true").unwrap(), DynamicValue::Bool(true));
        assert_eq!(
            decode(br#""true""#).unwrap(),
            DynamicValue::String("true".into())
        );
        assert_eq!(decode(b"null").unwrap(), DynamicValue::Null);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"{not json"), Err(ValueError::Decoding(_))));
        assert!(matches!(decode(b""), Err(ValueError::Decoding(_))));
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        let value = DynamicValue::Array(vec![DynamicValue::Float(f64::NAN)]);
        assert!(matches!(encode(&value), Err(ValueError::Encoding(_))));
        assert!(encode(&DynamicValue::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_loose_eq_across_number_kinds() {
        assert!(DynamicValue::Int(2).loose_eq(&DynamicValue::Float(2.0)));
        assert!(!DynamicValue::Int(2).loose_eq(&DynamicValue::String("2".into())));

        let a = decode(br#"{"a": [1, 2]}"#).unwrap();
        let mut entries = ValueMap::new();
        entries.insert(
            "a".into(),
            DynamicValue::Array(vec![DynamicValue::Float(1.0), DynamicValue::Int(2)]),
        );
        let b = DynamicValue::Object(entries);
        assert!(a.loose_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(DynamicValue::Null.to_display_string(), "");
        assert_eq!(DynamicValue::Int(42).to_display_string(), "42");
        assert_eq!(DynamicValue::Float(1.5).to_display_string(), "1.5");
        assert_eq!(DynamicValue::Bool(false).to_display_string(), "false");
        assert_eq!(
            decode(br#"{"k": [1, "x"]}"#).unwrap().to_display_string(),
            r#"{"k":[1,"x"]}"#
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!DynamicValue::Null.is_truthy());
        assert!(!DynamicValue::Int(0).is_truthy());
        assert!(!DynamicValue::String(String::new()).is_truthy());
        assert!(DynamicValue::String("0".into()).is_truthy());
        assert!(DynamicValue::Array(vec![DynamicValue::Null]).is_truthy());
    }

    #[test]
    fn test_json_value_conversion() {
        let json = serde_json::json!({"n": 1, "f": 1.25, "s": "x", "l": [true, null]});
        let value = DynamicValue::from(json.clone());
        assert_eq!(value.get("n"), Some(&DynamicValue::Int(1)));
        assert_eq!(serde_json::Value::from(value), json);
    }

    fn arb_value() -> impl Strategy<Value = DynamicValue> {
        let leaf = prop_oneof![
            Just(DynamicValue::Null),
            any::<bool>().prop_map(DynamicValue::Bool),
            any::<i64>().prop_map(DynamicValue::Int),
            // Integral floats decode as integers, so keep a fraction
            (-1.0e9f64..1.0e9).prop_map(|f| DynamicValue::Float(f.trunc() + 0.5)),
            "[a-zA-Z0-9 @:_-]{0,12}".prop_map(DynamicValue::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(DynamicValue::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(DynamicValue::Object),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_decode_encode_round_trip(value in arb_value()) {
            let bytes = encode(&value).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), value);
        }
    }
}
