//! Opaque cursor tokens.
//!
//! A cursor is the tuple of sort-key values of one record, serialized as a
//! JSON array of type-tagged values and wrapped in unpadded URL-safe base64:
//!
//! ```text
//! [{"t":"int","v":42},{"t":"null"},{"t":"enum","v":"Shipped"}]
//! ```
//!
//! Callers treat the token as opaque. Decoding checks it against the key
//! types of the ordering it is used with.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CursorError;
use crate::schema::{FieldType, KeyPath};
use crate::value::{EnumMember, Number, Scalar};

/// The declared type a cursor value must decode into.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyType {
    pub ty: FieldType,
    pub nullable: bool,
}

impl KeyType {
    pub fn new(ty: FieldType, nullable: bool) -> Self {
        KeyType { ty, nullable }
    }

    pub fn of(key: &KeyPath) -> Self {
        KeyType::new(key.ty().clone(), key.nullable())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
enum Wire {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Time(DateTime<Utc>),
    Uuid(Uuid),
    Enum(String),
}

impl Wire {
    fn from_scalar(index: usize, value: &Scalar) -> Result<Wire, CursorError> {
        Ok(match value {
            Scalar::Null => Wire::Null,
            Scalar::Bool(b) => Wire::Bool(*b),
            Scalar::Number(Number::I64(n)) => Wire::Int(*n),
            Scalar::Number(Number::U64(n)) => Wire::Uint(*n),
            Scalar::Number(Number::F64(n)) => {
                if !n.is_finite() {
                    return Err(CursorError::NonFinite { index });
                }
                Wire::Float(*n)
            }
            Scalar::String(s) => Wire::Str(s.clone()),
            Scalar::Timestamp(t) => Wire::Time(*t),
            Scalar::Uuid(u) => Wire::Uuid(*u),
            Scalar::Enum(m) => Wire::Enum(m.name.to_string()),
        })
    }

    fn into_scalar(self, index: usize, expected: &KeyType) -> Result<Scalar, CursorError> {
        let mismatch = || CursorError::TypeMismatch {
            index,
            expected: expected.ty.to_string(),
        };

        let number = match (self, &expected.ty) {
            (Wire::Null, _) if expected.nullable => return Ok(Scalar::Null),
            (Wire::Bool(b), FieldType::Bool) => return Ok(Scalar::Bool(b)),
            (Wire::Str(s), FieldType::String) => return Ok(Scalar::String(s)),
            (Wire::Time(t), FieldType::Timestamp) => return Ok(Scalar::Timestamp(t)),
            (Wire::Uuid(u), FieldType::Uuid) => return Ok(Scalar::Uuid(u)),
            (Wire::Enum(name), FieldType::Enum(variants)) => {
                return EnumMember::find(variants, &name)
                    .map(Scalar::Enum)
                    .ok_or_else(mismatch)
            }

            (Wire::Int(n), FieldType::Int) => Some(Number::I64(n)),
            (Wire::Int(n), FieldType::UInt) => u64::try_from(n).ok().map(Number::U64),
            (Wire::Int(n), FieldType::Float) => lossless_f64(n as f64, n as i128).map(Number::F64),
            (Wire::Uint(n), FieldType::UInt) => Some(Number::U64(n)),
            (Wire::Uint(n), FieldType::Int) => i64::try_from(n).ok().map(Number::I64),
            (Wire::Uint(n), FieldType::Float) => lossless_f64(n as f64, n as i128).map(Number::F64),
            (Wire::Float(f), FieldType::Float) => Some(Number::F64(f)),
            _ => None,
        };

        number.map(Scalar::Number).ok_or_else(mismatch)
    }
}

fn lossless_f64(converted: f64, exact: i128) -> Option<f64> {
    (converted as i128 == exact).then_some(converted)
}

/// Encodes a key tuple into a cursor token.
pub fn encode(values: &[Scalar]) -> Result<String, CursorError> {
    let wire = values
        .iter()
        .enumerate()
        .map(|(i, v)| Wire::from_scalar(i, v))
        .collect::<Result<Vec<_>, _>>()?;
    let json = serde_json::to_vec(&wire).map_err(|e| CursorError::Payload(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a cursor token into a key tuple of the `expected` types.
pub fn decode(cursor: &str, expected: &[KeyType]) -> Result<Vec<Scalar>, CursorError> {
    let json = URL_SAFE_NO_PAD
        .decode(cursor.as_bytes())
        .map_err(|_| CursorError::Encoding)?;
    let wire: Vec<Wire> =
        serde_json::from_slice(&json).map_err(|e| CursorError::Payload(e.to_string()))?;

    if wire.len() != expected.len() {
        return Err(CursorError::Arity {
            expected: expected.len(),
            actual: wire.len(),
        });
    }

    let values = wire
        .into_iter()
        .zip(expected)
        .enumerate()
        .map(|(i, (w, ty))| w.into_scalar(i, ty))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::trace!(keys = values.len(), "decoded cursor");
    Ok(values)
}
