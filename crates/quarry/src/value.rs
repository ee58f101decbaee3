//! Runtime value types.
//!
//! [`Value`] is what a record hands out when a field is read; it borrows from
//! the record. [`Scalar`] is the owned counterpart used for filter literals
//! and cursor tuples.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::schema::Record;

/// Runtime value of a field, borrowed from the source record.
#[derive(Clone)]
pub enum Value<'a> {
    /// Absent value of a nullable field.
    Null,
    Bool(bool),
    Number(Number),
    String(&'a str),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Enum(EnumMember),
    /// A nested record.
    Record(&'a dyn Record),
    /// The elements of a collection-typed field.
    List(Vec<Value<'a>>),
}

impl<'a> Value<'a> {
    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts a scalar value into its owned form.
    ///
    /// Returns `None` for records and lists.
    pub fn to_scalar(&self) -> Option<Scalar> {
        Some(match self {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => Scalar::Number(*n),
            Value::String(s) => Scalar::String((*s).to_string()),
            Value::Timestamp(t) => Scalar::Timestamp(*t),
            Value::Uuid(u) => Scalar::Uuid(*u),
            Value::Enum(m) => Scalar::Enum(*m),
            Value::Record(_) | Value::List(_) => return None,
        })
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Enum(_) => "enum",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Timestamp(t) => f.debug_tuple("Timestamp").field(t).finish(),
            Value::Uuid(u) => f.debug_tuple("Uuid").field(u).finish(),
            Value::Enum(m) => f.debug_tuple("Enum").field(m).finish(),
            Value::Record(_) => f.write_str("Record(..)"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

/// Numeric value supporting all common numeric types.
///
/// Comparisons between different variants are exact for integers and fall
/// back to `f64` only when a float is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed types.
    ///
    /// Returns `None` when either side is NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::I64(a), Number::U64(b)) => Some(if a < 0 {
                Ordering::Less
            } else {
                (a as u64).cmp(&b)
            }),
            (Number::U64(a), Number::I64(b)) => Some(if b < 0 {
                Ordering::Greater
            } else {
                a.cmp(&(b as u64))
            }),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::U64(n) => write!(f, "{n}"),
            Number::F64(n) => write!(f, "{n:?}"),
        }
    }
}

macro_rules! number_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for Number {
                fn from(n: $source) -> Self {
                    Number::$variant(n as $target)
                }
            }
        )*
    };
}

number_from!(I64 as i64: i8, i16, i32, i64, isize);
number_from!(U64 as u64: u8, u16, u32, u64, usize);
number_from!(F64 as f64: f32, f64);

/// A member of a [`RecordEnum`](crate::RecordEnum): its symbolic name and
/// its ordinal (declaration order).
#[derive(Debug, Clone, Copy)]
pub struct EnumMember {
    pub name: &'static str,
    pub ordinal: u32,
}

impl EnumMember {
    /// Looks up a member by exact, case-sensitive name.
    pub fn find(variants: &'static [&'static str], name: &str) -> Option<EnumMember> {
        variants
            .iter()
            .position(|v| *v == name)
            .map(|i| EnumMember {
                name: variants[i],
                ordinal: i as u32,
            })
    }
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal && self.name == other.name
    }
}

/// Owned scalar value used in compiled predicates and cursor tuples.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Enum(EnumMember),
}

impl Scalar {
    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Borrows this scalar as a runtime [`Value`].
    pub fn as_value(&self) -> Value<'_> {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(*n),
            Scalar::String(s) => Value::String(s),
            Scalar::Timestamp(t) => Value::Timestamp(*t),
            Scalar::Uuid(u) => Value::Uuid(*u),
            Scalar::Enum(m) => Value::Enum(*m),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Scalar::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339()),
            Scalar::Uuid(u) => write!(f, "'{u}'"),
            Scalar::Enum(m) => f.write_str(m.name),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<Number> for Scalar {
    fn from(n: Number) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(Number::I64(n))
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(t: DateTime<Utc>) -> Self {
        Scalar::Timestamp(t)
    }
}

impl From<Uuid> for Scalar {
    fn from(u: Uuid) -> Self {
        Scalar::Uuid(u)
    }
}

/// Compares two scalar values of the same type.
///
/// `Null` sorts before every other value. Strings compare ordinally,
/// booleans false-before-true and enums by ordinal. Returns `None` on a type
/// mismatch, a NaN, or when either side is a record or list.
pub fn compare_values(a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),

        (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (Value::Number(a), Value::Number(b)) => a.compare(*b),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (Value::Enum(a), Value::Enum(b)) => Some(a.ordinal.cmp(&b.ordinal)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_comparisons_same_type() {
        assert_eq!(Number::I64(5).compare(Number::I64(10)), Some(Ordering::Less));
        assert_eq!(Number::U64(10).compare(Number::U64(5)), Some(Ordering::Greater));
        assert_eq!(Number::F64(5.0).compare(Number::F64(5.0)), Some(Ordering::Equal));
    }

    #[test]
    fn number_comparisons_mixed_types() {
        assert_eq!(Number::I64(-1).compare(Number::U64(0)), Some(Ordering::Less));
        assert_eq!(Number::U64(u64::MAX).compare(Number::I64(i64::MAX)), Some(Ordering::Greater));
        assert_eq!(Number::I64(5).compare(Number::F64(5.0)), Some(Ordering::Equal));
        assert_eq!(Number::U64(10).compare(Number::F64(5.5)), Some(Ordering::Greater));
    }

    #[test]
    fn number_nan_comparison() {
        assert_eq!(Number::F64(f64::NAN).compare(Number::F64(1.0)), None);
    }

    #[test]
    fn nulls_sort_first() {
        let one = Value::Number(Number::I64(1));
        assert_eq!(compare_values(&Value::Null, &one), Some(Ordering::Less));
        assert_eq!(compare_values(&one, &Value::Null), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::Null, &Value::Null), Some(Ordering::Equal));
    }

    #[test]
    fn strings_compare_ordinally() {
        // Uppercase letters sort before lowercase in ordinal order
        let upper = Value::String("Zebra");
        let lower = Value::String("apple");
        assert_eq!(compare_values(&upper, &lower), Some(Ordering::Less));
    }

    #[test]
    fn enums_compare_by_ordinal() {
        let low = Value::Enum(EnumMember { name: "Zeta", ordinal: 0 });
        let high = Value::Enum(EnumMember { name: "Alpha", ordinal: 1 });
        assert_eq!(compare_values(&low, &high), Some(Ordering::Less));
    }

    #[test]
    fn type_mismatch_is_incomparable() {
        assert_eq!(
            compare_values(&Value::String("1"), &Value::Number(Number::I64(1))),
            None
        );
    }

    #[test]
    fn enum_member_lookup_is_case_sensitive() {
        const VARIANTS: &[&str] = &["Draft", "Published"];
        let found = EnumMember::find(VARIANTS, "Published").unwrap();
        assert_eq!(found.ordinal, 1);
        assert!(EnumMember::find(VARIANTS, "published").is_none());
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::from("it's").to_string(), "'it\\'s'");
        assert_eq!(Scalar::Number(Number::F64(2.0)).to_string(), "2.0");
        assert_eq!(Scalar::Null.to_string(), "null");
    }
}
