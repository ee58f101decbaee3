//! Schema descriptors for queryable records.
//!
//! A [`Schema`] is the static description of a record type: each field's
//! name, declared [`FieldType`] and nullability. It is built once per type
//! (usually by `#[derive(Record)]`) and consulted by the filter compiler and
//! the ordering model. Nothing here inspects values at compile time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::CompileError;
use crate::predicate::FieldPath;
use crate::value::{EnumMember, Value};

/// Trait for types that can be filtered, ordered and paginated.
///
/// This trait is typically derived using `#[derive(Record)]`, but can also
/// be implemented manually.
///
/// # Manual Implementation
///
/// ```
/// use quarry::{FieldDescriptor, FieldType, Number, Record, Schema, Value};
/// use std::sync::OnceLock;
///
/// struct Task {
///     name: String,
///     priority: Option<i64>,
/// }
///
/// impl Record for Task {
///     fn schema() -> &'static Schema {
///         static SCHEMA: OnceLock<Schema> = OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             Schema::new(
///                 "Task",
///                 vec![
///                     FieldDescriptor::new("name", FieldType::String, false),
///                     FieldDescriptor::new("priority", FieldType::Int, true),
///                 ],
///             )
///         })
///     }
///
///     fn field(&self, name: &str) -> Value<'_> {
///         match name {
///             "name" => Value::String(&self.name),
///             "priority" => match self.priority {
///                 Some(p) => Value::Number(Number::I64(p)),
///                 None => Value::Null,
///             },
///             _ => Value::Null,
///         }
///     }
/// }
/// ```
pub trait Record {
    /// Returns the static schema of this record type.
    fn schema() -> &'static Schema
    where
        Self: Sized;

    /// Returns the value of a field.
    ///
    /// Field names are the schema names; unknown names yield [`Value::Null`].
    fn field(&self, name: &str) -> Value<'_>;
}

/// Trait for unit-like enums usable as record fields.
///
/// `VARIANTS` lists member names in declaration order; a member's ordinal is
/// its index in that list and defines its sort order.
pub trait RecordEnum {
    const VARIANTS: &'static [&'static str];

    fn ordinal(&self) -> u32;

    fn member(&self) -> EnumMember {
        let ordinal = self.ordinal();
        EnumMember {
            name: Self::VARIANTS.get(ordinal as usize).copied().unwrap_or(""),
            ordinal,
        }
    }
}

/// Converts a datetime type into the timestamp representation records use.
pub trait AsTimestamp {
    fn as_timestamp(&self) -> DateTime<Utc>;
}

impl AsTimestamp for DateTime<Utc> {
    fn as_timestamp(&self) -> DateTime<Utc> {
        *self
    }
}

/// Milliseconds since the Unix epoch.
impl AsTimestamp for i64 {
    fn as_timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(*self).unwrap_or_default()
    }
}

/// Declared type of a record field.
#[derive(Clone)]
pub enum FieldType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Timestamp,
    Uuid,
    /// Enum with its member names in ordinal order.
    Enum(&'static [&'static str]),
    /// Nested record, resolved lazily so types may refer to each other.
    Record(fn() -> &'static Schema),
    /// Collection with the given element type.
    List(Box<FieldType>),
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::UInt | FieldType::Float)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, FieldType::List(_))
    }

    /// Returns `true` for types a cursor or literal can carry.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldType::Record(_) | FieldType::List(_))
    }

    /// Returns the nested schema for record-typed fields.
    pub fn record_schema(&self) -> Option<&'static Schema> {
        match self {
            FieldType::Record(schema) => Some(schema()),
            _ => None,
        }
    }

    /// Returns the element type for collection-typed fields.
    pub fn element(&self) -> Option<&FieldType> {
        match self {
            FieldType::List(element) => Some(element),
            _ => None,
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Enum(a), FieldType::Enum(b)) => a == b,
            (FieldType::Record(a), FieldType::Record(b)) => std::ptr::eq(a(), b()),
            (FieldType::List(a), FieldType::List(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("bool"),
            FieldType::Int => f.write_str("int"),
            FieldType::UInt => f.write_str("uint"),
            FieldType::Float => f.write_str("float"),
            FieldType::String => f.write_str("string"),
            FieldType::Timestamp => f.write_str("timestamp"),
            FieldType::Uuid => f.write_str("uuid"),
            FieldType::Enum(_) => f.write_str("enum"),
            FieldType::Record(schema) => f.write_str(schema().name()),
            FieldType::List(element) => write!(f, "list of {element}"),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Enum(variants) => f.debug_tuple("Enum").field(variants).finish(),
            FieldType::List(element) => f.debug_tuple("List").field(element).finish(),
            other => write!(f, "{other}"),
        }
    }
}

/// A single field of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: FieldType, nullable: bool) -> Self {
        FieldDescriptor { name, ty, nullable }
    }
}

/// Static description of a record type.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Schema { name, fields }
    }

    /// The record type's name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by exact name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolves a dotted scalar path such as `customer.address.city`.
    ///
    /// Results are memoized process-wide; repeated resolution of the same
    /// path against the same schema returns the shared [`KeyPath`]. This is
    /// the only memo cache in the crate: an ordering clause is a resolved
    /// [`KeyPath`] plus a [`Dir`](crate::Dir), so [`SortOrder`](crate::SortOrder)
    /// builds its keys from this cache instead of keeping a second one.
    pub fn resolve(&'static self, path: &str) -> Result<Arc<KeyPath>, CompileError> {
        let key = (self as *const Schema as usize, path.to_string());
        if let Some(hit) = KEY_PATHS.read().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let resolved = Arc::new(KeyPath::resolve(self, path)?);
        let mut cache = KEY_PATHS.write();
        Ok(Arc::clone(cache.entry(key).or_insert(resolved)))
    }
}

static KEY_PATHS: Lazy<RwLock<HashMap<(usize, String), Arc<KeyPath>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A dotted path to a scalar field, resolved against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPath {
    path: String,
    segments: Vec<&'static str>,
    segment_nullable: Vec<bool>,
    ty: FieldType,
    nullable: bool,
}

impl KeyPath {
    fn resolve(schema: &'static Schema, path: &str) -> Result<KeyPath, CompileError> {
        let mut current = schema;
        let mut segments = Vec::new();
        let mut segment_nullable = Vec::new();
        let mut nullable = false;
        let mut parts = path.split('.').peekable();

        while let Some(part) = parts.next() {
            let field = current
                .field(part)
                .ok_or_else(|| CompileError::UnknownProperty {
                    record: current.name().to_string(),
                    property: part.to_string(),
                })?;
            segments.push(field.name);
            segment_nullable.push(field.nullable);
            nullable |= field.nullable;

            if parts.peek().is_none() {
                if !field.ty.is_scalar() {
                    return Err(CompileError::InvalidOrderingKey {
                        path: path.to_string(),
                    });
                }
                return Ok(KeyPath {
                    path: path.to_string(),
                    segments,
                    segment_nullable,
                    ty: field.ty.clone(),
                    nullable,
                });
            }

            current = field
                .ty
                .record_schema()
                .ok_or_else(|| CompileError::InvalidOrderingKey {
                    path: path.to_string(),
                })?;
        }

        Err(CompileError::InvalidOrderingKey {
            path: path.to_string(),
        })
    }

    /// The dotted path as written.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }

    /// Declared type of the terminal field.
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// `true` if the terminal field or any intermediate record is nullable.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// The path in the form compiled predicates use.
    pub fn field_path(&self) -> FieldPath {
        FieldPath::new(self.segments.clone())
    }

    /// Prefixes of this path that end in a nullable intermediate record.
    ///
    /// The terminal field is never included.
    pub fn nullable_prefixes(&self) -> Vec<FieldPath> {
        let intermediates = self.segments.len().saturating_sub(1);
        (0..intermediates)
            .filter(|&i| self.segment_nullable[i])
            .map(|i| FieldPath::new(self.segments[..=i].to_vec()))
            .collect()
    }

    /// Reads the path from a record.
    ///
    /// An absent intermediate record reads as [`Value::Null`].
    pub fn read<'a>(&self, record: &'a dyn Record) -> Value<'a> {
        let mut current = record;
        let (last, init) = match self.segments.split_last() {
            Some(split) => split,
            None => return Value::Null,
        };
        for segment in init {
            match current.field(segment) {
                Value::Record(next) => current = next,
                _ => return Value::Null,
            }
        }
        current.field(last)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::value::Number;

    #[derive(Debug, Clone)]
    pub(crate) struct Address {
        pub city: String,
    }

    impl Record for Address {
        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::new(
                    "Address",
                    vec![FieldDescriptor::new("city", FieldType::String, false)],
                )
            })
        }

        fn field(&self, name: &str) -> Value<'_> {
            match name {
                "city" => Value::String(&self.city),
                _ => Value::Null,
            }
        }
    }

    #[derive(Debug, Clone)]
    pub(crate) struct Customer {
        pub id: i64,
        pub rank: Option<i64>,
        pub address: Option<Address>,
        pub tags: Vec<String>,
    }

    impl Record for Customer {
        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::new(
                    "Customer",
                    vec![
                        FieldDescriptor::new("id", FieldType::Int, false),
                        FieldDescriptor::new("rank", FieldType::Int, true),
                        FieldDescriptor::new(
                            "address",
                            FieldType::Record(<Address as Record>::schema),
                            true,
                        ),
                        FieldDescriptor::new(
                            "tags",
                            FieldType::List(Box::new(FieldType::String)),
                            false,
                        ),
                    ],
                )
            })
        }

        fn field(&self, name: &str) -> Value<'_> {
            match name {
                "id" => Value::Number(Number::I64(self.id)),
                "rank" => self.rank.map_or(Value::Null, |r| Value::Number(Number::I64(r))),
                "address" => match &self.address {
                    Some(a) => Value::Record(a),
                    None => Value::Null,
                },
                "tags" => Value::List(self.tags.iter().map(|t| Value::String(t)).collect()),
                _ => Value::Null,
            }
        }
    }

    #[test]
    fn resolve_nested_path() {
        let path = Customer::schema().resolve("address.city").unwrap();
        assert_eq!(path.segments(), &["address", "city"]);
        assert_eq!(path.ty(), &FieldType::String);
        assert!(path.nullable());
        assert_eq!(
            path.nullable_prefixes(),
            vec![FieldPath::new(vec!["address"])]
        );
    }

    #[test]
    fn top_level_path_has_no_prefixes() {
        let path = Customer::schema().resolve("rank").unwrap();
        assert!(path.nullable());
        assert!(path.nullable_prefixes().is_empty());
        assert_eq!(path.field_path().to_string(), "rank");
    }

    #[test]
    fn resolve_is_memoized() {
        let a = Customer::schema().resolve("rank").unwrap();
        let b = Customer::schema().resolve("rank").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn resolve_rejects_collections_and_records() {
        assert!(matches!(
            Customer::schema().resolve("tags"),
            Err(CompileError::InvalidOrderingKey { .. })
        ));
        assert!(matches!(
            Customer::schema().resolve("address"),
            Err(CompileError::InvalidOrderingKey { .. })
        ));
        assert!(matches!(
            Customer::schema().resolve("nope"),
            Err(CompileError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn read_absent_intermediate_is_null() {
        let customer = Customer {
            id: 1,
            rank: None,
            address: None,
            tags: vec![],
        };
        let path = Customer::schema().resolve("address.city").unwrap();
        assert!(path.read(&customer).is_null());
    }

    #[test]
    fn read_present_path() {
        let customer = Customer {
            id: 1,
            rank: Some(3),
            address: Some(Address {
                city: "Oslo".into(),
            }),
            tags: vec![],
        };
        let path = Customer::schema().resolve("address.city").unwrap();
        assert_eq!(path.read(&customer).as_str(), Some("Oslo"));
    }
}
