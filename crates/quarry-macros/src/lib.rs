//! Derive macros for quarry.
//!
//! # Derive Macros
//!
//! - [`Record`] - Generate the schema descriptor and field reader for a struct
//! - [`RecordEnum`] - Generate the member table for a unit-only enum
//!
//! The generated code refers to `::quarry`, so these macros are meant to be
//! used through the re-exports in the `quarry` crate.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod record;

/// Derives the `Record` trait for filterable, orderable structs.
///
/// Only fields annotated with `#[field(...)]` become part of the schema.
/// Nullability and collections are read from the field's Rust type:
/// `Option<T>` is nullable, `Vec<T>` is a collection and
/// `Option<Vec<T>>` is a nullable collection.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `String` | Any `AsRef<str>` field |
/// | `Int` / `UInt` / `Float` | Signed, unsigned and floating point numbers |
/// | `Bool` | Boolean field |
/// | `Timestamp` | Any `AsTimestamp` field, e.g. `DateTime<Utc>` |
/// | `Uuid` | `uuid::Uuid` field |
/// | `Enum` | Unit enum, requires a `RecordEnum` impl |
/// | `Record` | Nested struct, requires a `Record` impl |
/// | `skip` | Exclude this field |
/// | `rename = "..."` | Use a custom name in filters and orderings |
///
/// # Generated Code
///
/// 1. Field name constants (e.g., `Product::NAME`, `Product::PRICE`)
/// 2. `Record::schema()` backed by a lazily built static
/// 3. `Record::field()` reading each annotated field
///
/// # Example
///
/// ```ignore
/// use quarry::{Filter, Record, RecordEnum};
///
/// #[derive(Clone, Copy, RecordEnum)]
/// enum Status { Draft, Active, Retired }
///
/// #[derive(Record)]
/// struct Product {
///     #[field(UInt)]
///     id: u64,
///
///     #[field(String, rename = "Name")]
///     name: String,
///
///     #[field(Float)]
///     price: Option<f64>,
///
///     #[field(Enum)]
///     status: Status,
///
///     #[field(String)]
///     tags: Vec<String>,
///
///     cache_key: u64,
/// }
///
/// let filter = Filter::<Product>::parse("Name ==:i 'lamp' && tags:any()")?;
/// ```
#[proc_macro_derive(Record, attributes(field))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::record_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives the `RecordEnum` trait for unit-only enums.
///
/// Members are listed in declaration order, which is also their sort order.
///
/// # Example
///
/// ```ignore
/// use quarry::RecordEnum;
///
/// #[derive(Clone, Copy, RecordEnum)]
/// enum Priority { Low, Medium, High }
///
/// assert_eq!(Priority::VARIANTS, &["Low", "Medium", "High"]);
/// assert_eq!(Priority::High.ordinal(), 2);
/// ```
#[proc_macro_derive(RecordEnum)]
pub fn record_enum_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::record_enum_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
