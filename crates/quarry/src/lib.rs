//! Quarry - Filter language and keyset pagination for typed records.
//!
//! Quarry compiles textual filter expressions into typed predicates and
//! pages through ordered collections with opaque cursors. It supports:
//!
//! - A small filter language: comparisons, `&&`, `||`, `!`, `in` lists,
//!   case-insensitive string operators, `:any`/`:all` quantifiers over
//!   collections and `:count` projections
//! - Compile-time checking of property paths and literal types against a
//!   static record schema
//! - Multi-key orderings with per-key direction and a defined null order
//! - Keyset (seek) pagination in both directions with stable cursors
//!
//! # Quick Start
//!
//! ```rust
//! use quarry::{paginate, CursorState, Filter, MemoryQuery, Record, SortOrder};
//!
//! #[derive(Debug, Clone, Record)]
//! struct Product {
//!     #[field(UInt)]
//!     id: u64,
//!     #[field(String)]
//!     name: String,
//!     #[field(Float)]
//!     price: Option<f64>,
//! }
//!
//! let products: Vec<Product> = (1..=6)
//!     .map(|id| Product {
//!         id,
//!         name: format!("item {id}"),
//!         price: if id % 3 == 0 { None } else { Some(id as f64 * 2.5) },
//!     })
//!     .collect();
//!
//! // Filter: nulls never satisfy a comparison
//! let filter = Filter::<Product>::parse("price >= 5 && name ^=:i 'ITEM'")?;
//! let cheap = filter.apply_to(MemoryQuery::new(&products)).materialize()?;
//! assert_eq!(cheap.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 4, 5]);
//!
//! // Pagination: nulls sort first
//! let state = CursorState::new(SortOrder::<Product>::parse("price, id")?);
//! let first = paginate(MemoryQuery::new(&products), &state, 4, |q| q.materialize())?;
//! assert_eq!(first.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![3, 6, 1, 2]);
//! assert!(first.has_next_page);
//!
//! let end = first.end_cursor.clone().unwrap_or_default();
//! let next = paginate(MemoryQuery::new(&products), &state.after(end), 4, |q| q.materialize())?;
//! assert_eq!(next.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![4, 5]);
//! assert!(!next.has_next_page);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Null Semantics
//!
//! | Construct | Null behavior |
//! |-----------|---------------|
//! | `==`, `<`, `^=`, ... | A null field never matches |
//! | `!=` | A null field matches |
//! | `in [..]` | A null field matches only if the list contains `null` |
//! | `:any(p)` / `:all(p)` | Empty collections: `any` is false, `all` is true |
//! | Ordering | Nulls sort first ascending, last descending |
//!
//! # Providers
//!
//! Filters and orderings are applied to anything implementing
//! [`Queryable`]. [`MemoryQuery`] evaluates them over a slice; a
//! database-backed provider translates the same [`Predicate`] tree into
//! its own query language.

// Lets `#[derive(Record)]` output refer to `::quarry` inside this crate.
extern crate self as quarry;

mod cursor;
mod error;
pub mod filter;
pub mod keyset;
mod op;
mod ordering;
mod paginate;
mod predicate;
mod query;
mod queryable;
mod schema;
mod value;

// Re-export public API
pub use cursor::{decode as decode_cursor, encode as encode_cursor, KeyType};
pub use error::{
    BoxError, CompileError, CursorError, Error, EvalError, LexError, PaginationError, ParseError,
    Result, SyntaxError,
};
pub use filter::{CompileOptions, Filter};
pub use op::Op;
pub use ordering::{Dir, SortKey, SortOrder};
pub use paginate::{
    paginate, paginate_async, CursorState, Direction, Page, PageLimits, Paginator, Position,
};
pub use predicate::{Bound, FieldPath, Operand, Predicate};
pub use query::MemoryQuery;
pub use queryable::Queryable;
pub use schema::{AsTimestamp, FieldDescriptor, FieldType, KeyPath, Record, RecordEnum, Schema};
pub use value::{compare_values, EnumMember, Number, Scalar, Value};

#[cfg(feature = "derive")]
pub use quarry_macros::{Record, RecordEnum};
