//! The textual filter language.
//!
//! Text flows through [`lexer`], [`parser`] and [`compile`] to become a
//! [`Predicate`]. [`Filter`] bundles the three steps behind one typed entry
//! point.
//!
//! # Example
//!
//! ```ignore
//! use quarry::{Filter, Record};
//!
//! #[derive(Record)]
//! struct Product {
//!     #[field(String)]
//!     name: String,
//!     #[field(Float)]
//!     price: f64,
//! }
//!
//! let filter = Filter::<Product>::parse("name ^=:i 'smart' && price < 500")?;
//! let cheap = products.iter().filter(|p| filter.matches(p).unwrap_or(false));
//! ```

pub mod ast;
pub mod compile;
pub mod convert;
pub mod lexer;
pub mod parser;
pub mod token;

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, EvalError, Result};
use crate::predicate::Predicate;
use crate::queryable::Queryable;
use crate::schema::Record;

pub use ast::Node;
pub use parser::parse;

/// Options controlling predicate compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Guard nullable intermediate records so an absent one yields "no
    /// match" instead of an evaluation error.
    pub null_guards: bool,
    /// Mark literal values as bindable parameters.
    pub parameterize_values: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            null_guards: true,
            parameterize_values: false,
        }
    }
}

/// A compiled filter over records of type `T`.
pub struct Filter<T> {
    predicate: Predicate,
    _record: PhantomData<fn(&T)>,
}

impl<T: Record> Filter<T> {
    /// Parses and compiles `text` with default options.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &CompileOptions::default())
    }

    /// Parses and compiles `text`.
    pub fn parse_with(text: &str, options: &CompileOptions) -> Result<Self> {
        let node = parser::parse(text)?;
        let filter = Self::from_node(&node, options)?;
        tracing::debug!(
            record = T::schema().name(),
            filter = text,
            predicate = %filter.predicate,
            "compiled filter"
        );
        Ok(filter)
    }

    /// Compiles an already parsed AST.
    pub fn from_node(node: &Node, options: &CompileOptions) -> std::result::Result<Self, CompileError> {
        let predicate = compile::compile(node, T::schema(), options)?;
        Ok(Self::from_predicate(predicate))
    }
}

impl<T> Filter<T> {
    /// Wraps a predicate built by hand.
    pub fn from_predicate(predicate: Predicate) -> Self {
        Filter {
            predicate,
            _record: PhantomData,
        }
    }

    /// Returns a filter matching exactly the records this one rejects.
    pub fn negate(&self) -> Self {
        Self::from_predicate(self.predicate.clone().negate())
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn into_predicate(self) -> Predicate {
        self.predicate
    }

    /// Adds this filter to a query.
    pub fn apply_to<Q>(&self, query: Q) -> Q
    where
        Q: Queryable<Item = T>,
    {
        query.filter(self.predicate.clone())
    }
}

impl<T: Record> Filter<T> {
    /// Tests a single record.
    pub fn matches(&self, record: &T) -> std::result::Result<bool, EvalError> {
        self.predicate.evaluate(record)
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self::from_predicate(self.predicate.clone())
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("predicate", &self.predicate)
            .finish()
    }
}

impl<T> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::tests::{Address, Customer};

    fn customer(id: i64, city: Option<&str>) -> Customer {
        Customer {
            id,
            rank: None,
            address: city.map(|c| Address { city: c.into() }),
            tags: vec![],
        }
    }

    #[test]
    fn parse_and_match() {
        let filter = Filter::<Customer>::parse("id > 1 && address.city ^= 'Os'").unwrap();
        assert!(filter.matches(&customer(2, Some("Oslo"))).unwrap());
        assert!(!filter.matches(&customer(2, None)).unwrap());
        assert!(!filter.matches(&customer(1, Some("Oslo"))).unwrap());
    }

    #[test]
    fn negate_flips_result() {
        let filter = Filter::<Customer>::parse("id == 1").unwrap();
        let negated = filter.negate();
        assert!(!negated.matches(&customer(1, None)).unwrap());
        assert_eq!(negated.negate().predicate(), filter.predicate());
    }

    #[test]
    fn errors_are_classified() {
        assert!(matches!(
            Filter::<Customer>::parse("id >"),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            Filter::<Customer>::parse("id # 1"),
            Err(Error::Lex(_))
        ));
        assert!(matches!(
            Filter::<Customer>::parse("nope == 1"),
            Err(Error::Compile(_))
        ));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CompileOptions = serde_json::from_str(r#"{"parameterize_values": true}"#).unwrap();
        assert!(options.null_guards);
        assert!(options.parameterize_values);
    }
}
