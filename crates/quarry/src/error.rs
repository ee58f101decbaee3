//! Error types for the quarry crate.
//!
//! Each stage of the pipeline has its own error type so callers can match on
//! the class of failure; [`Error`] unifies them for the convenience entry
//! points.

use thiserror::Error;

use crate::filter::token::{Token, TokenKind};

/// Failure while turning filter text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character that cannot start any token.
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    /// A quoted string without its closing quote.
    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// A numeric literal such as `1.` or `2e`.
    #[error("malformed number '{text}' at position {position}")]
    MalformedNumber { text: String, position: usize },
}

impl LexError {
    /// Returns the character offset the error points at.
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::MalformedNumber { position, .. } => *position,
        }
    }
}

/// Failure while parsing a token stream into an AST.
///
/// Always carries the token the parser was looking at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (found {} '{}' at position {})", token.kind, token.text, token.position)]
pub struct SyntaxError {
    pub message: String,
    pub token: Token,
}

impl SyntaxError {
    pub(crate) fn new(message: impl Into<String>, token: Token) -> Self {
        SyntaxError {
            message: message.into(),
            token,
        }
    }

    /// Kind of the offending token.
    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    /// Character offset of the offending token.
    pub fn position(&self) -> usize {
        self.token.position
    }
}

/// Failure anywhere in the text-to-AST front end.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Failure while compiling an AST against a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown property '{property}' on {record}")]
    UnknownProperty { record: String, property: String },

    #[error("property '{path}' is a collection and cannot be navigated with '.'")]
    NavigateThroughCollection { path: String },

    #[error("property '{path}' is not a record and has no member '{member}'")]
    NotARecord { path: String, member: String },

    #[error("'{modifier}' requires a collection, but '{path}' is not one")]
    NotACollection { path: String, modifier: &'static str },

    #[error("quantifier predicate on '{path}' requires record elements")]
    ScalarElements { path: String },

    #[error("property '{path}' is a {ty} and cannot be compared directly")]
    NotComparable { path: String, ty: String },

    #[error("operator '{op}' cannot be used with null")]
    NullOperator { op: &'static str },

    #[error("operator '{op}' is not supported for {ty} property '{path}'")]
    UnsupportedOperator {
        op: &'static str,
        ty: String,
        path: String,
    },

    #[error("case-insensitive comparison requires a string property, '{path}' is {ty}")]
    CaseInsensitiveNonString { path: String, ty: String },

    #[error("cannot convert {literal} to {ty} for property '{path}'")]
    Conversion {
        literal: String,
        ty: String,
        path: String,
    },

    #[error("null is not allowed for non-nullable property '{path}'")]
    NullNotAllowed { path: String },

    #[error("ordering key '{path}' must resolve to a scalar property")]
    InvalidOrderingKey { path: String },
}

/// Failure while encoding or decoding a cursor token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,

    #[error("cursor payload is malformed: {0}")]
    Payload(String),

    #[error("cursor has {actual} values but the ordering has {expected} keys")]
    Arity { expected: usize, actual: usize },

    #[error("cursor value {index} does not fit key type {expected}")]
    TypeMismatch { index: usize, expected: String },

    #[error("cursor value {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Boxed error returned by a caller-supplied materializer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure in the keyset pagination contract or its execution.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("keyset pagination requires at least one ordering clause")]
    EmptyOrdering,

    #[error("page size must be positive")]
    ZeroPageSize,

    #[error("page size {requested} exceeds the maximum of {max}")]
    PageSizeTooLarge { requested: usize, max: usize },

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("materialization failed: {0}")]
    Materialize(#[source] BoxError),
}

/// Failure while evaluating a predicate in memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("null reference while reading '{path}'")]
    NullReference { path: String },

    #[error("'{path}' did not produce a {expected} (found {found})")]
    Shape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lex(e) => Error::Lex(e),
            ParseError::Syntax(e) => Error::Syntax(e),
        }
    }
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
