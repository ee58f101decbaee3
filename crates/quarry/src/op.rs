//! Comparison operators for filter expressions.
//!
//! The [`Op`] enum defines every comparison the filter language supports.
//! Not all operators are valid for all field types; the compiler checks
//! validity against the declared type.

use std::cmp::Ordering;

use crate::schema::FieldType;

/// Comparison operator.
///
/// Operators are grouped by the types they support:
/// - **Universal**: `Eq`, `Ne`, `In`
/// - **Ordered**: `Lt`, `Lte`, `Gt`, `Gte` (numbers, strings, timestamps, uuids)
/// - **String**: `Contains`, `StartsWith`, `EndsWith`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `%=`
    Contains,
    /// `^=`
    StartsWith,
    /// `$=`
    EndsWith,
    /// `in`
    In,
}

impl Op {
    /// Returns `true` for `<`, `<=`, `>` and `>=`.
    pub fn is_ordering_op(self) -> bool {
        matches!(self, Op::Lt | Op::Lte | Op::Gt | Op::Gte)
    }

    /// Returns `true` for the substring operators.
    pub fn is_substring_op(self) -> bool {
        matches!(self, Op::Contains | Op::StartsWith | Op::EndsWith)
    }

    /// Returns `true` if this operator may be applied to a field of `ty`.
    ///
    /// Booleans and enums only support equality and membership.
    pub fn supports(self, ty: &FieldType) -> bool {
        match self {
            Op::Eq | Op::Ne | Op::In => ty.is_scalar(),
            Op::Contains | Op::StartsWith | Op::EndsWith => matches!(ty, FieldType::String),
            Op::Lt | Op::Lte | Op::Gt | Op::Gte => matches!(
                ty,
                FieldType::String
                    | FieldType::Int
                    | FieldType::UInt
                    | FieldType::Float
                    | FieldType::Timestamp
                    | FieldType::Uuid
            ),
        }
    }

    /// Evaluates a comparison given an ordering result.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Returns the filter-language spelling of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Contains => "%=",
            Op::StartsWith => "^=",
            Op::EndsWith => "$=",
            Op::In => "in",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
