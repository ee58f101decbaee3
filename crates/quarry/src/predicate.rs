//! Compiled predicate representation.
//!
//! A [`Predicate`] is the output of the filter compiler and the keyset
//! builder. It is a plain data tree: query providers walk it to translate it
//! into their own query language, and [`Predicate::evaluate`] runs it
//! directly against in-memory records.
//!
//! Paths inside a predicate are relative to the current scope, which is the
//! record being tested or, inside [`Predicate::Any`] and [`Predicate::All`],
//! the collection element.

use std::cmp::Ordering;
use std::fmt;

use crate::error::EvalError;
use crate::op::Op;
use crate::schema::Record;
use crate::value::{compare_values, Number, Scalar, Value};

/// A resolved, dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<&'static str>);

impl FieldPath {
    pub fn new(segments: Vec<&'static str>) -> Self {
        FieldPath(segments)
    }

    pub fn segments(&self) -> &[&'static str] {
        &self.0
    }

    /// Reads the path from a record.
    ///
    /// Unlike [`KeyPath::read`](crate::KeyPath::read), an absent intermediate
    /// record is an error: guards are expected to have been evaluated first.
    pub fn read<'a>(&self, record: &'a dyn Record) -> Result<Value<'a>, EvalError> {
        let Some((last, init)) = self.0.split_last() else {
            return Err(EvalError::Shape {
                path: String::new(),
                expected: "field",
                found: "empty path",
            });
        };

        let mut current = record;
        for (i, segment) in init.iter().enumerate() {
            match current.field(segment) {
                Value::Record(next) => current = next,
                Value::Null => {
                    return Err(EvalError::NullReference {
                        path: self.0[..=i].join("."),
                    })
                }
                other => {
                    return Err(EvalError::Shape {
                        path: self.0[..=i].join("."),
                        expected: "record",
                        found: other.type_name(),
                    })
                }
            }
        }
        Ok(current.field(last))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// The left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The value of a scalar field.
    Field(FieldPath),
    /// The number of elements in a collection field.
    Count(FieldPath),
}

impl Operand {
    pub fn path(&self) -> &FieldPath {
        match self {
            Operand::Field(path) | Operand::Count(path) => path,
        }
    }

    fn read<'a>(&self, record: &'a dyn Record) -> Result<Value<'a>, EvalError> {
        match self {
            Operand::Field(path) => path.read(record),
            Operand::Count(path) => match path.read(record)? {
                Value::List(items) => Ok(Value::Number(Number::U64(items.len() as u64))),
                Value::Null => Err(EvalError::NullReference {
                    path: path.to_string(),
                }),
                other => Err(EvalError::Shape {
                    path: path.to_string(),
                    expected: "list",
                    found: other.type_name(),
                }),
            },
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(path) => write!(f, "{path}"),
            Operand::Count(path) => write!(f, "COUNT({path})"),
        }
    }
}

/// A literal value on the right-hand side of a comparison.
///
/// `parameter` tells a query provider the value may be bound as a reusable
/// parameter instead of being inlined.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Scalar,
    pub parameter: bool,
}

impl Bound {
    pub fn constant(value: impl Into<Scalar>) -> Self {
        Bound {
            value: value.into(),
            parameter: false,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameter {
            write!(f, "param({})", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A boolean condition over a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Const(bool),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    IsNull(FieldPath),
    Compare {
        operand: Operand,
        op: Op,
        value: Bound,
        case_insensitive: bool,
    },
    In {
        operand: Operand,
        values: Vec<Bound>,
        case_insensitive: bool,
    },
    /// True if some element matches, or if the collection is non-empty when
    /// there is no element predicate.
    Any {
        collection: FieldPath,
        predicate: Option<Box<Predicate>>,
    },
    /// True if every element matches; vacuously true when empty.
    All {
        collection: FieldPath,
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    /// Conjunction of `terms`, flattened and simplified.
    ///
    /// No terms yields `Const(true)`; a single term is returned as is.
    pub fn and(terms: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Predicate::Const(true) => {}
                Predicate::Const(false) => return Predicate::Const(false),
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::Const(true),
            1 => flat.pop().unwrap_or(Predicate::Const(true)),
            _ => Predicate::And(flat),
        }
    }

    /// Disjunction of `terms`, flattened and simplified.
    ///
    /// No terms yields `Const(false)`; a single term is returned as is.
    pub fn or(terms: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Predicate::Const(false) => {}
                Predicate::Const(true) => return Predicate::Const(true),
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::Const(false),
            1 => flat.pop().unwrap_or(Predicate::Const(false)),
            _ => Predicate::Or(flat),
        }
    }

    /// Logical negation. Negating twice returns the original predicate.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            Predicate::Const(b) => Predicate::Const(!b),
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// `path IS NOT NULL`
    pub fn is_not_null(path: FieldPath) -> Predicate {
        Predicate::IsNull(path).negate()
    }

    /// A comparison against an inlined constant.
    pub fn compare(path: FieldPath, op: Op, value: impl Into<Scalar>) -> Predicate {
        Predicate::Compare {
            operand: Operand::Field(path),
            op,
            value: Bound::constant(value),
            case_insensitive: false,
        }
    }

    /// Evaluates this predicate against a record.
    ///
    /// Conjunctions and disjunctions short-circuit left to right, so a guard
    /// placed before an access keeps the access from running.
    pub fn evaluate(&self, record: &dyn Record) -> Result<bool, EvalError> {
        match self {
            Predicate::Const(b) => Ok(*b),
            Predicate::And(terms) => {
                for term in terms {
                    if !term.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(terms) => {
                for term in terms {
                    if term.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.evaluate(record)?),
            Predicate::IsNull(path) => Ok(path.read(record)?.is_null()),
            Predicate::Compare {
                operand,
                op,
                value,
                case_insensitive,
            } => {
                let actual = operand.read(record)?;
                Ok(compare(&actual, *op, &value.value, *case_insensitive))
            }
            Predicate::In {
                operand,
                values,
                case_insensitive,
            } => {
                let actual = operand.read(record)?;
                if actual.is_null() {
                    return Ok(false);
                }
                Ok(values
                    .iter()
                    .any(|v| compare(&actual, Op::Eq, &v.value, *case_insensitive)))
            }
            Predicate::Any {
                collection,
                predicate,
            } => {
                let items = read_list(collection, record)?;
                match predicate {
                    None => Ok(!items.is_empty()),
                    Some(inner) => {
                        for item in &items {
                            if inner.evaluate(element(collection, item)?)? {
                                return Ok(true);
                            }
                        }
                        Ok(false)
                    }
                }
            }
            Predicate::All {
                collection,
                predicate,
            } => {
                let items = read_list(collection, record)?;
                for item in &items {
                    if !predicate.evaluate(element(collection, item)?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn read_list<'a>(path: &FieldPath, record: &'a dyn Record) -> Result<Vec<Value<'a>>, EvalError> {
    match path.read(record)? {
        Value::List(items) => Ok(items),
        Value::Null => Err(EvalError::NullReference {
            path: path.to_string(),
        }),
        other => Err(EvalError::Shape {
            path: path.to_string(),
            expected: "list",
            found: other.type_name(),
        }),
    }
}

fn element<'a>(path: &FieldPath, item: &Value<'a>) -> Result<&'a dyn Record, EvalError> {
    match item {
        Value::Record(r) => Ok(*r),
        other => Err(EvalError::Shape {
            path: path.to_string(),
            expected: "record element",
            found: other.type_name(),
        }),
    }
}

/// Applies `op` to a field value and a literal.
///
/// A null field satisfies only `!=`.
fn compare(actual: &Value<'_>, op: Op, expected: &Scalar, case_insensitive: bool) -> bool {
    if actual.is_null() {
        return op == Op::Ne;
    }

    if let (Value::String(a), Scalar::String(b)) = (actual, expected) {
        if case_insensitive {
            return compare_strings(&a.to_lowercase(), op, &b.to_lowercase());
        }
        return compare_strings(a, op, b);
    }

    match op {
        Op::Eq | Op::Ne | Op::Lt | Op::Lte | Op::Gt | Op::Gte => {
            compare_values(actual, &expected.as_value()).map_or(op == Op::Ne, |o| op.eval_ordering(o))
        }
        _ => false,
    }
}

fn compare_strings(a: &str, op: Op, b: &str) -> bool {
    match op {
        Op::Contains => a.contains(b),
        Op::StartsWith => a.starts_with(b),
        Op::EndsWith => a.ends_with(b),
        Op::In => a == b,
        _ => op.eval_ordering(a.as_bytes().cmp(b.as_bytes())),
    }
}

fn sql_op(op: Op) -> &'static str {
    match op {
        Op::Eq => "=",
        Op::Ne => "<>",
        Op::Lt => "<",
        Op::Lte => "<=",
        Op::Gt => ">",
        Op::Gte => ">=",
        Op::Contains => "CONTAINS",
        Op::StartsWith => "STARTS WITH",
        Op::EndsWith => "ENDS WITH",
        Op::In => "IN",
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{term}")?;
    }
    f.write_str(")")
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Operand, lower: bool) -> fmt::Result {
    if lower {
        write!(f, "LOWER({operand})")
    } else {
        write!(f, "{operand}")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Const(true) => f.write_str("TRUE"),
            Predicate::Const(false) => f.write_str("FALSE"),
            Predicate::And(terms) => write_joined(f, terms, " AND "),
            Predicate::Or(terms) => write_joined(f, terms, " OR "),
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::IsNull(path) => write!(f, "{path} IS NOT NULL"),
                other => write!(f, "NOT {other}"),
            },
            Predicate::IsNull(path) => write!(f, "{path} IS NULL"),
            Predicate::Compare {
                operand,
                op,
                value,
                case_insensitive,
            } => {
                write_operand(f, operand, *case_insensitive)?;
                write!(f, " {} {value}", sql_op(*op))
            }
            Predicate::In {
                operand,
                values,
                case_insensitive,
            } => {
                write_operand(f, operand, *case_insensitive)?;
                f.write_str(" IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Predicate::Any {
                collection,
                predicate: None,
            } => write!(f, "EXISTS({collection})"),
            Predicate::Any {
                collection,
                predicate: Some(inner),
            } => write!(f, "ANY({collection} WHERE {inner})"),
            Predicate::All {
                collection,
                predicate,
            } => write!(f, "ALL({collection} WHERE {predicate})"),
        }
    }
}

/// Orders two field values for a sort, nulls first.
///
/// Incomparable pairs are treated as equal so a sort stays total.
pub(crate) fn sort_order(a: &Value<'_>, b: &Value<'_>) -> Ordering {
    compare_values(a, b).unwrap_or(Ordering::Equal)
}
