//! Abstract syntax tree of the filter language.
//!
//! Nodes are immutable once parsed. The tree only records what was written;
//! property names and literal types are checked later, by the compiler,
//! against a record schema.
//!
//! ```text
//! Price >= 10 && (Name ^=:i 'pro' || Tags:count > 2) && Orders:any(Total > 100)
//! ```

use std::fmt;

use crate::op::Op;

/// A predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Logical(LogicalNode),
    Not(Box<Node>),
    Comparison(ComparisonNode),
    Quantifier(QuantifierNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// An n-ary conjunction or disjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalNode {
    pub op: LogicalOp,
    pub terms: Vec<Node>,
}

impl LogicalNode {
    /// Joins terms under `op`, splicing in the terms of any child that uses
    /// the same operator. A single term is returned unwrapped.
    pub fn join(op: LogicalOp, terms: Vec<Node>) -> Node {
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Node::Logical(inner) if inner.op == op => flat.extend(inner.terms),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Node::Logical(LogicalNode { op, terms: flat })
    }
}

/// A dotted property path such as `Customer.Address.City`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub segments: Vec<String>,
}

impl PropertyPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Collection-to-scalar reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Count,
}

/// `Orders:count`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionNode {
    pub source: PropertyPath,
    pub projection: Projection,
}

/// The left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyNode {
    Path(PropertyPath),
    Projection(ProjectionNode),
}

impl fmt::Display for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyNode::Path(path) => write!(f, "{path}"),
            PropertyNode::Projection(node) => write!(f, "{}:count", node.source),
        }
    }
}

/// `property op literal`, optionally case-insensitive (`==:i`).
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonNode {
    pub left: PropertyNode,
    pub op: Op,
    pub case_insensitive: bool,
    pub right: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Any,
    All,
}

/// `Orders:any(...)` or `Orders:all(...)`.
///
/// `All` always carries a predicate; `Any` without one tests non-emptiness.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantifierNode {
    pub source: PropertyPath,
    pub kind: QuantifierKind,
    pub predicate: Option<Box<Node>>,
}

/// A literal value as written.
///
/// Numbers keep their source text so they can be parsed directly into the
/// property's declared numeric type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(String),
    String(String),
    Bool(bool),
    Null,
    List(Vec<Literal>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(text) => f.write_str(text),
            Literal::String(s) => write!(f, "'{s}'"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
