//! AST-to-predicate compiler.
//!
//! Every name and literal is checked against the record schema here, so a
//! filter that compiles never fails on shape at evaluation time unless null
//! guards were switched off.

use crate::error::CompileError;
use crate::filter::ast::{
    ComparisonNode, Literal, LogicalOp, Node, PropertyNode, PropertyPath, QuantifierKind,
    QuantifierNode,
};
use crate::filter::convert::coerce;
use crate::filter::CompileOptions;
use crate::op::Op;
use crate::predicate::{Bound, FieldPath, Operand, Predicate};
use crate::schema::{FieldDescriptor, FieldType, Schema};
use crate::value::Scalar;

/// Compiles `node` against `schema`.
pub fn compile(
    node: &Node,
    schema: &'static Schema,
    options: &CompileOptions,
) -> Result<Predicate, CompileError> {
    Compiler { options }.node(node, schema)
}

/// A property path walked against a schema.
struct Resolved {
    path: FieldPath,
    field: &'static FieldDescriptor,
    /// Prefixes ending in a nullable intermediate record.
    nullable_prefixes: Vec<FieldPath>,
}

impl Resolved {
    fn text(&self) -> String {
        self.path.to_string()
    }
}

struct Compiler<'o> {
    options: &'o CompileOptions,
}

impl Compiler<'_> {
    fn node(&self, node: &Node, scope: &'static Schema) -> Result<Predicate, CompileError> {
        match node {
            Node::Logical(logical) => {
                let terms = logical
                    .terms
                    .iter()
                    .map(|term| self.node(term, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match logical.op {
                    LogicalOp::And => Predicate::and(terms),
                    LogicalOp::Or => Predicate::or(terms),
                })
            }
            Node::Not(inner) => Ok(self.node(inner, scope)?.negate()),
            Node::Comparison(comparison) => self.comparison(comparison, scope),
            Node::Quantifier(quantifier) => self.quantifier(quantifier, scope),
        }
    }

    /// Walks every segment but the last through record-typed fields.
    fn resolve(
        &self,
        path: &PropertyPath,
        scope: &'static Schema,
    ) -> Result<Resolved, CompileError> {
        let mut schema = scope;
        let mut segments = Vec::with_capacity(path.segments.len());
        let mut nullable_prefixes = Vec::new();

        for (i, name) in path.segments.iter().enumerate() {
            let field = schema
                .field(name)
                .ok_or_else(|| CompileError::UnknownProperty {
                    record: schema.name().to_string(),
                    property: name.clone(),
                })?;
            segments.push(field.name);

            let Some(next) = path.segments.get(i + 1) else {
                return Ok(Resolved {
                    path: FieldPath::new(segments),
                    field,
                    nullable_prefixes,
                });
            };

            schema = match &field.ty {
                FieldType::Record(nested) => nested(),
                FieldType::List(_) => {
                    return Err(CompileError::NavigateThroughCollection {
                        path: segments.join("."),
                    })
                }
                _ => {
                    return Err(CompileError::NotARecord {
                        path: segments.join("."),
                        member: next.clone(),
                    })
                }
            };
            if field.nullable {
                nullable_prefixes.push(FieldPath::new(segments.clone()));
            }
        }

        Err(CompileError::UnknownProperty {
            record: scope.name().to_string(),
            property: String::new(),
        })
    }

    /// Conjoins `IS NOT NULL` tests on `prefixes` ahead of `predicate`.
    fn guard(&self, prefixes: Vec<FieldPath>, predicate: Predicate) -> Predicate {
        if !self.options.null_guards || prefixes.is_empty() {
            return predicate;
        }
        Predicate::and(
            prefixes
                .into_iter()
                .map(Predicate::is_not_null)
                .chain(std::iter::once(predicate)),
        )
    }

    fn bound(&self, value: Scalar) -> Bound {
        Bound {
            value,
            parameter: self.options.parameterize_values,
        }
    }

    fn comparison(
        &self,
        node: &ComparisonNode,
        scope: &'static Schema,
    ) -> Result<Predicate, CompileError> {
        let (resolved, operand, ty, nullable) = match &node.left {
            PropertyNode::Path(path) => {
                let resolved = self.resolve(path, scope)?;
                if !resolved.field.ty.is_scalar() {
                    return Err(CompileError::NotComparable {
                        path: resolved.text(),
                        ty: resolved.field.ty.to_string(),
                    });
                }
                let operand = Operand::Field(resolved.path.clone());
                let ty = resolved.field.ty.clone();
                let nullable = resolved.field.nullable;
                (resolved, operand, ty, nullable)
            }
            PropertyNode::Projection(projection) => {
                let mut resolved = self.resolve(&projection.source, scope)?;
                if !resolved.field.ty.is_collection() {
                    return Err(CompileError::NotACollection {
                        path: resolved.text(),
                        modifier: "count",
                    });
                }
                if resolved.field.nullable {
                    resolved.nullable_prefixes.push(resolved.path.clone());
                }
                let operand = Operand::Count(resolved.path.clone());
                (resolved, operand, FieldType::UInt, false)
            }
        };
        let path_text = resolved.text();

        if node.case_insensitive && ty != FieldType::String {
            return Err(CompileError::CaseInsensitiveNonString {
                path: path_text,
                ty: ty.to_string(),
            });
        }

        let predicate = match (&node.right, node.op) {
            (Literal::Null, op) => {
                if matches!(operand, Operand::Count(_)) {
                    return Err(CompileError::NullNotAllowed { path: path_text });
                }
                let is_null = Predicate::IsNull(resolved.path.clone());
                match op {
                    Op::Eq => is_null,
                    Op::Ne => is_null.negate(),
                    other => {
                        return Err(CompileError::NullOperator {
                            op: other.as_str(),
                        })
                    }
                }
            }
            (Literal::List(items), Op::In) => {
                self.membership(items, operand, &ty, nullable, node.case_insensitive, &path_text)?
            }
            (literal, op) => {
                if matches!(literal, Literal::List(_)) || op == Op::In {
                    return Err(CompileError::Conversion {
                        literal: literal.to_string(),
                        ty: ty.to_string(),
                        path: path_text,
                    });
                }
                if !op.supports(&ty) {
                    return Err(CompileError::UnsupportedOperator {
                        op: op.as_str(),
                        ty: ty.to_string(),
                        path: path_text,
                    });
                }
                let value = fold_case(coerce(literal, &ty, &path_text)?, node.case_insensitive);
                Predicate::Compare {
                    operand,
                    op,
                    value: self.bound(value),
                    case_insensitive: node.case_insensitive,
                }
            }
        };

        Ok(self.guard(resolved.nullable_prefixes, predicate))
    }

    fn membership(
        &self,
        items: &[Literal],
        operand: Operand,
        ty: &FieldType,
        nullable: bool,
        case_insensitive: bool,
        path: &str,
    ) -> Result<Predicate, CompileError> {
        let mut values = Vec::with_capacity(items.len());
        let mut matches_null = false;
        for item in items {
            match item {
                Literal::Null => matches_null |= nullable,
                literal => {
                    let value = fold_case(coerce(literal, ty, path)?, case_insensitive);
                    values.push(self.bound(value));
                }
            }
        }

        let null_test = match (&operand, matches_null) {
            (Operand::Field(field), true) => Some(Predicate::IsNull(field.clone())),
            _ => None,
        };
        let membership = (!values.is_empty()).then(|| Predicate::In {
            operand,
            values,
            case_insensitive,
        });
        Ok(Predicate::or(membership.into_iter().chain(null_test)))
    }

    fn quantifier(
        &self,
        node: &QuantifierNode,
        scope: &'static Schema,
    ) -> Result<Predicate, CompileError> {
        let resolved = self.resolve(&node.source, scope)?;
        let modifier = match node.kind {
            QuantifierKind::Any => "any",
            QuantifierKind::All => "all",
        };
        let Some(element) = resolved.field.ty.element() else {
            return Err(CompileError::NotACollection {
                path: resolved.text(),
                modifier,
            });
        };

        let inner = match &node.predicate {
            None => None,
            Some(predicate) => {
                let element_schema =
                    element
                        .record_schema()
                        .ok_or_else(|| CompileError::ScalarElements {
                            path: resolved.text(),
                        })?;
                Some(self.node(predicate, element_schema)?)
            }
        };

        let collection = resolved.path.clone();
        let mut nullable = resolved.nullable_prefixes;
        if resolved.field.nullable {
            nullable.push(collection.clone());
        }

        match (node.kind, inner) {
            (QuantifierKind::Any, predicate) => {
                let any = Predicate::Any {
                    collection,
                    predicate: predicate.map(Box::new),
                };
                Ok(self.guard(nullable, any))
            }
            (QuantifierKind::All, Some(predicate)) => {
                let all = Predicate::All {
                    collection,
                    predicate: Box::new(predicate),
                };
                if !self.options.null_guards {
                    return Ok(all);
                }
                // An absent collection is vacuously satisfied.
                Ok(Predicate::or(
                    nullable
                        .into_iter()
                        .map(Predicate::IsNull)
                        .chain(std::iter::once(all)),
                ))
            }
            (QuantifierKind::All, None) => Err(CompileError::ScalarElements {
                path: collection.to_string(),
            }),
        }
    }
}

fn fold_case(value: Scalar, case_insensitive: bool) -> Scalar {
    match value {
        Scalar::String(s) if case_insensitive => Scalar::String(s.to_lowercase()),
        other => other,
    }
}
