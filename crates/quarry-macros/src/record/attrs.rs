//! Attribute parsing for the Record derive macro.
//!
//! This module provides parsers for the `#[field(...)]` field attributes
//! used by the `Record` derive macro.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Ident, Lit, Meta, Result, Token,
};

/// The declared kind of a record field.
///
/// Nullability and collections are not part of the kind; they are read from
/// `Option<..>` and `Vec<..>` in the field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `#[field(String)]`
    String,
    /// `#[field(Int)]`
    Int,
    /// `#[field(UInt)]`
    UInt,
    /// `#[field(Float)]`
    Float,
    /// `#[field(Bool)]`
    Bool,
    /// `#[field(Timestamp)]`
    Timestamp,
    /// `#[field(Uuid)]`
    Uuid,
    /// `#[field(Enum)]`, requires a `RecordEnum` impl
    Enum,
    /// `#[field(Record)]`, a nested record
    Record,
}

const EXPECTED: &str = "String, Int, UInt, Float, Bool, Timestamp, Uuid, Enum, Record";

impl FieldKind {
    /// Parse a field kind from a name, accepting the capitalized and the
    /// lowercase spelling.
    pub fn from_name(name: &str, span: Span) -> Result<Self> {
        match name {
            "String" | "string" => Ok(FieldKind::String),
            "Int" | "int" => Ok(FieldKind::Int),
            "UInt" | "uint" => Ok(FieldKind::UInt),
            "Float" | "float" => Ok(FieldKind::Float),
            "Bool" | "bool" => Ok(FieldKind::Bool),
            "Timestamp" | "timestamp" => Ok(FieldKind::Timestamp),
            "Uuid" | "uuid" => Ok(FieldKind::Uuid),
            "Enum" | "enum" => Ok(FieldKind::Enum),
            "Record" | "record" => Ok(FieldKind::Record),
            other => Err(Error::new(
                span,
                format!("unknown field kind: '{}'. Expected one of: {}", other, EXPECTED),
            )),
        }
    }

    fn from_ident(ident: &Ident) -> Result<Self> {
        Self::from_name(&ident.to_string(), ident.span())
    }
}

/// Field-level attributes from `#[field(...)]`.
#[derive(Debug, Clone)]
pub struct FieldAttr {
    /// The declared kind of this field.
    pub kind: Option<FieldKind>,
    /// Leave this field out of the schema.
    pub skip: bool,
    /// Custom field name for filters and orderings (default: field name).
    pub rename: Option<String>,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for FieldAttr {
    fn default() -> Self {
        FieldAttr {
            kind: None,
            skip: false,
            rename: None,
            span: Span::call_site(),
        }
    }
}

fn string_value(expr: &syn::Expr, what: &str) -> Result<syn::LitStr> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: Lit::Str(s), ..
    }) = expr
    {
        Ok(s.clone())
    } else {
        Err(Error::new(
            expr.span(),
            format!("{what} must be a string literal"),
        ))
    }
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                // Kind identifier: field(String), field(Int), etc.
                Meta::Path(p) => {
                    if p.is_ident("skip") {
                        attr.skip = true;
                    } else if let Some(ident) = p.get_ident() {
                        attr.kind = Some(FieldKind::from_ident(ident)?);
                        attr.span = ident.span();
                    } else {
                        return Err(Error::new(
                            p.span(),
                            format!("expected field kind: {}, or skip", EXPECTED),
                        ));
                    }
                }

                // rename = "custom_name" or ty = "enum"
                Meta::NameValue(nv) => {
                    if nv.path.is_ident("rename") {
                        attr.rename = Some(string_value(&nv.value, "rename")?.value());
                    } else if nv.path.is_ident("ty") {
                        // ty = "enum" for kinds that collide with keywords
                        let s = string_value(&nv.value, "ty")?;
                        attr.kind = Some(FieldKind::from_name(&s.value(), s.span())?);
                        attr.span = s.span();
                    } else {
                        return Err(Error::new(
                            nv.path.span(),
                            "unknown attribute. Expected: rename or ty",
                        ));
                    }
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        format!(
                            "unknown field attribute. Expected: {}, skip, rename = \"...\", or ty = \"...\"",
                            EXPECTED
                        ),
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Extract `#[field(...)]` attributes from a field's attributes.
pub fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttr> {
    for attr in attrs {
        if attr.path().is_ident("field") {
            return attr.parse_args::<FieldAttr>();
        }
    }
    Ok(FieldAttr::default())
}
