//! Implementation of the `#[derive(Record)]` and `#[derive(RecordEnum)]`
//! macros.
//!
//! `Record` generates the static schema descriptor, the field reader and
//! field name constants. `RecordEnum` generates the member table of a
//! unit-only enum.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    spanned::Spanned, Data, DeriveInput, Error, Fields, GenericArgument, PathArguments, Result,
    Type,
};

use super::attrs::{parse_field_attrs, FieldKind};

/// How a field's Rust type wraps its element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Plain,
    Optional,
    List,
    OptionalList,
}

/// Returns the single type argument of `ty` if its last path segment is
/// `wrapper`, e.g. `Option<T>` or `std::vec::Vec<T>`.
fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Splits a field type into its shape and element type.
fn shape_of(ty: &Type) -> (Shape, &Type) {
    if let Some(inner) = unwrap_generic(ty, "Option") {
        if let Some(element) = unwrap_generic(inner, "Vec") {
            return (Shape::OptionalList, element);
        }
        return (Shape::Optional, inner);
    }
    if let Some(element) = unwrap_generic(ty, "Vec") {
        return (Shape::List, element);
    }
    (Shape::Plain, ty)
}

/// `FieldType` expression for a single (non-list) value.
fn field_type(kind: FieldKind, element: &Type) -> TokenStream {
    match kind {
        FieldKind::String => quote! { ::quarry::FieldType::String },
        FieldKind::Int => quote! { ::quarry::FieldType::Int },
        FieldKind::UInt => quote! { ::quarry::FieldType::UInt },
        FieldKind::Float => quote! { ::quarry::FieldType::Float },
        FieldKind::Bool => quote! { ::quarry::FieldType::Bool },
        FieldKind::Timestamp => quote! { ::quarry::FieldType::Timestamp },
        FieldKind::Uuid => quote! { ::quarry::FieldType::Uuid },
        FieldKind::Enum => {
            quote! { ::quarry::FieldType::Enum(<#element as ::quarry::RecordEnum>::VARIANTS) }
        }
        FieldKind::Record => {
            quote! { ::quarry::FieldType::Record(<#element as ::quarry::Record>::schema) }
        }
    }
}

/// `Value` expression for a reference `v` to a single value.
fn value_expr(kind: FieldKind) -> TokenStream {
    match kind {
        FieldKind::String => {
            quote! { ::quarry::Value::String(::core::convert::AsRef::<str>::as_ref(v)) }
        }
        FieldKind::Int | FieldKind::UInt | FieldKind::Float => {
            quote! { ::quarry::Value::Number(::quarry::Number::from(*v)) }
        }
        FieldKind::Bool => quote! { ::quarry::Value::Bool(*v) },
        FieldKind::Timestamp => {
            quote! { ::quarry::Value::Timestamp(::quarry::AsTimestamp::as_timestamp(v)) }
        }
        FieldKind::Uuid => quote! { ::quarry::Value::Uuid(*v) },
        FieldKind::Enum => {
            quote! { ::quarry::Value::Enum(::quarry::RecordEnum::member(v)) }
        }
        FieldKind::Record => quote! { ::quarry::Value::Record(v) },
    }
}

/// Main implementation of the Record derive macro.
pub fn record_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let schema_name = struct_name.to_string();

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Record cannot be derived for generic structs",
        ));
    }

    // Ensure we have a struct with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Record can only be derived for structs",
            ))
        }
    };

    let mut descriptors: Vec<TokenStream> = Vec::new();
    let mut field_matches: Vec<TokenStream> = Vec::new();
    let mut field_constants: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attrs = parse_field_attrs(&field.attrs)?;

        // Skip if marked with #[field(skip)] or left unannotated
        if attrs.skip {
            continue;
        }
        let kind = match attrs.kind {
            Some(kind) => kind,
            None => continue,
        };

        let query_name = attrs.rename.unwrap_or_else(|| field_name.to_string());
        let const_name = format_ident!("{}", to_screaming_snake_case(&query_name));

        field_constants.push(quote! {
            /// Field name constant for filters and orderings.
            pub const #const_name: &'static str = #query_name;
        });

        let (shape, element) = shape_of(&field.ty);
        if unwrap_generic(element, "Option").is_some() {
            return Err(Error::new(
                field.ty.span(),
                "collection elements cannot be optional",
            ));
        }

        let single = field_type(kind, element);
        let (ty, nullable) = match shape {
            Shape::Plain => (single, false),
            Shape::Optional => (single, true),
            Shape::List => (
                quote! { ::quarry::FieldType::List(::std::boxed::Box::new(#single)) },
                false,
            ),
            Shape::OptionalList => (
                quote! { ::quarry::FieldType::List(::std::boxed::Box::new(#single)) },
                true,
            ),
        };
        descriptors.push(quote! {
            ::quarry::FieldDescriptor::new(#query_name, #ty, #nullable)
        });

        let value = value_expr(kind);
        let read = match shape {
            Shape::Plain => quote! {{
                let v = &self.#field_name;
                #value
            }},
            Shape::Optional => quote! {
                match &self.#field_name {
                    ::core::option::Option::Some(v) => #value,
                    ::core::option::Option::None => ::quarry::Value::Null,
                }
            },
            Shape::List => quote! {
                ::quarry::Value::List(self.#field_name.iter().map(|v| #value).collect())
            },
            Shape::OptionalList => quote! {
                match &self.#field_name {
                    ::core::option::Option::Some(items) => {
                        ::quarry::Value::List(items.iter().map(|v| #value).collect())
                    }
                    ::core::option::Option::None => ::quarry::Value::Null,
                }
            },
        };
        field_matches.push(quote! {
            #query_name => #read,
        });
    }

    let expanded = quote! {
        impl #struct_name {
            #(#field_constants)*
        }

        impl ::quarry::Record for #struct_name {
            fn schema() -> &'static ::quarry::Schema {
                static SCHEMA: ::std::sync::OnceLock<::quarry::Schema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    ::quarry::Schema::new(#schema_name, ::std::vec![#(#descriptors),*])
                })
            }

            fn field(&self, name: &str) -> ::quarry::Value<'_> {
                match name {
                    #(#field_matches)*
                    _ => ::quarry::Value::Null,
                }
            }
        }
    };

    Ok(expanded)
}

/// Main implementation of the RecordEnum derive macro.
pub fn record_enum_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let enum_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "RecordEnum cannot be derived for generic enums",
        ));
    }

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return Err(Error::new(
                input.span(),
                "RecordEnum can only be derived for enums",
            ))
        }
    };

    let mut names: Vec<String> = Vec::new();
    let mut arms: Vec<TokenStream> = Vec::new();
    for (ordinal, variant) in variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new(
                variant.span(),
                "RecordEnum variants cannot carry data",
            ));
        }
        let ident = &variant.ident;
        let ordinal = ordinal as u32;
        names.push(ident.to_string());
        arms.push(quote! { #enum_name::#ident => #ordinal, });
    }

    Ok(quote! {
        impl ::quarry::RecordEnum for #enum_name {
            const VARIANTS: &'static [&'static str] = &[#(#names),*];

            fn ordinal(&self) -> u32 {
                match *self {
                    #(#arms)*
                }
            }
        }
    })
}

/// Convert a string to SCREAMING_SNAKE_CASE.
fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' || c == '-' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(to_screaming_snake_case("name"), "NAME");
        assert_eq!(to_screaming_snake_case("created_at"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("createdAt"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("UnitPrice"), "UNIT_PRICE");
    }

    #[test]
    fn test_shape_detection() {
        let ty: Type = syn::parse_str("Option<String>").unwrap();
        assert_eq!(shape_of(&ty).0, Shape::Optional);

        let ty: Type = syn::parse_str("Vec<Order>").unwrap();
        let (shape, element) = shape_of(&ty);
        assert_eq!(shape, Shape::List);
        assert_eq!(quote!(#element).to_string(), "Order");

        let ty: Type = syn::parse_str("std::option::Option<Vec<u32>>").unwrap();
        assert_eq!(shape_of(&ty).0, Shape::OptionalList);

        let ty: Type = syn::parse_str("i64").unwrap();
        assert_eq!(shape_of(&ty).0, Shape::Plain);
    }

    #[test]
    fn test_record_rejects_tuple_struct() {
        let input: DeriveInput = syn::parse_str("struct Id(u64);").unwrap();
        let err = record_derive_impl(input).unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn test_record_enum_rejects_data() {
        let input: DeriveInput = syn::parse_str("enum Shape { Dot, Line(u32) }").unwrap();
        let err = record_enum_derive_impl(input).unwrap_err();
        assert!(err.to_string().contains("cannot carry data"));
    }

    #[test]
    fn test_record_emits_constants() {
        let input: DeriveInput = syn::parse_str(
            "struct Product { #[field(String, rename = \"Name\")] name: String, internal: u8 }",
        )
        .unwrap();
        let output = record_derive_impl(input).unwrap().to_string();
        assert!(output.contains("pub const NAME"));
        assert!(!output.contains("INTERNAL"));
    }
}
