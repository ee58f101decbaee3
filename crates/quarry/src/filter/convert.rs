//! Literal coercion.
//!
//! Converts a parsed [`Literal`] into a [`Scalar`] of a property's declared
//! type. Integer text widens into any numeric type; fractional text only
//! into floats. Strings parse into timestamps, uuids and enum members.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::CompileError;
use crate::filter::ast::Literal;
use crate::schema::FieldType;
use crate::value::{EnumMember, Number, Scalar};

/// Coerces a non-null, non-list literal to `ty`.
pub fn coerce(literal: &Literal, ty: &FieldType, path: &str) -> Result<Scalar, CompileError> {
    let converted = match (literal, ty) {
        (Literal::Number(text), FieldType::Int) => text.parse::<i64>().ok().map(Number::I64),
        (Literal::Number(text), FieldType::UInt) => text.parse::<u64>().ok().map(Number::U64),
        (Literal::Number(text), FieldType::Float) => text
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::F64),
        (Literal::String(s), FieldType::String) => return Ok(Scalar::String(s.clone())),
        (Literal::String(s), FieldType::Timestamp) => {
            return parse_timestamp(s)
                .map(Scalar::Timestamp)
                .ok_or_else(|| mismatch(literal, ty, path))
        }
        (Literal::String(s), FieldType::Uuid) => {
            return Uuid::parse_str(s)
                .map(Scalar::Uuid)
                .map_err(|_| mismatch(literal, ty, path))
        }
        (Literal::String(s), FieldType::Enum(variants)) => {
            return EnumMember::find(variants, s)
                .map(Scalar::Enum)
                .ok_or_else(|| mismatch(literal, ty, path))
        }
        (Literal::Bool(b), FieldType::Bool) => return Ok(Scalar::Bool(*b)),
        _ => None,
    };

    converted
        .map(Scalar::Number)
        .ok_or_else(|| mismatch(literal, ty, path))
}

/// Accepts RFC 3339, a naive date-time taken as UTC, or a bare date at
/// midnight UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn mismatch(literal: &Literal, ty: &FieldType, path: &str) -> CompileError {
    CompileError::Conversion {
        literal: literal.to_string(),
        ty: ty.to_string(),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn num(text: &str) -> Literal {
        Literal::Number(text.into())
    }

    fn string(text: &str) -> Literal {
        Literal::String(text.into())
    }

    #[test]
    fn integer_text_widens_to_every_numeric_type() {
        assert_eq!(
            coerce(&num("42"), &FieldType::Int, "n").unwrap(),
            Scalar::Number(Number::I64(42))
        );
        assert_eq!(
            coerce(&num("42"), &FieldType::UInt, "n").unwrap(),
            Scalar::Number(Number::U64(42))
        );
        assert_eq!(
            coerce(&num("42"), &FieldType::Float, "n").unwrap(),
            Scalar::Number(Number::F64(42.0))
        );
    }

    #[test]
    fn fractional_text_only_fits_floats() {
        assert!(coerce(&num("1.5"), &FieldType::Float, "n").is_ok());
        assert!(matches!(
            coerce(&num("1.5"), &FieldType::Int, "n"),
            Err(CompileError::Conversion { .. })
        ));
        assert!(coerce(&num("-1"), &FieldType::UInt, "n").is_err());
    }

    #[test]
    fn no_implicit_string_number_conversion() {
        assert!(coerce(&string("42"), &FieldType::Int, "n").is_err());
        assert!(coerce(&num("42"), &FieldType::String, "n").is_err());
    }

    #[test]
    fn timestamps_accept_common_forms() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("March 1st"), None);
    }

    #[test]
    fn uuid_literals_parse() {
        let text = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            coerce(&string(text), &FieldType::Uuid, "id").unwrap(),
            Scalar::Uuid(Uuid::parse_str(text).unwrap())
        );
        assert!(coerce(&string("nope"), &FieldType::Uuid, "id").is_err());
    }

    #[test]
    fn enum_members_match_exact_name() {
        let ty = FieldType::Enum(&["Draft", "Published"]);
        match coerce(&string("Published"), &ty, "state").unwrap() {
            Scalar::Enum(member) => assert_eq!(member.ordinal, 1),
            other => panic!("expected enum, got {other:?}"),
        }
        let err = coerce(&string("published"), &ty, "state").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot convert 'published' to enum for property 'state'"
        );
    }

    #[test]
    fn bool_literals_only_fit_bool() {
        assert_eq!(
            coerce(&Literal::Bool(true), &FieldType::Bool, "b").unwrap(),
            Scalar::Bool(true)
        );
        assert!(coerce(&Literal::Bool(true), &FieldType::String, "b").is_err());
    }
}
