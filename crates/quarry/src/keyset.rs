//! Seek predicates for keyset pagination.
//!
//! Given sort keys `k0..kn` and a cursor tuple `c0..cn`, the seek predicate
//! selects the records that come strictly after the cursor in that order:
//!
//! ```text
//! (k0 > c0)
//! OR (k0 = c0 AND k1 > c1)
//! OR (k0 = c0 AND k1 = c1 AND k2 > c2) ...
//! ```
//!
//! where `>` means "later in this key's direction". Nulls sort before every
//! value, so under a descending key they come after it, and nothing comes
//! after a null in descending order.

use crate::error::CursorError;
use crate::op::Op;
use crate::ordering::{Dir, SortKey};
use crate::predicate::{Bound, Operand, Predicate};
use crate::schema::KeyPath;
use crate::value::Scalar;

/// Builds the predicate selecting records strictly after `cursor`.
///
/// `parameterize` marks the cursor values as bindable parameters.
pub fn seek(
    keys: &[SortKey],
    cursor: &[Scalar],
    parameterize: bool,
) -> Result<Predicate, CursorError> {
    if keys.len() != cursor.len() {
        return Err(CursorError::Arity {
            expected: keys.len(),
            actual: cursor.len(),
        });
    }

    let builder = Builder { parameterize };
    let disjuncts = (0..keys.len()).map(|i| {
        let ties = keys[..i]
            .iter()
            .zip(cursor)
            .map(|(key, value)| builder.equal(&key.key, value));
        let step = builder.after(&keys[i], &cursor[i]);
        Predicate::and(ties.chain(std::iter::once(step)))
    });
    Ok(Predicate::or(disjuncts))
}

struct Builder {
    parameterize: bool,
}

impl Builder {
    fn compare(&self, key: &KeyPath, op: Op, value: &Scalar) -> Predicate {
        let compare = Predicate::Compare {
            operand: Operand::Field(key.field_path()),
            op,
            value: Bound {
                value: value.clone(),
                parameter: self.parameterize,
            },
            case_insensitive: false,
        };
        Predicate::and(
            key.nullable_prefixes()
                .into_iter()
                .map(Predicate::is_not_null)
                .chain(std::iter::once(compare)),
        )
    }

    /// The key reads as null, either directly or through an absent
    /// intermediate record.
    fn is_null(&self, key: &KeyPath) -> Predicate {
        if !key.nullable() {
            return Predicate::Const(false);
        }
        Predicate::or(
            key.nullable_prefixes()
                .into_iter()
                .chain(std::iter::once(key.field_path()))
                .map(Predicate::IsNull),
        )
    }

    fn is_not_null(&self, key: &KeyPath) -> Predicate {
        if !key.nullable() {
            return Predicate::Const(true);
        }
        Predicate::and(
            key.nullable_prefixes()
                .into_iter()
                .chain(std::iter::once(key.field_path()))
                .map(Predicate::is_not_null),
        )
    }

    fn equal(&self, key: &KeyPath, value: &Scalar) -> Predicate {
        if value.is_null() {
            self.is_null(key)
        } else {
            self.compare(key, Op::Eq, value)
        }
    }

    fn after(&self, key: &SortKey, value: &Scalar) -> Predicate {
        match (key.dir, value.is_null()) {
            (Dir::Asc, true) => self.is_not_null(&key.key),
            (Dir::Asc, false) => self.compare(&key.key, Op::Gt, value),
            (Dir::Desc, true) => Predicate::Const(false),
            (Dir::Desc, false) => Predicate::or([
                self.compare(&key.key, Op::Lt, value),
                self.is_null(&key.key),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::SortOrder;
    use crate::schema::tests::{Address, Customer};
    use crate::value::Number;

    fn customer(id: i64, rank: Option<i64>, city: Option<&str>) -> Customer {
        Customer {
            id,
            rank,
            address: city.map(|c| Address { city: c.into() }),
            tags: vec![],
        }
    }

    fn int(n: i64) -> Scalar {
        Scalar::Number(Number::I64(n))
    }

    /// Checks that the seek predicate from every record selects exactly the
    /// records sorted after it.
    fn assert_seeks_suffix(order: &SortOrder<Customer>, mut records: Vec<Customer>) {
        records.sort_by(|a, b| order.compare(a, b));
        for (i, anchor) in records.iter().enumerate() {
            let predicate = seek(order.keys(), &order.key_values(anchor), false).unwrap();
            let selected: Vec<i64> = records
                .iter()
                .filter(|r| predicate.evaluate(*r).unwrap())
                .map(|r| r.id)
                .collect();
            let expected: Vec<i64> = records[i + 1..].iter().map(|r| r.id).collect();
            assert_eq!(selected, expected, "after id {} with {predicate}", anchor.id);
        }
    }

    #[test]
    fn single_key_shape() {
        let order = SortOrder::<Customer>::new().then_asc("id").unwrap();
        let predicate = seek(order.keys(), &[int(5)], false).unwrap();
        assert_eq!(predicate.to_string(), "id > 5");

        let predicate = seek(order.reverse().keys(), &[int(5)], true).unwrap();
        assert_eq!(predicate.to_string(), "id < param(5)");
    }

    #[test]
    fn two_key_shape() {
        let order = SortOrder::<Customer>::parse("rank desc, id").unwrap();
        let predicate = seek(order.keys(), &[int(2), int(7)], false).unwrap();
        assert_eq!(
            predicate.to_string(),
            "(rank < 2 OR rank IS NULL OR (rank = 2 AND id > 7))"
        );
    }

    #[test]
    fn null_cursor_boundaries() {
        let asc = SortOrder::<Customer>::new().then_asc("rank").unwrap();
        assert_eq!(
            seek(asc.keys(), &[Scalar::Null], false).unwrap().to_string(),
            "rank IS NOT NULL"
        );
        let desc = asc.reverse();
        assert_eq!(
            seek(desc.keys(), &[Scalar::Null], false).unwrap(),
            Predicate::Const(false)
        );
    }

    #[test]
    fn arity_must_match() {
        let order = SortOrder::<Customer>::new().then_asc("id").unwrap();
        assert_eq!(
            seek(order.keys(), &[int(1), int(2)], false),
            Err(CursorError::Arity {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn nullable_key_with_tie_breaker() {
        let records = vec![
            customer(1, None, None),
            customer(2, Some(2), None),
            customer(3, None, None),
            customer(4, Some(1), None),
            customer(5, Some(2), None),
        ];
        let order = SortOrder::<Customer>::parse("rank, id").unwrap();
        assert_seeks_suffix(&order, records);
    }

    #[test]
    fn nested_nullable_key_with_tie_breaker() {
        let records = vec![
            customer(1, None, Some("Oslo")),
            customer(2, None, None),
            customer(3, None, Some("Bergen")),
            customer(4, None, None),
            customer(5, None, Some("Oslo")),
        ];
        let order = SortOrder::<Customer>::parse("address.city, id desc").unwrap();
        assert_seeks_suffix(&order, records);
    }
}
