//! Leaf operator matchers.
//!
//! Each matcher receives the [`Resolved`] branches of a field path and its parsed
//! operand. Positive operators are existential: they match if any branch (or any
//! element of an array branch) satisfies them. Negations (`$ne`, `$nin`, `$not`) are
//! the complement of the positive form, so over an array every element must fail.
//!
//! Value-form `$elemMatch` applies its operators to each element as a whole: an element
//! that is itself an array is not looked into.

use std::cmp::Ordering;

use bson::Bson;
use tracing::trace;

use docmatch_core::{
    path::Resolved,
    query::{BitTest, Condition, ElemMatch, Member},
    value::{BsonType, Number, QueryRegex, binary_bytes, compare_values, values_equal},
};

use crate::evaluator::DocumentEvaluator;


/// How far a condition looks into the values it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// The value itself and, for an array, each of its elements.
    Elements,
    /// The value as a whole; used for value-form `$elemMatch` elements.
    Whole,
}

/// Returns `true` if every condition holds.
pub fn matches_conditions(resolved: &Resolved<'_>, conditions: &[Condition]) -> bool {
    all_hold(resolved, conditions, Reach::Elements)
}

/// Applies a single condition to the resolved branches of a path.
pub fn matches_condition(resolved: &Resolved<'_>, condition: &Condition) -> bool {
    holds(resolved, condition, Reach::Elements)
}

fn all_hold(resolved: &Resolved<'_>, conditions: &[Condition], reach: Reach) -> bool {
    conditions
        .iter()
        .all(|condition| holds(resolved, condition, reach))
}

fn holds(resolved: &Resolved<'_>, condition: &Condition, reach: Reach) -> bool {
    let matched = match condition {
        Condition::Eq(literal) => eq(resolved, literal, reach),
        Condition::Ne(literal) => !eq(resolved, literal, reach),
        Condition::Gt(literal) => compare(resolved, literal, reach, |ordering| ordering == Ordering::Greater),
        Condition::Gte(literal) => {
            (literal == &Bson::Null && eq(resolved, literal, reach))
                || compare(resolved, literal, reach, |ordering| ordering != Ordering::Less)
        }
        Condition::Lt(literal) => compare(resolved, literal, reach, |ordering| ordering == Ordering::Less),
        Condition::Lte(literal) => {
            (literal == &Bson::Null && eq(resolved, literal, reach))
                || compare(resolved, literal, reach, |ordering| ordering != Ordering::Greater)
        }
        Condition::In(members) => members.iter().any(|member| member_matches(resolved, member, reach)),
        Condition::Nin(members) => !members.iter().any(|member| member_matches(resolved, member, reach)),
        Condition::All(members) => {
            !members.is_empty() && members.iter().all(|member| member_matches(resolved, member, reach))
        }
        Condition::Size(size) => size_matches(resolved, *size),
        Condition::Exists(expected) => resolved.exists() == *expected,
        Condition::Type(types) => type_matches(resolved, types, reach),
        Condition::Mod { divisor, remainder } => mod_matches(resolved, *divisor, *remainder, reach),
        Condition::Regex(regex) => regex_matches(resolved, regex, reach),
        Condition::ElemMatch(elem_match) => elem_match_matches(resolved, elem_match),
        Condition::Not(inner) => !all_hold(resolved, inner, reach),
        Condition::Bits { test, positions } => bits_match(resolved, *test, positions, reach),
    };

    trace!(operator = %condition.operator(), matched, "applied field operator");

    matched
}

/// The value itself, followed by its elements when it is an array and `reach` allows.
fn candidates<'a>(value: &'a Bson, reach: Reach) -> impl Iterator<Item = &'a Bson> + 'a {
    let elements: &[Bson] = match (value, reach) {
        (Bson::Array(items), Reach::Elements) => items.as_slice(),
        _ => &[],
    };

    std::iter::once(value).chain(elements.iter())
}

fn any_candidate(resolved: &Resolved<'_>, reach: Reach, mut predicate: impl FnMut(&Bson) -> bool) -> bool {
    resolved
        .values()
        .any(|value| candidates(value, reach).any(&mut predicate))
}

/// `$eq`: a missing branch equals `null`.
fn eq(resolved: &Resolved<'_>, literal: &Bson, reach: Reach) -> bool {
    if literal == &Bson::Null && resolved.has_missing() {
        return true;
    }

    any_candidate(resolved, reach, |candidate| values_equal(candidate, literal))
}

fn compare(resolved: &Resolved<'_>, literal: &Bson, reach: Reach, accept: impl Fn(Ordering) -> bool) -> bool {
    any_candidate(resolved, reach, |candidate| {
        compare_values(candidate, literal).is_some_and(&accept)
    })
}

fn regex_matches(resolved: &Resolved<'_>, regex: &QueryRegex, reach: Reach) -> bool {
    any_candidate(resolved, reach, |candidate| regex.is_match(candidate))
}

fn member_matches(resolved: &Resolved<'_>, member: &Member, reach: Reach) -> bool {
    match member {
        Member::Value(literal) => eq(resolved, literal, reach),
        Member::Regex(regex) => regex_matches(resolved, regex, reach),
        Member::ElemMatch(elem_match) => elem_match_matches(resolved, elem_match),
    }
}

fn size_matches(resolved: &Resolved<'_>, size: usize) -> bool {
    resolved
        .values()
        .any(|value| matches!(value, Bson::Array(items) if items.len() == size))
}

fn type_matches(resolved: &Resolved<'_>, types: &[BsonType], reach: Reach) -> bool {
    any_candidate(resolved, reach, |candidate| types.iter().any(|ty| ty.matches(candidate)))
}

fn mod_matches(resolved: &Resolved<'_>, divisor: i64, remainder: i64, reach: Reach) -> bool {
    any_candidate(resolved, reach, |candidate| {
        Number::from_bson(candidate)
            .and_then(Number::truncate)
            .is_some_and(|value| value.wrapping_rem(divisor) == remainder)
    })
}

fn elem_match_matches(resolved: &Resolved<'_>, elem_match: &ElemMatch) -> bool {
    resolved.values().any(|value| match value {
        Bson::Array(items) => items.iter().any(|item| element_matches(item, elem_match)),
        _ => false,
    })
}

fn element_matches(element: &Bson, elem_match: &ElemMatch) -> bool {
    match elem_match {
        ElemMatch::Value(conditions) => all_hold(&Resolved::single(Some(element)), conditions, Reach::Whole),
        ElemMatch::Object(expr) => match element {
            Bson::Document(doc) => DocumentEvaluator::new(doc).evaluate(expr),
            _ => false,
        }
    }
}

/// Bits of a stored value, addressed least significant first.
enum Bits<'a> {
    /// Two's complement; positions past 63 repeat the sign bit.
    Integer(i64),
    Bytes(&'a [u8]),
}

impl<'a> Bits<'a> {
    fn of(value: &'a Bson) -> Option<Self> {
        if let Some(bytes) = binary_bytes(value) {
            return Some(Bits::Bytes(bytes));
        }

        Number::from_bson(value)
            .and_then(Number::as_integral)
            .map(Bits::Integer)
    }

    fn is_set(&self, position: u32) -> bool {
        match self {
            Bits::Integer(value) if position >= 64 => *value < 0,
            Bits::Integer(value) => ((*value >> position) & 1) == 1,
            Bits::Bytes(bytes) => bytes
                .get((position / 8) as usize)
                .is_some_and(|byte| ((*byte >> (position % 8)) & 1) == 1),
        }
    }
}

fn bits_match(resolved: &Resolved<'_>, test: BitTest, positions: &[u32], reach: Reach) -> bool {
    any_candidate(resolved, reach, |candidate| {
        let Some(bits) = Bits::of(candidate) else {
            return false;
        };

        match test {
            BitTest::AllSet => positions.iter().all(|position| bits.is_set(*position)),
            BitTest::AllClear => positions.iter().all(|position| !bits.is_set(*position)),
            BitTest::AnySet => positions.iter().any(|position| bits.is_set(*position)),
            BitTest::AnyClear => positions.iter().any(|position| !bits.is_set(*position)),
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Binary, doc, spec::BinarySubtype};
    use docmatch_core::{
        options::QueryOptions,
        path::{FieldPath, resolve},
        query::Expr,
    };

    /// Parses `{ "f": condition }` and applies it to the `f` path of `doc`.
    fn check(document: bson::Document, condition: Bson) -> bool {
        let expr = Expr::parse(&doc! { "f": condition }).unwrap();
        let conditions = match expr {
            Expr::And(mut children) => match children.remove(0) {
                Expr::Field { conditions, .. } => conditions,
                other => panic!("unexpected node {:?}", other),
            }
            other => panic!("unexpected root {:?}", other),
        };

        let path = FieldPath::parse("f", &QueryOptions::default()).unwrap();
        matches_conditions(&resolve(&document, &path), &conditions)
    }

    #[test]
    fn eq_fans_out_and_matches_whole_arrays() {
        assert!(check(doc! { "f": ["a", "b"] }, "a".into()));
        assert!(check(doc! { "f": ["a", "b"] }, bson::bson!(["a", "b"])));
        assert!(!check(doc! { "f": ["a", "b"] }, bson::bson!(["b", "a"])));
        assert!(check(doc! { "f": 5 }, bson::bson!({ "$eq": 5.0 })));
    }

    #[test]
    fn null_matches_missing_and_null() {
        assert!(check(doc! {}, Bson::Null));
        assert!(check(doc! { "f": null }, Bson::Null));
        assert!(check(doc! { "f": [1, null] }, Bson::Null));
        assert!(!check(doc! { "f": 0 }, Bson::Null));

        assert!(check(doc! {}, bson::bson!({ "$gte": null })));
        assert!(check(doc! { "f": null }, bson::bson!({ "$lte": null })));
        assert!(!check(doc! {}, bson::bson!({ "$gt": null })));
    }

    #[test]
    fn ne_requires_every_element_to_differ() {
        assert!(check(doc! {}, bson::bson!({ "$ne": 5 })));
        assert!(check(doc! { "f": [1, 2] }, bson::bson!({ "$ne": 3 })));
        assert!(!check(doc! { "f": [1, 2] }, bson::bson!({ "$ne": 2 })));
    }

    #[test]
    fn ordering_stays_within_brackets() {
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$gt": 5 })));
        assert!(!check(doc! { "f": "10" }, bson::bson!({ "$gt": 5 })));
        assert!(check(doc! { "f": [1, 20] }, bson::bson!({ "$gt": 10 })));
        assert!(check(doc! { "f": [1, 20] }, bson::bson!({ "$lt": 2 })));
        assert!(check(doc! { "f": "b" }, bson::bson!({ "$gte": "a", "$lte": "b" })));
        assert!(!check(doc! { "f": f64::NAN }, bson::bson!({ "$gte": 0 })));
    }

    #[test]
    fn membership() {
        assert!(check(doc! { "f": 2 }, bson::bson!({ "$in": [1, 2] })));
        assert!(check(doc! { "f": [5, 2] }, bson::bson!({ "$in": [1, 2] })));
        assert!(check(doc! {}, bson::bson!({ "$in": [null] })));
        assert!(!check(doc! { "f": [5, 2] }, bson::bson!({ "$nin": [2] })));
        assert!(check(doc! { "f": 3 }, bson::bson!({ "$nin": [1, 2] })));
        assert!(!check(doc! { "f": 3 }, bson::bson!({ "$in": [] })));
    }

    #[test]
    fn all_members_must_match() {
        assert!(check(doc! { "f": ["a", "b", "c"] }, bson::bson!({ "$all": ["a", "c"] })));
        assert!(!check(doc! { "f": ["a", "b"] }, bson::bson!({ "$all": ["a", "z"] })));
        assert!(!check(doc! { "f": ["a"] }, bson::bson!({ "$all": [] })));
        assert!(check(doc! { "f": "a" }, bson::bson!({ "$all": ["a"] })));
        assert!(check(
            doc! { "f": [{ "x": 1 }, { "x": 5 }] },
            bson::bson!({ "$all": [{ "$elemMatch": { "x": { "$gt": 4 } } }] })
        ));
    }

    #[test]
    fn size_and_exists() {
        assert!(check(doc! { "f": [1, 2] }, bson::bson!({ "$size": 2 })));
        assert!(!check(doc! { "f": [1, 2] }, bson::bson!({ "$size": 1 })));
        assert!(!check(doc! { "f": "ab" }, bson::bson!({ "$size": 2 })));

        assert!(check(doc! { "f": null }, bson::bson!({ "$exists": true })));
        assert!(check(doc! {}, bson::bson!({ "$exists": false })));
        assert!(check(doc! {}, bson::bson!({ "$exists": 0 })));
    }

    #[test]
    fn type_selectors() {
        assert!(check(doc! { "f": 1.5 }, bson::bson!({ "$type": "number" })));
        assert!(check(doc! { "f": [1, "a"] }, bson::bson!({ "$type": "string" })));
        assert!(check(doc! { "f": [1] }, bson::bson!({ "$type": "array" })));
        assert!(check(doc! { "f": 1_i64 }, bson::bson!({ "$type": [2, 18] })));
        assert!(!check(doc! {}, bson::bson!({ "$type": "null" })));
    }

    #[test]
    fn modulo_truncates() {
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$mod": [4, 2] })));
        assert!(check(doc! { "f": 10.9 }, bson::bson!({ "$mod": [4, 2] })));
        assert!(check(doc! { "f": -10 }, bson::bson!({ "$mod": [4, -2] })));
        assert!(!check(doc! { "f": "10" }, bson::bson!({ "$mod": [4, 2] })));
        assert!(check(doc! { "f": i64::MIN }, bson::bson!({ "$mod": [-1, 0] })));
    }

    #[test]
    fn regex_over_strings_and_arrays() {
        assert!(check(doc! { "f": "Alice" }, bson::bson!({ "$regex": "^al", "$options": "i" })));
        assert!(check(doc! { "f": ["x", "alpha"] }, bson::bson!({ "$regex": "^al" })));
        assert!(!check(doc! { "f": 1 }, bson::bson!({ "$regex": "1" })));
    }

    #[test]
    fn elem_match_value_and_object_forms() {
        assert!(check(doc! { "f": [70, 82] }, bson::bson!({ "$elemMatch": { "$gte": 80, "$lt": 85 } })));
        assert!(!check(doc! { "f": [70, 90] }, bson::bson!({ "$elemMatch": { "$gte": 80, "$lt": 85 } })));

        let rows = doc! { "f": [{ "sku": "a", "qty": 1 }, { "sku": "b", "qty": 5 }] };
        assert!(check(rows.clone(), bson::bson!({ "$elemMatch": { "sku": "b", "qty": { "$gt": 2 } } })));
        assert!(!check(rows, bson::bson!({ "$elemMatch": { "sku": "a", "qty": { "$gt": 2 } } })));

        assert!(!check(doc! { "f": { "sku": "a" } }, bson::bson!({ "$elemMatch": { "sku": "a" } })));
    }

    #[test]
    fn elem_match_value_form_takes_nested_arrays_whole() {
        assert!(!check(doc! { "f": [[1, 2]] }, bson::bson!({ "$elemMatch": { "$eq": 1 } })));
        assert!(!check(doc! { "f": [[5]] }, bson::bson!({ "$elemMatch": { "$gt": 3 } })));
        assert!(!check(doc! { "f": [["ab"]] }, bson::bson!({ "$elemMatch": { "$regex": "^a" } })));

        assert!(check(doc! { "f": [[1, 2]] }, bson::bson!({ "$elemMatch": { "$eq": [1, 2] } })));
        assert!(check(doc! { "f": [[1, 2], 3] }, bson::bson!({ "$elemMatch": { "$not": { "$size": 2 } } })));
        assert!(check(doc! { "f": [[1, 2]] }, bson::bson!({ "$elemMatch": { "$elemMatch": { "$gt": 1 } } })));
    }

    #[test]
    fn not_inverts_the_existential() {
        assert!(check(doc! { "f": 3 }, bson::bson!({ "$not": { "$gt": 5 } })));
        assert!(!check(doc! { "f": 7 }, bson::bson!({ "$not": { "$gt": 5 } })));
        assert!(check(doc! {}, bson::bson!({ "$not": { "$gt": 5 } })));
        assert!(!check(doc! { "f": [1, 7] }, bson::bson!({ "$not": { "$gt": 5 } })));
    }

    #[test]
    fn bitwise_tests() {
        // 0b1010
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$bitsAllSet": [1, 3] })));
        assert!(!check(doc! { "f": 10 }, bson::bson!({ "$bitsAllSet": [0, 1] })));
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$bitsAnySet": 3 })));
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$bitsAllClear": 5 })));
        assert!(check(doc! { "f": 10 }, bson::bson!({ "$bitsAnyClear": [1, 2] })));
        assert!(check(doc! { "f": -1 }, bson::bson!({ "$bitsAllSet": [70] })));
        assert!(!check(doc! { "f": 2.5 }, bson::bson!({ "$bitsAnySet": 2 })));

        let binary = Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: vec![0b0000_0001, 0b1000_0000] });
        assert!(check(doc! { "f": binary.clone() }, bson::bson!({ "$bitsAllSet": [0, 15] })));
        assert!(check(doc! { "f": binary }, bson::bson!({ "$bitsAllClear": [1, 40] })));
    }
}
