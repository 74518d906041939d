//! Value coercion for query evaluation.
//!
//! Stored values and query literals are both BSON, but they rarely agree on their
//! exact representation: an `Int32` field must equal an `Int64` literal, a `Symbol` must
//! equal a `String`, and a `Double` must order against a `Decimal128`. This module
//! normalizes both sides into a [`Comparable`] before comparing.
//!
//! Every BSON value belongs to a [`ValueKind`]. Equality and ordering are only defined
//! between values of the same kind; comparing across kinds never matches.

use std::{cmp::Ordering, fmt};

use bson::Bson;
use regex::{Regex, RegexBuilder};

use crate::{
    error::{QueryError, QueryResult},
    options::QueryOptions,
};


/// Closed set of comparison brackets.
///
/// Numeric BSON types share [`ValueKind::Number`] and `String`/`Symbol` share
/// [`ValueKind::String`]; every other BSON type is its own bracket. Variants are
/// declared in cross-bracket sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    MinKey,
    Null,
    Undefined,
    Number,
    String,
    Document,
    Array,
    Binary,
    ObjectId,
    Boolean,
    DateTime,
    Timestamp,
    Regex,
    JavaScript,
    DbPointer,
    MaxKey,
}

impl ValueKind {
    /// Returns the bracket a BSON value belongs to.
    pub fn of(value: &Bson) -> Self {
        match value {
            Bson::MinKey => ValueKind::MinKey,
            Bson::Null => ValueKind::Null,
            Bson::Undefined => ValueKind::Undefined,
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => ValueKind::Number,
            Bson::String(_) | Bson::Symbol(_) => ValueKind::String,
            Bson::Document(_) => ValueKind::Document,
            Bson::Array(_) => ValueKind::Array,
            Bson::Binary(_) => ValueKind::Binary,
            Bson::ObjectId(_) => ValueKind::ObjectId,
            Bson::Boolean(_) => ValueKind::Boolean,
            Bson::DateTime(_) => ValueKind::DateTime,
            Bson::Timestamp(_) => ValueKind::Timestamp,
            Bson::RegularExpression(_) => ValueKind::Regex,
            Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => ValueKind::JavaScript,
            Bson::DbPointer(_) => ValueKind::DbPointer,
            Bson::MaxKey => ValueKind::MaxKey,
        }
    }
}

/// A numeric value widened for comparison.
///
/// Integer pairs compare exactly; any pair involving a float (or a decimal, which is
/// widened through its decimal string) compares as `f64`. NaN equals NaN and is
/// unordered against every other number.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Extracts a number from a BSON numeric value.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(value) => Some(Number::Int(*value as i64)),
            Bson::Int64(value) => Some(Number::Int(*value)),
            Bson::Double(value) => Some(Number::Float(*value)),
            Bson::Decimal128(value) => value
                .to_string()
                .parse::<f64>()
                .ok()
                .map(Number::Float),
            _ => None,
        }
    }

    /// Widens this number to `f64`.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Returns the value as `i64` if it is a whole number in range.
    pub fn as_integral(self) -> Option<i64> {
        match self {
            Number::Int(value) => Some(value),
            Number::Float(value) if value.fract() == 0.0 => Self::float_to_i64(value),
            Number::Float(_) => None,
        }
    }

    /// Truncates toward zero; `None` for NaN, infinities and out-of-range values.
    pub fn truncate(self) -> Option<i64> {
        match self {
            Number::Int(value) => Some(value),
            Number::Float(value) => Self::float_to_i64(value.trunc()),
        }
    }

    /// Compares two numbers, returning `None` when exactly one side is NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(left), Number::Int(right)) => Some(left.cmp(&right)),
            _ => {
                let (left, right) = (self.to_f64(), other.to_f64());

                if left.is_nan() && right.is_nan() {
                    Some(Ordering::Equal)
                } else {
                    left.partial_cmp(&right)
                }
            }
        }
    }

    fn float_to_i64(value: f64) -> Option<i64> {
        // 2^63 is exactly representable; anything at or above it overflows.
        if value.is_finite() && value >= -9_223_372_036_854_775_808.0 && value < 9_223_372_036_854_775_808.0 {
            Some(value as i64)
        } else {
            None
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

/// Type-erased, comparable representation of BSON values.
///
/// Built from a `&Bson` through [`Coercible::comparable`] or `From`. Equality is
/// structural within a [`ValueKind`]; ordering is defined within a kind except for
/// JavaScript and DB pointers, which only order as equal to themselves.
///
/// Documents and arrays order element by element. Nested values of different kinds
/// order by the cross-bracket order of [`ValueKind`].
#[derive(Debug, Clone)]
pub enum Comparable<'a> {
    MinKey,
    Null,
    Undefined,
    Number(Number),
    String(&'a str),
    /// Fields in document order. Equality ignores key order; ordering does not.
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    Binary(u8, &'a [u8]),
    ObjectId([u8; 12]),
    Bool(bool),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    /// `(time, increment)`.
    Timestamp(u32, u32),
    /// `(pattern, options)`.
    Regex(&'a str, &'a str),
    /// Values compared with BSON's own equality.
    Other(&'a Bson),
    MaxKey,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::MinKey => Comparable::MinKey,
            Bson::Null => Comparable::Null,
            Bson::Undefined => Comparable::Undefined,
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
                match Number::from_bson(bson) {
                    Some(number) => Comparable::Number(number),
                    None => Comparable::Other(bson),
                }
            }
            Bson::String(value) => Comparable::String(value),
            Bson::Symbol(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Binary(binary) => Comparable::Binary(u8::from(binary.subtype), &binary.bytes),
            Bson::ObjectId(oid) => Comparable::ObjectId(oid.bytes()),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(value.timestamp_millis()),
            Bson::Timestamp(ts) => Comparable::Timestamp(ts.time, ts.increment),
            Bson::RegularExpression(regex) => Comparable::Regex(regex.pattern.as_str(), regex.options.as_str()),
            Bson::MaxKey => Comparable::MaxKey,
            _ => Comparable::Other(bson),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::MinKey, Comparable::MinKey) => true,
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Undefined, Comparable::Undefined) => true,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => same_fields(a, b),
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Binary(sa, a), Comparable::Binary(sb, b)) => sa == sb && a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::Timestamp(ta, ia), Comparable::Timestamp(tb, ib)) => ta == tb && ia == ib,
            (Comparable::Regex(pa, oa), Comparable::Regex(pb, ob)) => pa == pb && sorted_flags(oa) == sorted_flags(ob),
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            (Comparable::MaxKey, Comparable::MaxKey) => true,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.compare(*b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::Timestamp(ta, ia), Comparable::Timestamp(tb, ib)) => (ta, ia).partial_cmp(&(tb, ib)),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Binary(sa, a), Comparable::Binary(sb, b)) => (a.len(), sa, a).partial_cmp(&(b.len(), sb, b)),
            (Comparable::Array(a), Comparable::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    match compare_nested(left, right)? {
                        Ordering::Equal => continue,
                        ordering => return Some(ordering),
                    }
                }

                Some(a.len().cmp(&b.len()))
            }
            (Comparable::Map(a), Comparable::Map(b)) => {
                if same_fields(a, b) {
                    return Some(Ordering::Equal);
                }

                for ((left_key, left), (right_key, right)) in a.iter().zip(b.iter()) {
                    let ordering = left
                        .kind()
                        .cmp(&right.kind())
                        .then_with(|| left_key.cmp(right_key));

                    match ordering {
                        Ordering::Equal => match left.partial_cmp(right)? {
                            Ordering::Equal => continue,
                            ordering => return Some(ordering),
                        }
                        ordering => return Some(ordering),
                    }
                }

                Some(a.len().cmp(&b.len()))
            }
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Returns the bracket this value was built from.
    pub fn kind(&self) -> ValueKind {
        match self {
            Comparable::MinKey => ValueKind::MinKey,
            Comparable::Null => ValueKind::Null,
            Comparable::Undefined => ValueKind::Undefined,
            Comparable::Number(_) => ValueKind::Number,
            Comparable::String(_) => ValueKind::String,
            Comparable::Map(_) => ValueKind::Document,
            Comparable::Array(_) => ValueKind::Array,
            Comparable::Binary(..) => ValueKind::Binary,
            Comparable::ObjectId(_) => ValueKind::ObjectId,
            Comparable::Bool(_) => ValueKind::Boolean,
            Comparable::DateTime(_) => ValueKind::DateTime,
            Comparable::Timestamp(..) => ValueKind::Timestamp,
            Comparable::Regex(..) => ValueKind::Regex,
            Comparable::Other(bson) => ValueKind::of(bson),
            Comparable::MaxKey => ValueKind::MaxKey,
        }
    }
}

/// Same keys with equal values, in any order.
fn same_fields(left: &[(&str, Comparable<'_>)], right: &[(&str, Comparable<'_>)]) -> bool {
    left.len() == right.len()
        && left.iter().all(|(key, value)| {
            right
                .iter()
                .any(|(other_key, other_value)| key == other_key && value == other_value)
        })
}

/// Orders values nested inside documents and arrays, across brackets by kind.
fn compare_nested(left: &Comparable<'_>, right: &Comparable<'_>) -> Option<Ordering> {
    match left.kind().cmp(&right.kind()) {
        Ordering::Equal => left.partial_cmp(right),
        ordering => Some(ordering),
    }
}

fn sorted_flags(flags: &str) -> Vec<char> {
    let mut chars = flags.chars().collect::<Vec<_>>();
    chars.sort_unstable();
    chars
}

/// Capability implemented by values that can take part in a query comparison.
pub trait Coercible {
    /// Returns the comparison bracket of this value.
    fn kind(&self) -> ValueKind;

    /// Normalizes this value into its comparable form.
    fn comparable(&self) -> Comparable<'_>;
}

impl Coercible for Bson {
    fn kind(&self) -> ValueKind {
        ValueKind::of(self)
    }

    fn comparable(&self) -> Comparable<'_> {
        Comparable::from(self)
    }
}

/// Normalizes a stored value and a literal for comparison.
///
/// Returns `None` when they belong to different brackets, in which case no equality or
/// ordering operator can match.
pub fn coerce_for_comparison<'a, 'b>(
    stored: &'a Bson,
    literal: &'b Bson,
) -> Option<(Comparable<'a>, Comparable<'b>)> {
    if stored.kind() != literal.kind() {
        return None;
    }

    Some((stored.comparable(), literal.comparable()))
}

/// Returns `true` if both values are equal after coercion.
pub fn values_equal(stored: &Bson, literal: &Bson) -> bool {
    match coerce_for_comparison(stored, literal) {
        Some((left, right)) => left == right,
        None => false,
    }
}

/// Orders two values after coercion; `None` across brackets.
pub fn compare_values(stored: &Bson, literal: &Bson) -> Option<Ordering> {
    let (left, right) = coerce_for_comparison(stored, literal)?;
    left.partial_cmp(&right)
}

/// Truthiness used by `$exists`: `false`, zero, null and undefined are false.
pub fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(value) => *value,
        Bson::Null | Bson::Undefined => false,
        other => match Number::from_bson(other) {
            Some(number) => number.to_f64() != 0.0,
            None => true,
        }
    }
}

/// A regular expression compiled once per query condition.
///
/// Options follow the server's letters: `i` (case insensitive), `m` (multi-line),
/// `s` (dot matches newline), `x` (extended); `u` and `l` are accepted and have no
/// effect. Any other letter is rejected.
///
/// Patterns use the `regex` crate's syntax, which guarantees linear-time matching and
/// has no lookaround or backreferences. Patterns such as `(?=x)` or `(a)\1` are
/// rejected as [`QueryError::InvalidQuery`] when the query is parsed.
#[derive(Clone)]
pub struct QueryRegex {
    pattern: String,
    options: String,
    regex: Regex,
}

impl QueryRegex {
    /// Compiles `pattern` with `flags`, reporting failures against `operator`/`expr`.
    pub fn compile(
        pattern: &str,
        flags: &str,
        operator: &str,
        expr: &Bson,
        options: &QueryOptions,
    ) -> QueryResult<Self> {
        let invalid = |message: String| {
            QueryError::invalid_query(operator, message, expr, options.expr_render_limit)
        };

        let mut builder = RegexBuilder::new(pattern);
        builder.size_limit(options.regex_size_limit);

        for flag in flags.chars() {
            match flag {
                'i' => { builder.case_insensitive(true); }
                'm' => { builder.multi_line(true); }
                's' => { builder.dot_matches_new_line(true); }
                'x' => { builder.ignore_whitespace(true); }
                'u' | 'l' => {}
                other => return Err(invalid(format!("invalid regex option '{}'", other))),
            }
        }

        let regex = builder
            .build()
            .map_err(|err| invalid(format!("invalid regex: {}", err)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            options: sorted_flags(flags).into_iter().collect(),
            regex,
        })
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the option letters, sorted.
    pub fn options(&self) -> &str {
        &self.options
    }

    /// Matches a single (non-array) value.
    ///
    /// Strings and symbols are matched against the pattern. A stored regex matches
    /// only when its pattern and options are identical to this one.
    pub fn is_match(&self, value: &Bson) -> bool {
        match value {
            Bson::String(text) | Bson::Symbol(text) => self.regex.is_match(text),
            Bson::RegularExpression(stored) => {
                stored.pattern.as_str() == self.pattern
                    && sorted_flags(stored.options.as_str()) == sorted_flags(&self.options)
            }
            _ => false,
        }
    }
}

impl PartialEq for QueryRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.options == other.options
    }
}

impl fmt::Debug for QueryRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.options)
    }
}

/// BSON type selectors accepted by `$type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonType {
    Double,
    String,
    Object,
    Array,
    Binary,
    Undefined,
    ObjectId,
    Boolean,
    Date,
    Null,
    Regex,
    DbPointer,
    JavaScript,
    Symbol,
    JavaScriptWithScope,
    Int,
    Timestamp,
    Long,
    Decimal,
    MinKey,
    MaxKey,
    /// Any numeric type.
    Number,
}

impl BsonType {
    /// Resolves a type alias such as `"string"` or `"objectId"`.
    pub fn from_alias(alias: &str) -> Option<Self> {
        Some(match alias {
            "double" => BsonType::Double,
            "string" => BsonType::String,
            "object" => BsonType::Object,
            "array" => BsonType::Array,
            "binData" => BsonType::Binary,
            "undefined" => BsonType::Undefined,
            "objectId" => BsonType::ObjectId,
            "bool" => BsonType::Boolean,
            "date" => BsonType::Date,
            "null" => BsonType::Null,
            "regex" => BsonType::Regex,
            "dbPointer" => BsonType::DbPointer,
            "javascript" => BsonType::JavaScript,
            "symbol" => BsonType::Symbol,
            "javascriptWithScope" => BsonType::JavaScriptWithScope,
            "int" => BsonType::Int,
            "timestamp" => BsonType::Timestamp,
            "long" => BsonType::Long,
            "decimal" => BsonType::Decimal,
            "minKey" => BsonType::MinKey,
            "maxKey" => BsonType::MaxKey,
            "number" => BsonType::Number,
            _ => return None,
        })
    }

    /// Resolves a numeric BSON type code.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => BsonType::Double,
            2 => BsonType::String,
            3 => BsonType::Object,
            4 => BsonType::Array,
            5 => BsonType::Binary,
            6 => BsonType::Undefined,
            7 => BsonType::ObjectId,
            8 => BsonType::Boolean,
            9 => BsonType::Date,
            10 => BsonType::Null,
            11 => BsonType::Regex,
            12 => BsonType::DbPointer,
            13 => BsonType::JavaScript,
            14 => BsonType::Symbol,
            15 => BsonType::JavaScriptWithScope,
            16 => BsonType::Int,
            17 => BsonType::Timestamp,
            18 => BsonType::Long,
            19 => BsonType::Decimal,
            -1 => BsonType::MinKey,
            127 => BsonType::MaxKey,
            _ => return None,
        })
    }

    /// Returns `true` if `value` is of this type.
    pub fn matches(&self, value: &Bson) -> bool {
        matches!(
            (self, value),
            (BsonType::Double, Bson::Double(_))
                | (BsonType::String, Bson::String(_))
                | (BsonType::Object, Bson::Document(_))
                | (BsonType::Array, Bson::Array(_))
                | (BsonType::Binary, Bson::Binary(_))
                | (BsonType::Undefined, Bson::Undefined)
                | (BsonType::ObjectId, Bson::ObjectId(_))
                | (BsonType::Boolean, Bson::Boolean(_))
                | (BsonType::Date, Bson::DateTime(_))
                | (BsonType::Null, Bson::Null)
                | (BsonType::Regex, Bson::RegularExpression(_))
                | (BsonType::DbPointer, Bson::DbPointer(_))
                | (BsonType::JavaScript, Bson::JavaScriptCode(_))
                | (BsonType::Symbol, Bson::Symbol(_))
                | (BsonType::JavaScriptWithScope, Bson::JavaScriptCodeWithScope(_))
                | (BsonType::Int, Bson::Int32(_))
                | (BsonType::Timestamp, Bson::Timestamp(_))
                | (BsonType::Long, Bson::Int64(_))
                | (BsonType::Decimal, Bson::Decimal128(_))
                | (BsonType::MinKey, Bson::MinKey)
                | (BsonType::MaxKey, Bson::MaxKey)
                | (BsonType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
        )
    }
}

/// Extracts bytes of a binary value for bitwise tests, least significant byte first.
pub fn binary_bytes(value: &Bson) -> Option<&[u8]> {
    match value {
        Bson::Binary(binary) => Some(&binary.bytes),
        _ => None,
    }
}
