//! Query expressions, the visitor used to walk them, and builders for raw queries.
//!
//! A query starts life as a raw BSON document in MongoDB filter syntax:
//!
//! ```ignore
//! use bson::doc;
//! use docmatch::query::Expr;
//!
//! let expr = Expr::parse(&doc! {
//!     "status": "active",
//!     "age": { "$gte": 18 },
//!     "$or": [{ "tags": "admin" }, { "score": { "$gt": 90 } }],
//! })?;
//! ```
//!
//! [`Expr::parse`] validates the document once and produces an immutable tree. The tree
//! is evaluated by any [`QueryVisitor`]; the in-memory evaluator is the main one, and
//! [`Expr::field_paths`] is another.
//!
//! # Building queries
//!
//! [`Filter`] and [`Field`] compose raw query documents without hand-writing operator
//! documents:
//!
//! ```ignore
//! use docmatch::query::{Field, Filter, Query, SortDirection};
//!
//! let filter = Filter::or([
//!     Filter::eq("status", "active"),
//!     Filter::field(Field::new("age").gte(18).lt(65)),
//! ]);
//!
//! let query = Query::builder()
//!     .filter(filter.parse()?)
//!     .sort("age", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//! ```

use bson::{Bson, Document, ser::serialize_to_bson};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{QueryError, QueryResult},
    options::QueryOptions,
    parser::Parser,
    path::FieldPath,
    registry::FieldOperator,
    value::{BsonType, QueryRegex},
};


/// A parsed query expression.
///
/// The root of a parsed query is always an [`Expr::And`] over the root keys, so an
/// empty query is `And([])` and matches every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Every child must match.
    And(Vec<Expr>),
    /// At least one child must match.
    Or(Vec<Expr>),
    /// No child may match.
    Nor(Vec<Expr>),
    /// Conditions on the values found at one field path, implicitly AND-ed.
    Field {
        /// The dotted path the conditions apply to.
        path: FieldPath,
        /// One entry per operator in the condition.
        conditions: Vec<Condition>,
    },
}

/// A single field operator with its validated operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Bson),
    Ne(Bson),
    Gt(Bson),
    Gte(Bson),
    Lt(Bson),
    Lte(Bson),
    In(Vec<Member>),
    Nin(Vec<Member>),
    All(Vec<Member>),
    Size(usize),
    Exists(bool),
    Type(Vec<BsonType>),
    Mod {
        divisor: i64,
        remainder: i64,
    },
    Regex(QueryRegex),
    ElemMatch(ElemMatch),
    /// True iff the AND of the inner conditions fails.
    Not(Vec<Condition>),
    Bits {
        test: BitTest,
        /// Bit positions, least significant first.
        positions: Vec<u32>,
    },
}

impl Condition {
    /// The operator this condition was parsed from.
    pub fn operator(&self) -> FieldOperator {
        match self {
            Condition::Eq(_) => FieldOperator::Eq,
            Condition::Ne(_) => FieldOperator::Ne,
            Condition::Gt(_) => FieldOperator::Gt,
            Condition::Gte(_) => FieldOperator::Gte,
            Condition::Lt(_) => FieldOperator::Lt,
            Condition::Lte(_) => FieldOperator::Lte,
            Condition::In(_) => FieldOperator::In,
            Condition::Nin(_) => FieldOperator::Nin,
            Condition::All(_) => FieldOperator::All,
            Condition::Size(_) => FieldOperator::Size,
            Condition::Exists(_) => FieldOperator::Exists,
            Condition::Type(_) => FieldOperator::Type,
            Condition::Mod { .. } => FieldOperator::Mod,
            Condition::Regex(_) => FieldOperator::Regex,
            Condition::ElemMatch(_) => FieldOperator::ElemMatch,
            Condition::Not(_) => FieldOperator::Not,
            Condition::Bits { test: BitTest::AllSet, .. } => FieldOperator::BitsAllSet,
            Condition::Bits { test: BitTest::AllClear, .. } => FieldOperator::BitsAllClear,
            Condition::Bits { test: BitTest::AnySet, .. } => FieldOperator::BitsAnySet,
            Condition::Bits { test: BitTest::AnyClear, .. } => FieldOperator::BitsAnyClear,
        }
    }
}

/// An entry of a `$in`, `$nin` or `$all` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// Matched with `$eq` semantics.
    Value(Bson),
    /// Matched against strings, symbols and identical stored regexes.
    Regex(QueryRegex),
    /// Only produced inside `$all`.
    ElemMatch(ElemMatch),
}

/// The two forms of `$elemMatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemMatch {
    /// Every operator is applied to the element itself, e.g. `{ "$gte": 80, "$lt": 85 }`.
    Value(Vec<Condition>),
    /// The element is matched as a document, e.g. `{ "sku": "x", "qty": { "$gt": 1 } }`.
    Object(Box<Expr>),
}

/// Which bitwise test a `$bits*` operator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitTest {
    AllSet,
    AllClear,
    AnySet,
    AnyClear,
}

impl Expr {
    /// Parses a raw query with default options.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] when an operand has the wrong shape and
    /// [`QueryError::InvalidExpressionOperator`] for an unknown `$` name.
    pub fn parse(raw: &Document) -> QueryResult<Self> {
        Self::parse_with(raw, &QueryOptions::default())
    }

    /// Parses a raw query with the given options.
    pub fn parse_with(raw: &Document, options: &QueryOptions) -> QueryResult<Self> {
        match Parser::new(options).parse_root(raw, 0) {
            Ok(expr) => {
                debug!(clauses = raw.len(), "parsed query");
                Ok(expr)
            }
            Err(err) => {
                debug!(error = %err, "rejected query");
                Err(err)
            }
        }
    }

    /// Parses a query written as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] if the value cannot be represented as BSON,
    /// and [`QueryError::InvalidQuery`] if it is not an object.
    pub fn from_json(value: &Value) -> QueryResult<Self> {
        Self::from_json_with(value, &QueryOptions::default())
    }

    /// Parses a query written as JSON with the given options.
    pub fn from_json_with(value: &Value, options: &QueryOptions) -> QueryResult<Self> {
        match serialize_to_bson(value)? {
            Bson::Document(raw) => Self::parse_with(&raw, options),
            other => Err(QueryError::invalid_query(
                "$query",
                "query must be an object",
                &other,
                options.expr_render_limit,
            )),
        }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn nor(self) -> Self {
        Expr::Nor(vec![self])
    }

    /// Lists every field path this expression reads, in first-seen order.
    ///
    /// Paths inside an object-form `$elemMatch` are reported relative to the document
    /// root (`"items.sku"` rather than `"sku"`).
    pub fn field_paths(&self) -> Vec<String> {
        let mut collector = FieldCollector::default();
        collector.visit_expr(self);
        collector.paths
    }
}

/// Visitor over a parsed [`Expr`].
///
/// Parsed expressions are already valid, so visiting cannot fail.
pub trait QueryVisitor {
    type Output;

    fn visit_and(&mut self, exprs: &[Expr]) -> Self::Output;
    fn visit_or(&mut self, exprs: &[Expr]) -> Self::Output;
    fn visit_nor(&mut self, exprs: &[Expr]) -> Self::Output;
    fn visit_field(&mut self, path: &FieldPath, conditions: &[Condition]) -> Self::Output;

    fn visit_expr(&mut self, expr: &Expr) -> Self::Output {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Nor(exprs) => self.visit_nor(exprs),
            Expr::Field { path, conditions } => self.visit_field(path, conditions),
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    prefix: Option<String>,
    paths: Vec<String>,
}

impl FieldCollector {
    fn record(&mut self, path: String) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    fn collect_conditions(&mut self, base: &str, conditions: &[Condition]) {
        for condition in conditions {
            match condition {
                Condition::ElemMatch(elem_match) => self.collect_elem_match(base, elem_match),
                Condition::All(members) => {
                    for member in members {
                        if let Member::ElemMatch(elem_match) = member {
                            self.collect_elem_match(base, elem_match);
                        }
                    }
                }
                Condition::Not(inner) => self.collect_conditions(base, inner),
                _ => {}
            }
        }
    }

    fn collect_elem_match(&mut self, base: &str, elem_match: &ElemMatch) {
        match elem_match {
            ElemMatch::Value(inner) => self.collect_conditions(base, inner),
            ElemMatch::Object(expr) => {
                let mut nested = FieldCollector {
                    prefix: Some(base.to_string()),
                    paths: Vec::new(),
                };
                nested.visit_expr(expr);

                for path in nested.paths {
                    self.record(path);
                }
            }
        }
    }
}

impl QueryVisitor for FieldCollector {
    type Output = ();

    fn visit_and(&mut self, exprs: &[Expr]) {
        exprs.iter().for_each(|expr| self.visit_expr(expr));
    }

    fn visit_or(&mut self, exprs: &[Expr]) {
        exprs.iter().for_each(|expr| self.visit_expr(expr));
    }

    fn visit_nor(&mut self, exprs: &[Expr]) {
        exprs.iter().for_each(|expr| self.visit_expr(expr));
    }

    fn visit_field(&mut self, path: &FieldPath, conditions: &[Condition]) {
        let full = match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, path),
            None => path.to_string(),
        };

        self.record(full.clone());
        self.collect_conditions(&full, conditions);
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The dotted field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// A structured query for selecting documents held in memory.
///
/// Use [`QueryBuilder`] for ergonomic construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression; `None` selects everything.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Sets the sort specification for the query results.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Conditions on a single field path, built one operator at a time.
///
/// ```ignore
/// let adults = Field::new("age").gte(18).lt(65);
/// let tagged = Field::new("tags").all(["rust", "db"]).size(2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    path: String,
    operators: Document,
}

impl Field {
    /// Starts a condition on `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), operators: Document::new() }
    }

    fn with(mut self, operator: &str, operand: impl Into<Bson>) -> Self {
        self.operators.insert(operator, operand.into());
        self
    }

    fn list<I, V>(values: I) -> Bson
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Bson::Array(values.into_iter().map(Into::into).collect())
    }

    pub fn eq(self, value: impl Into<Bson>) -> Self {
        self.with("$eq", value)
    }

    pub fn ne(self, value: impl Into<Bson>) -> Self {
        self.with("$ne", value)
    }

    pub fn gt(self, value: impl Into<Bson>) -> Self {
        self.with("$gt", value)
    }

    pub fn gte(self, value: impl Into<Bson>) -> Self {
        self.with("$gte", value)
    }

    pub fn lt(self, value: impl Into<Bson>) -> Self {
        self.with("$lt", value)
    }

    pub fn lte(self, value: impl Into<Bson>) -> Self {
        self.with("$lte", value)
    }

    /// `$in`: the field equals any of `values`.
    pub fn any_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.with("$in", Self::list(values))
    }

    /// `$nin`: the field equals none of `values`.
    pub fn none_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.with("$nin", Self::list(values))
    }

    /// `$all`: the array field contains every one of `values`.
    pub fn all<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.with("$all", Self::list(values))
    }

    pub fn size(self, size: i64) -> Self {
        self.with("$size", size)
    }

    pub fn exists(self, exists: bool) -> Self {
        self.with("$exists", exists)
    }

    /// `$type` with an alias such as `"string"` or `"number"`.
    pub fn has_type(self, alias: &str) -> Self {
        self.with("$type", alias)
    }

    /// `$mod`: `value % divisor == remainder`.
    pub fn modulo(self, divisor: i64, remainder: i64) -> Self {
        self.with("$mod", Bson::Array(vec![Bson::Int64(divisor), Bson::Int64(remainder)]))
    }

    /// `$regex` with optional `$options`.
    pub fn regex(self, pattern: &str, options: &str) -> Self {
        let field = self.with("$regex", pattern);

        if options.is_empty() {
            field
        } else {
            field.with("$options", options)
        }
    }

    /// Object-form `$elemMatch`: some array element matches `filter` as a document.
    pub fn elem_match(self, filter: Filter) -> Self {
        self.with("$elemMatch", filter.into_document())
    }

    /// Value-form `$elemMatch`: some array element satisfies every operator added by
    /// `build`.
    pub fn elem_match_value(self, build: impl FnOnce(Field) -> Field) -> Self {
        let inner = build(Field::new(self.path.clone()));
        self.with("$elemMatch", inner.operators)
    }

    /// `$not`: the operators added by `build` must not all hold.
    pub fn not(self, build: impl FnOnce(Field) -> Field) -> Self {
        let inner = build(Field::new(self.path.clone()));
        self.with("$not", inner.operators)
    }

    pub fn bits_all_set(self, mask: impl Into<Bson>) -> Self {
        self.with("$bitsAllSet", mask)
    }

    pub fn bits_all_clear(self, mask: impl Into<Bson>) -> Self {
        self.with("$bitsAllClear", mask)
    }

    pub fn bits_any_set(self, mask: impl Into<Bson>) -> Self {
        self.with("$bitsAnySet", mask)
    }

    pub fn bits_any_clear(self, mask: impl Into<Bson>) -> Self {
        self.with("$bitsAnyClear", mask)
    }
}

/// A raw query document under construction.
///
/// Static constructors cover the common single-operator cases; [`Filter::with`] merges
/// a [`Field`] into an existing filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    document: Document,
}

impl Filter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter holding the conditions of `field`.
    pub fn field(field: Field) -> Self {
        Self::new().with(field)
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).eq(value))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).ne(value))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).gt(value))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).gte(value))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).lt(value))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::field(Field::new(field).lte(value))
    }

    /// Matches documents where the field exists.
    pub fn exists(field: impl Into<String>) -> Self {
        Self::field(Field::new(field).exists(true))
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(field: impl Into<String>) -> Self {
        Self::field(Field::new(field).exists(false))
    }

    /// Matches documents where the field equals any of `values`.
    pub fn any_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::field(Field::new(field).any_of(values))
    }

    /// Matches documents where the field equals none of `values`.
    pub fn none_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::field(Field::new(field).none_of(values))
    }

    /// `$and` over `filters`.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::logical("$and", filters)
    }

    /// `$or` over `filters`.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::logical("$or", filters)
    }

    /// `$nor` over `filters`.
    pub fn nor(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::logical("$nor", filters)
    }

    fn logical(operator: &str, filters: impl IntoIterator<Item = Filter>) -> Self {
        let items = filters
            .into_iter()
            .map(|filter| Bson::Document(filter.document))
            .collect::<Vec<_>>();

        let mut document = Document::new();
        document.insert(operator, items);
        Self { document }
    }

    /// Adds the conditions of `field`, merging with existing operators on the same path.
    pub fn with(mut self, field: Field) -> Self {
        match self.document.get_mut(&field.path) {
            Some(Bson::Document(existing)) => {
                for (operator, operand) in field.operators {
                    existing.insert(operator, operand);
                }
            }
            _ => {
                self.document.insert(field.path, field.operators);
            }
        }

        self
    }

    /// Attaches a `$comment`.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.document.insert("$comment", text.into());
        self
    }

    /// Returns the raw query document.
    pub fn as_document(&self) -> &Document {
        &self.document
    }

    /// Consumes the filter, returning the raw query document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Parses the filter with default options.
    pub fn parse(&self) -> QueryResult<Expr> {
        Expr::parse(&self.document)
    }

    /// Parses the filter with the given options.
    pub fn parse_with(&self, options: &QueryOptions) -> QueryResult<Expr> {
        Expr::parse_with(&self.document, options)
    }
}

impl From<Filter> for Document {
    fn from(filter: Filter) -> Self {
        filter.document
    }
}

impl From<Field> for Filter {
    fn from(field: Field) -> Self {
        Filter::field(field)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    #[test]
    fn empty_query_is_an_empty_conjunction() {
        assert_eq!(Expr::parse(&doc! {}).unwrap(), Expr::And(vec![]));
    }

    #[test]
    fn json_queries_parse_like_bson() {
        let from_json = Expr::from_json(&json!({ "age": { "$gte": 18 }, "name": "Ada" })).unwrap();
        assert_eq!(from_json.field_paths(), vec!["age", "name"]);

        let err = Expr::from_json(&json!({ "age": { "$in": 5 } })).unwrap_err();
        assert_eq!(err.operator(), Some("$in"));

        let err = Expr::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.operator(), Some("$query"));
    }

    #[test]
    fn field_builders_produce_operator_documents() {
        let filter = Filter::field(Field::new("age").gte(18).lt(65))
            .with(Field::new("tags").all(["a", "b"]))
            .with(Field::new("age").ne(30));

        assert_eq!(
            filter.into_document(),
            doc! {
                "age": { "$gte": 18, "$lt": 65, "$ne": 30 },
                "tags": { "$all": ["a", "b"] },
            }
        );
    }

    #[test]
    fn nested_builders() {
        let filter = Filter::field(
            Field::new("scores")
                .elem_match_value(|f| f.gte(80).lt(85))
                .not(|f| f.size(0)),
        );

        assert_eq!(
            filter.as_document(),
            &doc! { "scores": { "$elemMatch": { "$gte": 80, "$lt": 85 }, "$not": { "$size": 0_i64 } } }
        );
        assert!(filter.parse().is_ok());

        let items = Filter::field(Field::new("items").elem_match(Filter::eq("sku", "x").with(Field::new("qty").gt(1))));
        assert!(items.parse().is_ok());
    }

    #[test]
    fn logical_builders() {
        let filter = Filter::or([Filter::eq("a", 1), Filter::nor([Filter::exists("b")])]).comment("audit");

        assert_eq!(
            filter.into_document(),
            doc! {
                "$or": [{ "a": { "$eq": 1 } }, { "$nor": [{ "b": { "$exists": true } }] }],
                "$comment": "audit",
            }
        );
    }

    #[test]
    fn expressions_chain() {
        let a = Filter::eq("a", 1).parse().unwrap();
        let b = Filter::eq("b", 2).parse().unwrap();

        match a.clone().and(b.clone()) {
            Expr::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected $and, got {:?}", other),
        }

        assert!(matches!(a.clone().or(b), Expr::Or(children) if children.len() == 2));
        assert!(matches!(a.nor(), Expr::Nor(children) if children.len() == 1));
    }

    #[test]
    fn field_paths_are_collected_once_in_order() {
        let expr = Expr::parse(&doc! {
            "name": "x",
            "$or": [{ "age": { "$gt": 1 } }, { "name": { "$exists": false } }],
            "items": { "$elemMatch": { "sku": "a", "$and": [{ "qty": 2 }] } },
            "tags": { "$all": [{ "$elemMatch": { "label": "y" } }] },
        })
        .unwrap();

        assert_eq!(
            expr.field_paths(),
            vec!["name", "age", "items", "items.sku", "items.qty", "tags", "tags.label"]
        );
    }

    #[test]
    fn query_builder_sets_every_part() {
        let query = Query::builder()
            .filter(Filter::eq("a", 1).parse().unwrap())
            .limit(5)
            .offset(2)
            .sort("a", SortDirection::Desc)
            .build();

        assert!(query.filter.is_some());
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, Some(2));
        assert_eq!(query.sort, Some(Sort { field: "a".to_string(), direction: SortDirection::Desc }));
        assert_eq!(Query::new(), Query::default());
    }
}
