//! Query expression evaluation for in-memory document matching.
//!
//! [`DocumentEvaluator`] walks a parsed [`Expr`] against one document. Logical nodes are
//! handed to the combinators in [`crate::logical`]; field nodes resolve their path once
//! and apply every condition with [`crate::operators`].
//!
//! Most callers use [`evaluate`] for one-off checks, or a [`Matcher`] when the same
//! query is applied to many documents.

use bson::{Bson, Document as BsonDocument};
use serde_json::Value;
use tracing::trace;

use docmatch_core::{
    document::{Document, DocumentExt, DocumentLike},
    error::{QueryError, QueryResult},
    options::QueryOptions,
    path::{FieldPath, resolve},
    query::{Condition, Expr, QueryVisitor},
};

use crate::{logical, operators};


pub struct DocumentEvaluator<'a, D: DocumentLike + ?Sized> {
    document: &'a D,
}

impl<'a, D: DocumentLike + ?Sized> DocumentEvaluator<'a, D> {
    pub fn new(document: &'a D) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> bool {
        self.visit_expr(expr)
    }

    /// Keeps the documents that match `expr`, preserving their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a D>,
        expr: &Expr,
    ) -> Vec<&'a D> {
        documents
            .into_iter()
            .filter(|doc| DocumentEvaluator::new(*doc).evaluate(expr))
            .collect::<Vec<_>>()
    }
}

impl<'a, D: DocumentLike + ?Sized> QueryVisitor for DocumentEvaluator<'a, D> {
    type Output = bool;

    fn visit_and(&mut self, exprs: &[Expr]) -> bool {
        logical::all_of(exprs, |expr| self.visit_expr(expr))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> bool {
        logical::any_of(exprs, |expr| self.visit_expr(expr))
    }

    fn visit_nor(&mut self, exprs: &[Expr]) -> bool {
        logical::none_of(exprs, |expr| self.visit_expr(expr))
    }

    fn visit_field(&mut self, path: &FieldPath, conditions: &[Condition]) -> bool {
        let resolved = resolve(self.document, path);
        let matched = operators::matches_conditions(&resolved, conditions);

        trace!(path = %path, branches = resolved.branches().len(), matched, "evaluated field");

        matched
    }
}

/// Parses `query` and matches it against `document`.
///
/// # Errors
///
/// Returns the parse error for a structurally invalid query, even when the offending
/// clause would never be reached during evaluation.
pub fn evaluate<D: DocumentLike + ?Sized>(document: &D, query: &BsonDocument) -> QueryResult<bool> {
    let expr = Expr::parse(query)?;
    let matched = DocumentEvaluator::new(document).evaluate(&expr);

    trace!(matched, "evaluated query");

    Ok(matched)
}

/// A parsed query ready to be applied to many documents.
///
/// `Matcher` is immutable, `Send` and `Sync`; share it freely between threads.
///
/// ```ignore
/// use bson::doc;
/// use docmatch_memory::Matcher;
///
/// let adults = Matcher::new(&doc! { "age": { "$gte": 18 } })?;
/// assert!(adults.matches(&doc! { "age": 30 }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    expr: Expr,
    options: QueryOptions,
}

impl Matcher {
    /// Parses `query` with default options.
    pub fn new(query: &BsonDocument) -> QueryResult<Self> {
        Self::builder().query(query.clone()).build()
    }

    /// Wraps an already parsed expression.
    pub fn from_expr(expr: Expr) -> Self {
        Self { expr, options: QueryOptions::default() }
    }

    pub fn builder() -> MatcherBuilder {
        MatcherBuilder::default()
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns `true` if `document` satisfies the query.
    pub fn matches<D: DocumentLike + ?Sized>(&self, document: &D) -> bool {
        DocumentEvaluator::new(document).evaluate(&self.expr)
    }

    /// Matches a typed entity through its BSON form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] if the entity cannot be serialized.
    pub fn matches_entity<T: Document>(&self, entity: &T) -> QueryResult<bool> {
        let bson: Bson = entity.to_bson()?;
        Ok(self.matches(&bson))
    }

    /// Keeps the documents that satisfy the query, preserving their order.
    pub fn filter<'d, D, I>(&self, documents: I) -> Vec<&'d D>
    where
        D: DocumentLike + ?Sized + 'd,
        I: IntoIterator<Item = &'d D>,
    {
        documents
            .into_iter()
            .filter(|document| self.matches(*document))
            .collect()
    }
}

/// Builder for [`Matcher`].
///
/// Without a query the matcher accepts every document.
#[derive(Debug, Clone, Default)]
pub struct MatcherBuilder {
    options: QueryOptions,
    query: Option<QuerySource>,
}

#[derive(Debug, Clone)]
enum QuerySource {
    Bson(BsonDocument),
    Json(Value),
}

impl MatcherBuilder {
    /// Sets the options used while parsing.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the raw query.
    pub fn query(mut self, query: impl Into<BsonDocument>) -> Self {
        self.query = Some(QuerySource::Bson(query.into()));
        self
    }

    /// Sets the raw query from JSON.
    pub fn json(mut self, query: Value) -> Self {
        self.query = Some(QuerySource::Json(query));
        self
    }

    /// Parses the query and builds the matcher.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] or [`QueryError::InvalidExpressionOperator`]
    /// for a malformed query, and [`QueryError::Serialization`] for JSON that has no
    /// BSON representation.
    pub fn build(self) -> QueryResult<Matcher> {
        let expr = match &self.query {
            Some(QuerySource::Bson(raw)) => Expr::parse_with(raw, &self.options)?,
            Some(QuerySource::Json(raw)) => Expr::from_json_with(raw, &self.options)?,
            None => Expr::And(vec![]),
        };

        Ok(Matcher { expr, options: self.options })
    }
}

impl TryFrom<&BsonDocument> for Matcher {
    type Error = QueryError;

    fn try_from(query: &BsonDocument) -> QueryResult<Self> {
        Matcher::new(query)
    }
}
