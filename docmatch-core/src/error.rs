//! Error types and result types for query parsing and matching.
//!
//! This module provides the error taxonomy shared by every crate in the workspace.
//! Use [`QueryResult<T>`] as the return type for fallible operations.
//!
//! Errors are only ever raised for structurally invalid queries (or for values that
//! cannot be converted to BSON in the first place). A well-formed query applied to any
//! document yields `Ok(true)` or `Ok(false)`, never an error.

use bson::{Bson, error::Error as BsonError};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Default number of characters kept when rendering an offending expression.
pub const DEFAULT_EXPR_RENDER_LIMIT: usize = 100;

/// Represents all possible errors that can occur while parsing or evaluating a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// An operator was given an operand of the wrong shape or type.
    ///
    /// `expr` holds a truncated rendering of the offending expression, never the whole
    /// document being matched.
    #[error("Invalid query for {operator}: {message}: {expr}")]
    InvalidQuery {
        /// The operator (or structural position, e.g. `$and`) that rejected the operand.
        operator: String,
        /// Human readable reason.
        message: String,
        /// Bounded rendering of the offending expression.
        expr: String,
    },
    /// An unknown `$`-prefixed key was found where an operator was expected.
    #[error("Invalid expression operator: {0}")]
    InvalidExpressionOperator(String),
    /// Converting a typed value or a JSON query to BSON failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// Builds an [`QueryError::InvalidQuery`] rendering `expr` with at most `limit` characters.
    pub fn invalid_query(
        operator: impl Into<String>,
        message: impl Into<String>,
        expr: &Bson,
        limit: usize,
    ) -> Self {
        QueryError::InvalidQuery {
            operator: operator.into(),
            message: message.into(),
            expr: truncate_expr(expr, limit),
        }
    }

    /// Returns the operator carried by this error, if any.
    pub fn operator(&self) -> Option<&str> {
        match self {
            QueryError::InvalidQuery { operator, .. } => Some(operator),
            QueryError::InvalidExpressionOperator(operator) => Some(operator),
            QueryError::Serialization(_) => None,
        }
    }
}

/// A specialized `Result` type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Renders `expr` for diagnostics, keeping at most `limit` characters.
///
/// Longer renderings are cut on a character boundary and suffixed with `...`.
pub fn truncate_expr(expr: &Bson, limit: usize) -> String {
    let rendered = expr.to_string();

    match rendered.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &rendered[..cut]),
        None => rendered,
    }
}

impl From<BsonError> for QueryError {
    fn from(err: BsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for QueryError {
    fn from(err: SerdeJsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::bson;

    #[test]
    fn short_expressions_are_rendered_whole() {
        let rendered = truncate_expr(&bson!({ "$in": 5 }), DEFAULT_EXPR_RENDER_LIMIT);
        assert!(!rendered.ends_with("..."));
        assert!(rendered.contains("$in"));
    }

    #[test]
    fn long_expressions_are_truncated() {
        let long = Bson::String("x".repeat(500));
        let rendered = truncate_expr(&long, 10);
        assert_eq!(rendered.chars().count(), 13);
        assert!(rendered.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let wide = Bson::String("é".repeat(50));
        let rendered = truncate_expr(&wide, 5);
        assert!(rendered.ends_with("..."));
        assert_eq!(rendered.chars().count(), 8);
    }

    #[test]
    fn operator_is_exposed() {
        let err = QueryError::invalid_query("$in", "requires an array", &Bson::Int32(5), 100);
        assert_eq!(err.operator(), Some("$in"));
        assert!(err.to_string().contains("$in"));

        let err = QueryError::InvalidExpressionOperator("$bogus".to_string());
        assert_eq!(err.operator(), Some("$bogus"));
    }
}
