//! Operator registry.
//!
//! The set of supported operators is closed: every `$`-prefixed name maps to exactly
//! one variant of [`FieldOperator`] or [`ExpressionOperator`], and any other name is
//! rejected with [`QueryError::InvalidExpressionOperator`].

use std::fmt;

use crate::error::{QueryError, QueryResult};


/// Operators applied to the value(s) of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    All,
    Size,
    Exists,
    Type,
    Mod,
    Regex,
    /// Only valid next to `$regex`.
    Options,
    ElemMatch,
    Not,
    BitsAllSet,
    BitsAllClear,
    BitsAnySet,
    BitsAnyClear,
}

impl FieldOperator {
    const TABLE: [(&'static str, FieldOperator); 21] = [
        ("$eq", FieldOperator::Eq),
        ("$ne", FieldOperator::Ne),
        ("$gt", FieldOperator::Gt),
        ("$gte", FieldOperator::Gte),
        ("$lt", FieldOperator::Lt),
        ("$lte", FieldOperator::Lte),
        ("$in", FieldOperator::In),
        ("$nin", FieldOperator::Nin),
        ("$all", FieldOperator::All),
        ("$size", FieldOperator::Size),
        ("$exists", FieldOperator::Exists),
        ("$type", FieldOperator::Type),
        ("$mod", FieldOperator::Mod),
        ("$regex", FieldOperator::Regex),
        ("$options", FieldOperator::Options),
        ("$elemMatch", FieldOperator::ElemMatch),
        ("$not", FieldOperator::Not),
        ("$bitsAllSet", FieldOperator::BitsAllSet),
        ("$bitsAllClear", FieldOperator::BitsAllClear),
        ("$bitsAnySet", FieldOperator::BitsAnySet),
        ("$bitsAnyClear", FieldOperator::BitsAnyClear),
    ];

    /// Looks up a field operator by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidExpressionOperator`] carrying `name` when it is not a
    /// known field operator.
    pub fn lookup(name: &str) -> QueryResult<Self> {
        Self::TABLE
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, op)| *op)
            .ok_or_else(|| QueryError::InvalidExpressionOperator(name.to_string()))
    }

    /// Returns the operator's name, including the leading `$`.
    pub fn as_str(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("$unknown")
    }
}

impl fmt::Display for FieldOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators that combine whole expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionOperator {
    And,
    Or,
    Nor,
    /// Annotation; ignored during evaluation.
    Comment,
}

impl ExpressionOperator {
    /// Looks up an expression operator by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidExpressionOperator`] carrying `name` when it is not a
    /// known expression operator.
    pub fn lookup(name: &str) -> QueryResult<Self> {
        match name {
            "$and" => Ok(ExpressionOperator::And),
            "$or" => Ok(ExpressionOperator::Or),
            "$nor" => Ok(ExpressionOperator::Nor),
            "$comment" => Ok(ExpressionOperator::Comment),
            _ => Err(QueryError::InvalidExpressionOperator(name.to_string())),
        }
    }

    /// Returns the operator's name, including the leading `$`.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionOperator::And => "$and",
            ExpressionOperator::Or => "$or",
            ExpressionOperator::Nor => "$nor",
            ExpressionOperator::Comment => "$comment",
        }
    }
}

impl fmt::Display for ExpressionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` if `key` names an operator rather than a field.
pub fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}
