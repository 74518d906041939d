//! Tunables for query parsing.
//!
//! [`QueryOptions`] bounds the resources a single query may use and controls how
//! much of an offending expression is echoed back in errors. It derives serde traits
//! with `#[serde(default)]`, so a host application can embed it in its own
//! configuration file and omit any field it does not care about.
//!
//! ```ignore
//! use docmatch::options::QueryOptions;
//!
//! let options = QueryOptions::builder()
//!     .max_depth(32)
//!     .expr_render_limit(60)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DEFAULT_EXPR_RENDER_LIMIT;

/// Default maximum nesting depth of a query expression.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default compiled size limit for regular expressions, in bytes.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Options applied while parsing a raw query into an [`Expr`](crate::query::Expr).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Maximum number of characters of an offending expression kept in errors.
    pub expr_render_limit: usize,
    /// Maximum nesting depth of logical operators, `$elemMatch` and `$not`.
    pub max_depth: usize,
    /// Upper bound on the compiled size of each regular expression.
    pub regex_size_limit: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            expr_render_limit: DEFAULT_EXPR_RENDER_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

impl QueryOptions {
    /// Creates a builder starting from the default options.
    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder::default()
    }
}

/// Builder for [`QueryOptions`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptionsBuilder {
    options: QueryOptions,
}

impl QueryOptionsBuilder {
    /// Sets the maximum number of characters kept when rendering bad expressions.
    pub fn expr_render_limit(mut self, limit: usize) -> Self {
        self.options.expr_render_limit = limit;
        self
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    /// Sets the compiled size limit for regular expressions.
    pub fn regex_size_limit(mut self, limit: usize) -> Self {
        self.options.regex_size_limit = limit;
        self
    }

    /// Builds and returns the options.
    pub fn build(self) -> QueryOptions {
        self.options
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let options = QueryOptions::builder()
            .max_depth(4)
            .expr_render_limit(10)
            .build();

        assert_eq!(options.max_depth, 4);
        assert_eq!(options.expr_render_limit, 10);
        assert_eq!(options.regex_size_limit, DEFAULT_REGEX_SIZE_LIMIT);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let options: QueryOptions = serde_json::from_str(r#"{ "max_depth": 8 }"#).unwrap();

        assert_eq!(options.max_depth, 8);
        assert_eq!(options.expr_render_limit, DEFAULT_EXPR_RENDER_LIMIT);
    }
}
