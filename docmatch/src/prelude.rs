//! Convenient re-exports of commonly used types from docmatch.
//!
//! ```ignore
//! use docmatch::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document traits
//! - Query parsing, building and visiting
//! - Matchers and options
//! - Error types

pub use docmatch_core::{
    document::{Document, DocumentExt, DocumentLike},
    query::{Query, QueryVisitor, Expr, Condition, Sort, SortDirection, QueryBuilder, Filter, Field},
    options::QueryOptions,
    error::{QueryError, QueryResult},
};
pub use docmatch_memory::{Matcher, MatcherBuilder, LoadedSet, evaluate};
