//! Core types for matching documents against MongoDB-style queries in memory.
//!
//! This crate is the core of the docmatch project and provides:
//!
//! - **Document traits** ([`document`]) - The lookup capability the matcher reads through, and typed entity traits
//! - **Value coercion** ([`value`]) - Numeric widening, bracket ordering, regexes and `$type` selectors
//! - **Field paths** ([`path`]) - Dotted path parsing and resolution with array fan-out
//! - **Operator registry** ([`registry`]) - The closed set of field and expression operators
//! - **Query expressions** ([`query`]) - The parsed query tree, its visitor, and query builders
//! - **Options** ([`options`]) - Limits applied while parsing
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! Evaluation itself lives in `docmatch-memory`.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docmatch_core::query::Expr;
//!
//! let expr = Expr::parse(&doc! { "age": { "$gte": 18 }, "tags": "admin" })?;
//! assert_eq!(expr.field_paths(), vec!["age", "tags"]);
//! ```

pub mod document;
pub mod error;
pub mod options;
mod parser;
pub mod path;
pub mod query;
pub mod registry;
pub mod value;
