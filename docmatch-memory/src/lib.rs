//! In-memory query evaluation for docmatch.
//!
//! This crate evaluates parsed [`Expr`](docmatch_core::query::Expr) trees against
//! documents held in memory, reproducing MongoDB's server-side matching semantics:
//! type-bracketed comparisons, array fan-out, null/missing equivalence and
//! dot-notation traversal.
//!
//! # Features
//!
//! - **One-off evaluation** - [`evaluate`] parses and matches in one call
//! - **Reusable matchers** - [`Matcher`] parses once and matches many documents
//! - **Typed entities** - [`Matcher::matches_entity`] matches any serde entity through its BSON form
//! - **Loaded documents** - [`LoadedSet`] filters, sorts and pages documents already in memory
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docmatch_memory::{Matcher, evaluate};
//!
//! let doc = doc! { "name": "Alice", "tags": ["admin", "ops"], "age": 34 };
//!
//! assert!(evaluate(&doc, &doc! { "tags": "admin", "age": { "$gte": 18 } })?);
//!
//! let matcher = Matcher::new(&doc! { "$or": [{ "age": { "$lt": 18 } }, { "tags": { "$size": 2 } }] })?;
//! assert!(matcher.matches(&doc));
//! ```

pub mod evaluator;
pub mod logical;
pub mod operators;
pub mod store;

pub use evaluator::{DocumentEvaluator, Matcher, MatcherBuilder, evaluate};
pub use store::LoadedSet;
