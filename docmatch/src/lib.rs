//! Main docmatch crate: MongoDB-style queries evaluated against documents in memory.
//!
//! This crate is the primary entry point for users of docmatch. It re-exports the
//! core query types from `docmatch-core` and the evaluator from `docmatch-memory`.
//!
//! # Features
//!
//! - **Server-compatible semantics** - Type brackets, array fan-out, null/missing equivalence and dot notation
//! - **Parse once** - Queries are validated up front; evaluation never fails
//! - **Typed entities** - Match serde structs through their BSON form
//! - **Composable builders** - [`Filter`](query::Filter) and [`Field`](query::Field) build raw queries
//!
//! # Quick Start
//!
//! ```ignore
//! use docmatch::prelude::*;
//! use bson::{Uuid, doc};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub name: String,
//!     pub roles: Vec<String>,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! let admins = Matcher::new(&doc! { "roles": "admin" })?;
//!
//! let user = User {
//!     id: Uuid::new(),
//!     name: "Alice".to_string(),
//!     roles: vec!["admin".to_string()],
//! };
//!
//! assert!(admins.matches_entity(&user)?);
//! ```
//!
//! # Loaded documents
//!
//! ```ignore
//! use docmatch::{prelude::*, memory::LoadedSet};
//!
//! let set = LoadedSet::new();
//! set.load_entity(&user).await?;
//!
//! let users = set
//!     .select_typed::<User>(
//!         &Query::builder()
//!             .filter(Filter::eq("name", "Alice").parse()?)
//!             .build(),
//!     )
//!     .await?;
//! ```

pub mod prelude;

pub use docmatch_core::{document, error, options, path, query, registry, value};
pub use docmatch_memory::{Matcher, MatcherBuilder, evaluate};

// Re-export BSON types for convenience
pub use bson;

/// In-memory evaluation and document sets.
pub mod memory {
    pub use docmatch_memory::{DocumentEvaluator, LoadedSet, logical, operators};
}
