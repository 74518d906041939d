//! Dotted field path resolution.
//!
//! A path such as `"address.city"` is split once into segments by [`FieldPath::parse`]
//! and resolved against a document with [`resolve`]. Resolution fans out over arrays:
//! when a hop lands on an array, the remaining segments are applied to every element
//! and the results are flattened into a single [`Resolved`] set.

use bson::Bson;

use crate::{
    document::DocumentLike,
    error::{QueryError, QueryResult},
    options::QueryOptions,
};


/// A pre-split dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Splits `path` on `.`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] for an empty path or an empty segment
    /// (`"a..b"`, `".a"`).
    pub fn parse(path: &str, options: &QueryOptions) -> QueryResult<Self> {
        let segments = path
            .split('.')
            .map(str::to_string)
            .collect::<Vec<_>>();

        if segments.iter().any(String::is_empty) {
            return Err(QueryError::invalid_query(
                path,
                "field paths must not contain empty segments",
                &Bson::String(path.to_string()),
                options.expr_render_limit,
            ));
        }

        Ok(Self { raw: path.to_string(), segments })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The values reachable at a path.
///
/// Each branch is either `Some(value)` (the path existed on that branch, possibly with
/// an explicit null) or `None` (a key was absent, or a hop landed on a scalar). The set
/// is empty when the path passed through an empty array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved<'a> {
    branches: Vec<Option<&'a Bson>>,
}

impl<'a> Resolved<'a> {
    /// A set holding exactly one branch.
    pub fn single(value: Option<&'a Bson>) -> Self {
        Self { branches: vec![value] }
    }

    /// Every branch, in document order.
    pub fn branches(&self) -> &[Option<&'a Bson>] {
        &self.branches
    }

    /// The values of the branches that existed.
    pub fn values(&self) -> impl Iterator<Item = &'a Bson> + '_ {
        self.branches.iter().filter_map(|branch| *branch)
    }

    /// Returns `true` if any branch existed.
    pub fn exists(&self) -> bool {
        self.branches.iter().any(Option::is_some)
    }

    /// Returns `true` if any branch was missing.
    pub fn has_missing(&self) -> bool {
        self.branches.iter().any(Option::is_none)
    }

    /// Returns `true` if there are no branches at all.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Resolves `path` against `document`.
pub fn resolve<'a, D>(document: &'a D, path: &FieldPath) -> Resolved<'a>
where
    D: DocumentLike + ?Sized,
{
    let (first, rest) = match path.segments.split_first() {
        Some(split) => split,
        None => return Resolved::default(),
    };

    let mut current = vec![document.get_field(first)];

    for segment in rest {
        let mut next = Vec::with_capacity(current.len());

        for branch in current {
            match branch {
                None => next.push(None),
                Some(Bson::Document(doc)) => next.push(doc.get(segment)),
                Some(Bson::Array(items)) => {
                    if let Some(index) = array_index(segment) {
                        if let Some(item) = items.get(index) {
                            next.push(Some(item));
                        }
                    }

                    for item in items {
                        if let Bson::Document(doc) = item {
                            next.push(doc.get(segment));
                        }
                    }
                }
                Some(_) => next.push(None),
            }
        }

        current = next;

        if current.is_empty() {
            break;
        }
    }

    Resolved { branches: current }
}

/// Interprets a segment as a positional index; `"01"` and `"-1"` are plain keys.
fn array_index(segment: &str) -> Option<usize> {
    let canonical = segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));

    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}
