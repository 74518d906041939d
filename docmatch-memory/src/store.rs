//! The set of documents already loaded into memory.
//!
//! [`LoadedSet`] holds BSON documents keyed by their identifier and answers
//! [`Query`] selections against them without touching any storage backend. Documents
//! are kept behind an async-aware read-write lock so the set can be shared between
//! tasks; matching itself never awaits.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use bson::{Bson, Document as BsonDocument, Uuid};
use mea::rwlock::RwLock;
use tracing::debug;

use docmatch_core::{
    document::{Document, DocumentExt},
    error::{QueryError, QueryResult},
    options::QueryOptions,
    path::{FieldPath, resolve},
    query::{Expr, Query, SortDirection},
    value::{ValueKind, compare_values},
};

use crate::evaluator::DocumentEvaluator;

type DocumentMap = HashMap<Uuid, BsonDocument>;


/// Thread-safe set of in-memory documents.
///
/// `LoadedSet` is cloneable and uses an `Arc`-wrapped internal state; clones share the
/// same documents. Selections scan every document (no indexing).
///
/// Without a sort, selection order is unspecified.
///
/// # Example
///
/// ```ignore
/// use docmatch_memory::LoadedSet;
/// use docmatch::query::{Filter, Query, SortDirection};
/// use bson::{Uuid, doc};
///
/// let set = LoadedSet::new();
/// set.load(Uuid::new(), doc! { "name": "Alice", "age": 30 }).await;
///
/// let query = Query::builder()
///     .filter(Filter::gte("age", 18).parse()?)
///     .sort("age", SortDirection::Asc)
///     .build();
///
/// let adults = set.select(&query).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct LoadedSet {
    documents: Arc<RwLock<DocumentMap>>,
    options: QueryOptions,
}

impl LoadedSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::with_options(QueryOptions::default())
    }

    /// Creates an empty set that parses sort paths with `options`.
    pub fn with_options(options: QueryOptions) -> Self {
        Self {
            documents: Arc::new(RwLock::new(DocumentMap::new())),
            options,
        }
    }

    /// Loads `document` under `id`, returning the document it replaced.
    pub async fn load(&self, id: Uuid, document: BsonDocument) -> Option<BsonDocument> {
        self.documents.write().await.insert(id, document)
    }

    /// Loads a typed entity under its own identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] if the entity does not serialize to a
    /// document.
    pub async fn load_entity<D: Document>(&self, entity: &D) -> QueryResult<Option<BsonDocument>> {
        match entity.to_bson()? {
            Bson::Document(document) => Ok(self.load(*entity.id(), document).await),
            other => Err(QueryError::Serialization(format!(
                "{} entity serialized to {:?}, expected a document",
                D::collection_name(),
                ValueKind::of(&other),
            ))),
        }
    }

    /// Removes and returns the document loaded under `id`.
    pub async fn unload(&self, id: &Uuid) -> Option<BsonDocument> {
        self.documents.write().await.remove(id)
    }

    /// Returns a copy of the document loaded under `id`.
    pub async fn get(&self, id: &Uuid) -> Option<BsonDocument> {
        self.documents.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: &Expr) -> usize {
        let documents = self.documents.read().await;

        documents
            .values()
            .filter(|doc| DocumentEvaluator::new(*doc).evaluate(filter))
            .count()
    }

    /// Selects documents: filter, then sort, then offset and limit.
    ///
    /// The sort key of a document is the first value found at the sort path. For an
    /// array field that is the array itself, ordered against other arrays element by
    /// element; it is not the smallest (ascending) or largest (descending) element.
    /// Documents without a value at the path sort first.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] if the sort field is not a valid path.
    pub async fn select(&self, query: &Query) -> QueryResult<Vec<BsonDocument>> {
        let sort = match &query.sort {
            Some(sort) => Some((FieldPath::parse(&sort.field, &self.options)?, sort.direction)),
            None => None,
        };

        let documents = self.documents.read().await;

        let mut selected = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(documents.values(), filter),
            None => documents.values().collect::<Vec<_>>(),
        };

        if let Some((path, direction)) = &sort {
            selected.sort_by(|a, b| {
                let ordering = compare_sort_keys(sort_key(*a, path), sort_key(*b, path));

                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let selected = selected
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect::<Vec<_>>();

        debug!(loaded = documents.len(), selected = selected.len(), "selected loaded documents");

        Ok(selected)
    }

    /// Selects the first document `query` would return.
    pub async fn first(&self, query: &Query) -> QueryResult<Option<BsonDocument>> {
        let mut query = query.clone();
        query.limit = Some(1);

        Ok(self.select(&query).await?.into_iter().next())
    }

    /// Selects documents and deserializes them into `D`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`] if a selected document does not fit `D`.
    pub async fn select_typed<D: Document>(&self, query: &Query) -> QueryResult<Vec<D>> {
        self.select(query)
            .await?
            .into_iter()
            .map(|document| D::from_bson(Bson::Document(document)))
            .collect()
    }
}

/// The first value found at `path`, if any.
fn sort_key<'a>(document: &'a BsonDocument, path: &FieldPath) -> Option<&'a Bson> {
    resolve(document, path).values().next()
}

/// Missing values first, then by bracket, then by value within a bracket.
fn compare_sort_keys(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => ValueKind::of(left)
            .cmp(&ValueKind::of(right))
            .then_with(|| compare_values(left, right).unwrap_or(Ordering::Equal)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use futures::executor::block_on;
    use docmatch_core::query::Sort;

    #[test]
    fn load_get_and_unload() {
        block_on(async {
            let set = LoadedSet::new();
            let id = Uuid::new();

            assert!(set.load(id, doc! { "a": 1 }).await.is_none());
            assert_eq!(set.load(id, doc! { "a": 2 }).await, Some(doc! { "a": 1 }));
            assert_eq!(set.get(&id).await, Some(doc! { "a": 2 }));
            assert_eq!(set.len().await, 1);

            assert_eq!(set.unload(&id).await, Some(doc! { "a": 2 }));
            assert!(set.is_empty().await);
        });
    }

    #[test]
    fn sort_keys_put_missing_first_then_brackets() {
        let one = Bson::Int32(1);
        let text = Bson::String("a".into());

        assert_eq!(compare_sort_keys(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_sort_keys(Some(&one), Some(&text)), Ordering::Less);
        assert_eq!(compare_sort_keys(Some(&Bson::Double(2.5)), Some(&one)), Ordering::Greater);
    }

    #[test]
    fn array_sort_keys_order_as_whole_arrays() {
        block_on(async {
            let set = LoadedSet::new();
            set.load(Uuid::new(), doc! { "name": "low-first", "n": [1, 9] }).await;
            set.load(Uuid::new(), doc! { "name": "mid", "n": [5] }).await;
            set.load(Uuid::new(), doc! { "name": "none" }).await;

            let query = Query { sort: Some(Sort { field: "n".into(), direction: SortDirection::Asc }), ..Query::default() };
            let names = set
                .select(&query)
                .await
                .unwrap()
                .iter()
                .map(|doc| doc.get_str("name").unwrap().to_string())
                .collect::<Vec<_>>();

            assert_eq!(names, vec!["none", "low-first", "mid"]);
        });
    }

    #[test]
    fn clones_share_documents() {
        block_on(async {
            let set = LoadedSet::new();
            let clone = set.clone();

            clone.load(Uuid::new(), doc! { "a": 1 }).await;
            assert_eq!(set.len().await, 1);
        });
    }
}
