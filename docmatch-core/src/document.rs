//! Core traits for document representation and serialization.
//!
//! Two views of a document exist in this crate:
//!
//! - [`DocumentLike`] is the narrow capability the matcher reads through: look up a
//!   top-level key and learn whether it exists. It is implemented for BSON documents.
//! - [`Document`] is implemented by typed application entities. [`DocumentExt`] converts
//!   them to and from BSON and JSON so they can be matched and held in memory.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::QueryResult;


/// Read-only key lookup over a mapping-shaped document.
///
/// `None` means the key is absent. `Some(&Bson::Null)` means the key exists and holds
/// an explicit null; the matcher keeps those two cases apart.
///
/// Implementations must not mutate the document; the matcher may call `get_field`
/// from several threads at once when the implementor is `Sync`.
pub trait DocumentLike {
    /// Returns the value stored under `key`, if present.
    fn get_field(&self, key: &str) -> Option<&Bson>;
}

impl DocumentLike for bson::Document {
    fn get_field(&self, key: &str) -> Option<&Bson> {
        self.get(key)
    }
}

/// Non-document values have no fields.
impl DocumentLike for Bson {
    fn get_field(&self, key: &str) -> Option<&Bson> {
        match self {
            Bson::Document(doc) => doc.get(key),
            _ => None,
        }
    }
}

impl<T: DocumentLike + ?Sized> DocumentLike for &T {
    fn get_field(&self, key: &str) -> Option<&Bson> {
        (**self).get_field(key)
    }
}

/// Core trait implemented by typed entities.
///
/// Every entity has a unique identifier and names the collection it belongs to.
///
/// # Example
///
/// ```ignore
/// use docmatch::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for User {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Serialization`](crate::error::QueryError::Serialization)
    /// if serialization fails.
    fn to_bson(&self) -> QueryResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> QueryResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> QueryResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> QueryResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> QueryResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> QueryResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> QueryResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> QueryResult<Self> {
        Ok(from_value(value)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Book {
        id: Uuid,
        title: String,
        pages: Option<i32>,
    }

    impl Document for Book {
        fn id(&self) -> &Uuid {
            &self.id
        }

        fn collection_name() -> &'static str {
            "books"
        }
    }

    #[test]
    fn absent_and_null_are_distinct() {
        let doc = doc! { "title": "Dune", "pages": null };

        assert!(doc.get_field("missing").is_none());
        assert_eq!(doc.get_field("pages"), Some(&Bson::Null));
    }

    #[test]
    fn scalars_have_no_fields() {
        assert!(Bson::Int32(1).get_field("a").is_none());
        assert_eq!(
            Bson::Document(doc! { "a": 1 }).get_field("a"),
            Some(&Bson::Int32(1))
        );
    }

    #[test]
    fn entities_convert_through_bson() {
        let book = Book { id: Uuid::new(), title: "Dune".to_string(), pages: None };

        let bson = book.to_bson().unwrap();
        assert_eq!(bson.get_field("title"), Some(&Bson::String("Dune".to_string())));
        assert_eq!(bson.get_field("pages"), Some(&Bson::Null));
        assert_eq!(Book::from_bson(bson).unwrap(), book);
    }
}
