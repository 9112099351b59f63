//! Reference collection traits: keyed stores of configuration records.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors raised by reference collection mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid {kind} data: {reason}")]
    Invalid { kind: &'static str, reason: String },
}

/// A record that can live in a [`ReferenceCollection`].
pub trait CatalogRecord:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Short kind label, also used as the generated id prefix.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn name(&self) -> &str;
    /// Fields matched by [`ReferenceCollection::search`].
    fn search_fields(&self) -> [&str; 3];
}

/// Keyed store of configuration records, queried by identifier.
///
/// Session joins only ever call [`get_by_id`](Self::get_by_id); the
/// remaining operations back the catalog CLI and the HTTP catalog routes.
pub trait ReferenceCollection<T: CatalogRecord>: Send + Sync {
    /// Look up a record by id.
    fn get_by_id(&self, id: &str) -> Option<T>;

    /// All records, ordered by id.
    fn get_all(&self) -> Vec<T>;

    /// Insert a new record under a freshly generated id. Requires a name.
    fn create(&self, record: T) -> Result<T, CatalogError>;

    /// Replace an existing record, preserving its id. Requires a name.
    fn update(&self, id: &str, record: T) -> Result<(), CatalogError>;

    /// Remove a record.
    fn delete(&self, id: &str) -> Result<(), CatalogError>;

    /// Case-insensitive substring search. An empty query returns everything.
    fn search(&self, query: &str) -> Vec<T>;

    /// The name of this collection implementation.
    fn name(&self) -> &str;
}
