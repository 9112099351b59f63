//! Reference collections: scenarios, avatars and observer profiles.
//!
//! Each collection is an independent keyed store. Sessions reference records
//! by id and re-query the collections on every join; nothing here is ever
//! cached inside a session.

pub mod in_memory;
pub mod records;
pub mod seed;
pub mod traits;

pub use in_memory::InMemoryCollection;
pub use records::{Avatar, Observer, Scenario};
pub use traits::{CatalogError, CatalogRecord, ReferenceCollection};

use std::sync::Arc;

/// The three reference collections a session join reads from.
#[derive(Clone)]
pub struct Catalog {
    pub scenarios: Arc<dyn ReferenceCollection<Scenario>>,
    pub avatars: Arc<dyn ReferenceCollection<Avatar>>,
    pub observers: Arc<dyn ReferenceCollection<Observer>>,
}

impl Catalog {
    pub fn new(
        scenarios: Arc<dyn ReferenceCollection<Scenario>>,
        avatars: Arc<dyn ReferenceCollection<Avatar>>,
        observers: Arc<dyn ReferenceCollection<Observer>>,
    ) -> Self {
        Self {
            scenarios,
            avatars,
            observers,
        }
    }

    /// Empty in-memory collections.
    pub fn empty() -> Self {
        Self::new(
            Arc::new(InMemoryCollection::<Scenario>::new()),
            Arc::new(InMemoryCollection::<Avatar>::new()),
            Arc::new(InMemoryCollection::<Observer>::new()),
        )
    }
}

/// Factory: in-memory collections seeded with the sample records.
pub fn create_catalog() -> Catalog {
    Catalog::new(
        Arc::new(InMemoryCollection::with_records(seed::sample_scenarios())),
        Arc::new(InMemoryCollection::with_records(seed::sample_avatars())),
        Arc::new(InMemoryCollection::with_records(seed::sample_observers())),
    )
}

/// Catalog kind selector used by the CLI and the HTTP listing routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CatalogKind {
    Scenarios,
    Avatars,
    Observers,
}

impl CatalogKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scenarios => "scenarios",
            Self::Avatars => "avatars",
            Self::Observers => "observers",
        }
    }

    /// Singular record label, matching [`CatalogRecord::KIND`].
    pub const fn record_label(self) -> &'static str {
        match self {
            Self::Scenarios => Scenario::KIND,
            Self::Avatars => Avatar::KIND,
            Self::Observers => Observer::KIND,
        }
    }
}

impl Catalog {
    /// Search one collection and return the hits as JSON values.
    pub fn search_json(&self, kind: CatalogKind, query: &str) -> Vec<serde_json::Value> {
        match kind {
            CatalogKind::Scenarios => to_json(self.scenarios.search(query)),
            CatalogKind::Avatars => to_json(self.avatars.search(query)),
            CatalogKind::Observers => to_json(self.observers.search(query)),
        }
    }

    /// Look up one record by id as a JSON value.
    pub fn get_json(&self, kind: CatalogKind, id: &str) -> Option<serde_json::Value> {
        match kind {
            CatalogKind::Scenarios => self.scenarios.get_by_id(id).and_then(one_to_json),
            CatalogKind::Avatars => self.avatars.get_by_id(id).and_then(one_to_json),
            CatalogKind::Observers => self.observers.get_by_id(id).and_then(one_to_json),
        }
    }

    /// Decode `body` as a record of `kind` and insert it under a new id.
    pub fn create_json(
        &self,
        kind: CatalogKind,
        body: &str,
    ) -> Result<serde_json::Value, CatalogError> {
        match kind {
            CatalogKind::Scenarios => create_in(self.scenarios.as_ref(), body),
            CatalogKind::Avatars => create_in(self.avatars.as_ref(), body),
            CatalogKind::Observers => create_in(self.observers.as_ref(), body),
        }
    }

    /// Replace record `id` of `kind` with `body`, keeping the id.
    pub fn update_json(
        &self,
        kind: CatalogKind,
        id: &str,
        body: &str,
    ) -> Result<serde_json::Value, CatalogError> {
        match kind {
            CatalogKind::Scenarios => update_in(self.scenarios.as_ref(), id, body),
            CatalogKind::Avatars => update_in(self.avatars.as_ref(), id, body),
            CatalogKind::Observers => update_in(self.observers.as_ref(), id, body),
        }
    }

    pub fn delete(&self, kind: CatalogKind, id: &str) -> Result<(), CatalogError> {
        match kind {
            CatalogKind::Scenarios => self.scenarios.delete(id),
            CatalogKind::Avatars => self.avatars.delete(id),
            CatalogKind::Observers => self.observers.delete(id),
        }
    }
}

fn decode<T: CatalogRecord>(body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|e| CatalogError::Invalid {
        kind: T::KIND,
        reason: e.to_string(),
    })
}

fn encode<T: CatalogRecord>(record: T) -> Result<serde_json::Value, CatalogError> {
    serde_json::to_value(record).map_err(|e| CatalogError::Invalid {
        kind: T::KIND,
        reason: e.to_string(),
    })
}

fn create_in<T: CatalogRecord>(
    collection: &dyn ReferenceCollection<T>,
    body: &str,
) -> Result<serde_json::Value, CatalogError> {
    encode(collection.create(decode(body)?)?)
}

fn update_in<T: CatalogRecord>(
    collection: &dyn ReferenceCollection<T>,
    id: &str,
    body: &str,
) -> Result<serde_json::Value, CatalogError> {
    collection.update(id, decode(body)?)?;
    match collection.get_by_id(id) {
        Some(record) => encode(record),
        None => Err(CatalogError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }),
    }
}

fn to_json<T: CatalogRecord>(records: Vec<T>) -> Vec<serde_json::Value> {
    records.into_iter().filter_map(one_to_json).collect()
}

fn one_to_json<T: CatalogRecord>(record: T) -> Option<serde_json::Value> {
    serde_json::to_value(record).ok()
}
