//! In-memory reference collection.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::traits::{CatalogError, CatalogRecord, ReferenceCollection};

/// A reference collection backed by a lock-protected ordered map.
pub struct InMemoryCollection<T> {
    records: RwLock<BTreeMap<String, T>>,
}

impl<T: CatalogRecord> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a collection from records that already carry their ids.
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id().to_string(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn require_name(record: &T) -> Result<(), CatalogError> {
        if record.name().trim().is_empty() {
            return Err(CatalogError::Invalid {
                kind: T::KIND,
                reason: "name is required".into(),
            });
        }
        Ok(())
    }
}

impl<T: CatalogRecord> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_id(kind: &str) -> String {
    format!("{kind}_{}", uuid::Uuid::new_v4().simple())
}

impl<T: CatalogRecord> ReferenceCollection<T> for InMemoryCollection<T> {
    fn get_by_id(&self, id: &str) -> Option<T> {
        self.records.read().get(id).cloned()
    }

    fn get_all(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }

    fn create(&self, mut record: T) -> Result<T, CatalogError> {
        Self::require_name(&record)?;
        record.set_id(generate_id(T::KIND));

        let mut records = self.records.write();
        records.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    fn update(&self, id: &str, mut record: T) -> Result<(), CatalogError> {
        let mut records = self.records.write();
        if !records.contains_key(id) {
            return Err(CatalogError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        Self::require_name(&record)?;

        record.set_id(id.to_string());
        records.insert(id.to_string(), record);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), CatalogError> {
        match self.records.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(CatalogError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            }),
        }
    }

    fn search(&self, query: &str) -> Vec<T> {
        let query = query.trim().to_lowercase();
        let records = self.records.read();
        if query.is_empty() {
            return records.values().cloned().collect();
        }

        records
            .values()
            .filter(|record| {
                record
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
