use crate::entry::Entry;
use crate::store::{EntryFields, EntryStore, StoreResult};

/// Thin dispatcher so key handlers stay declarative and store calls sit in
/// one place.
pub struct EntryActions<'a> {
    store: &'a EntryStore,
}

impl<'a> EntryActions<'a> {
    pub fn new(store: &'a EntryStore) -> Self {
        Self { store }
    }

    pub fn create(&self, fields: &EntryFields) -> StoreResult<Entry> {
        self.store.create_entry(fields)
    }

    pub fn update(&self, id: &str, fields: &EntryFields) -> StoreResult<Entry> {
        self.store.update_entry(id, fields)
    }

    pub fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete_entry(id)
    }
}
