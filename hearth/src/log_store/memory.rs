use std::sync::RwLock;
use std::time::SystemTime;

use super::{any_recent, LogEntry, LogStore, StoreError};

///
/// A store that forgets everything on restart.
///
#[derive(Default)]
pub struct MemoryLogStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        MemoryLogStore::default()
    }
}

impl LogStore for MemoryLogStore {
    fn has_recent(&self, ip_address: &str, uri: &str, since: SystemTime) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;

        Ok(any_recent(entries.iter().rev(), ip_address, uri, since))
    }

    fn append(&self, mut entry: LogEntry) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;

        entry.id = entries.len() as u64 + 1;
        let id = entry.id;
        entries.push(entry);

        Ok(id)
    }

    fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;

        Ok(entries.clone())
    }

    fn entry(&self, id: u64) -> Result<Option<LogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;

        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }
}
