use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::time::SystemTime;
use thiserror::Error;

mod json_lines;
mod memory;

pub use self::json_lines::JsonLinesLogStore;
pub use self::memory::MemoryLogStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unable to access the log store: {0}")]
    Io(#[from] io::Error),
    #[error("Log store holds an unreadable entry: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Log store lock was poisoned")]
    Poisoned,
}

///
/// One logged request.
///
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Assigned by the store on append, zero until then.
    pub id: u64,
    pub timestamp: SystemTime,
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub method: String,
    pub uri: String,
    pub headers: HashMap<String, String>,
}

///
/// Somewhere request logs are kept. Calls block, so async callers should run
/// them with `tokio::task::spawn_blocking`. Implementations serialize their
/// own writes, and may be called from many tasks at once.
///
pub trait LogStore: Send + Sync {
    /// Whether an entry for this ip and uri was logged after `since`.
    fn has_recent(&self, ip_address: &str, uri: &str, since: SystemTime) -> Result<bool, StoreError>;

    /// Store the entry and return the id it was given.
    fn append(&self, entry: LogEntry) -> Result<u64, StoreError>;

    /// Every entry, oldest first.
    fn entries(&self) -> Result<Vec<LogEntry>, StoreError>;

    fn entry(&self, id: u64) -> Result<Option<LogEntry>, StoreError>;
}

///
/// Look for a match among entries newer than `since`, newest first. Entries
/// are appended in time order, so the scan stops at the first one at or
/// before `since`.
///
fn any_recent<'a, I>(newest_first: I, ip_address: &str, uri: &str, since: SystemTime) -> bool
where
    I: Iterator<Item = &'a LogEntry>,
{
    newest_first
        .take_while(|entry| entry.timestamp > since)
        .any(|entry| entry.ip_address == ip_address && entry.uri == uri)
}
