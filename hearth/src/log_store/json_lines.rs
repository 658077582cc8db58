use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use super::{any_recent, LogEntry, LogStore, StoreError};

///
/// How far back from the newest entry the in-memory tail reaches.
///
pub const TAIL_SPAN: Duration = Duration::from_secs(60);

struct Appender {
    file: File,
    next_id: u64,
    // The newest entries, oldest first, spanning at most `TAIL_SPAN`.
    tail: VecDeque<LogEntry>,
    // Whether `tail` still holds every entry in the file.
    complete: bool,
}

impl Appender {
    fn covers(&self, since: SystemTime) -> bool {
        self.complete || self.tail.front().map_or(false, |oldest| oldest.timestamp <= since)
    }

    fn push(&mut self, entry: LogEntry) {
        while let Some(oldest) = self.tail.front() {
            if oldest.timestamp + TAIL_SPAN >= entry.timestamp {
                break;
            }
            self.tail.pop_front();
            self.complete = false;
        }
        self.tail.push_back(entry);
    }
}

///
/// An append-only file of json objects, one entry per line. Ids continue
/// from the highest one already in the file.
///
/// Recent entries are also kept in memory, so the duplicate check does not
/// read the file unless asked about something older than `TAIL_SPAN`.
///
pub struct JsonLinesLogStore {
    path: PathBuf,
    appender: Mutex<Appender>,
}

impl JsonLinesLogStore {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let entries = read_entries(&path)?;
        let next_id = entries.iter().map(|entry| entry.id).max().unwrap_or(0) + 1;
        debug!("Opened log store {} at id {}", path.display(), next_id);

        let mut appender = Appender {
            file,
            next_id,
            tail: VecDeque::new(),
            complete: true,
        };
        for entry in entries {
            appender.push(entry);
        }

        Ok(JsonLinesLogStore {
            path,
            appender: Mutex::new(appender),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_entries<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(Vec<LogEntry>) -> T,
    {
        // Holding the lock keeps readers from seeing a half written line.
        let _appender = self.appender.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(f(read_entries(&self.path)?))
    }
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>, StoreError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }

    Ok(entries)
}

impl LogStore for JsonLinesLogStore {
    fn has_recent(&self, ip_address: &str, uri: &str, since: SystemTime) -> Result<bool, StoreError> {
        let appender = self.appender.lock().map_err(|_| StoreError::Poisoned)?;

        if appender.covers(since) {
            return Ok(any_recent(appender.tail.iter().rev(), ip_address, uri, since));
        }

        trace!("Checking {} back past the in-memory tail", self.path.display());
        let entries = read_entries(&self.path)?;
        Ok(any_recent(entries.iter().rev(), ip_address, uri, since))
    }

    fn append(&self, mut entry: LogEntry) -> Result<u64, StoreError> {
        let mut appender = self.appender.lock().map_err(|_| StoreError::Poisoned)?;

        entry.id = appender.next_id;
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        appender.file.write_all(&line)?;
        appender.file.flush()?;
        appender.next_id += 1;
        appender.push(entry.clone());

        Ok(entry.id)
    }

    fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.with_entries(|entries| entries)
    }

    fn entry(&self, id: u64) -> Result<Option<LogEntry>, StoreError> {
        self.with_entries(|entries| entries.into_iter().find(|entry| entry.id == id))
    }
}
