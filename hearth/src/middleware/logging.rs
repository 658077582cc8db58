use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::core::context::RequestContext;
use crate::core::middleware::{Flow, Middleware};
use crate::log_store::{LogEntry, LogStore, StoreError};
use crate::middleware::request_params::client_ip;

///
/// A request from the same address to the same uri within this window of a
/// logged one is not logged again.
///
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(10);

///
/// Requests under these prefixes are never logged: the log pages themselves,
/// and stylesheets.
///
pub const SKIPPED_PREFIXES: [&str; 2] = ["/admin/log", "/css/"];

///
/// How many entries may wait for the writer. Entries arriving while the queue
/// is full are dropped.
///
pub const QUEUE_CAPACITY: usize = 1024;

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

///
/// Records every request in a `LogStore`.
///
/// The middleware itself only builds the entry and queues it; persisting,
/// including the duplicate check, happens on a `LogWriter` task, so the
/// request carries on without waiting for the store.
///
pub struct RequestLogger {
    queue: mpsc::Sender<LogEntry>,
    clock: Arc<dyn Clock>,
}

///
/// The background half of a `RequestLogger`. It runs until every logger
/// sharing its queue has been dropped, draining what is left first.
///
pub struct LogWriter {
    queue: mpsc::Receiver<LogEntry>,
    store: Arc<dyn LogStore>,
}

impl RequestLogger {
    pub fn new(store: Arc<dyn LogStore>) -> (RequestLogger, LogWriter) {
        RequestLogger::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LogStore>, clock: Arc<dyn Clock>) -> (RequestLogger, LogWriter) {
        RequestLogger::with_queue(store, clock, QUEUE_CAPACITY)
    }

    pub fn with_queue(
        store: Arc<dyn LogStore>,
        clock: Arc<dyn Clock>,
        capacity: usize,
    ) -> (RequestLogger, LogWriter) {
        let (sender, receiver) = mpsc::channel(capacity);

        (
            RequestLogger {
                queue: sender,
                clock,
            },
            LogWriter {
                queue: receiver,
                store,
            },
        )
    }

    ///
    /// Create a logger and start its writer on the current runtime.
    ///
    pub fn spawn(store: Arc<dyn LogStore>, clock: Arc<dyn Clock>) -> (RequestLogger, JoinHandle<()>) {
        let (logger, writer) = RequestLogger::with_clock(store, clock);

        (logger, tokio::spawn(writer.run()))
    }

    fn entry(&self, context: &RequestContext, uri: String) -> LogEntry {
        // Params set by `RequestParams` win, then the raw request headers.
        let param = |key: &str, header: &str, default: &str| {
            context
                .get(key)
                .or_else(|| context.request.header(header))
                .unwrap_or(default)
                .to_owned()
        };

        LogEntry {
            id: 0,
            timestamp: self.clock.now(),
            ip_address: context
                .get("client-ip")
                .map(str::to_owned)
                .unwrap_or_else(|| client_ip(&context.request)),
            user_agent: param("user-agent", "user-agent", "Unknown User Agent"),
            referrer: param("referrer", "referer", "Unknown Referrer"),
            method: context
                .get("method")
                .map(str::to_owned)
                .unwrap_or_else(|| context.request.method().to_string()),
            uri,
            headers: context.request.headers().clone(),
        }
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, context: RequestContext) -> Flow {
        let uri = context.get("uri").unwrap_or_else(|| context.route()).to_owned();

        if SKIPPED_PREFIXES.iter().any(|prefix| uri.starts_with(prefix)) {
            trace!("Not logging {}", uri);
            return Flow::Continue(context);
        }

        let entry = self.entry(&context, uri);
        debug!("Queueing log entry for {} ({})", entry.uri, entry.user_agent);

        match self.queue.try_send(entry) {
            Ok(()) => (),
            Err(TrySendError::Full(entry)) => {
                error!("Log queue is full, dropping entry for {}", entry.uri)
            }
            Err(TrySendError::Closed(entry)) => {
                error!("Log writer has stopped, dropping entry for {}", entry.uri)
            }
        }

        Flow::Continue(context)
    }
}

impl LogWriter {
    pub async fn run(mut self) {
        while let Some(entry) = self.queue.recv().await {
            let store = Arc::clone(&self.store);
            let uri = entry.uri.clone();

            match tokio::task::spawn_blocking(move || persist(store.as_ref(), entry)).await {
                Ok(Ok(Some(id))) => debug!("Logged {} as entry {}", uri, id),
                Ok(Ok(None)) => debug!("Skipped logging {}, seen within the last {:?}", uri, DUPLICATE_WINDOW),
                Ok(Err(e)) => error!("Failed to log {}: {}", uri, e),
                Err(e) => error!("Log writer task failed for {}: {}", uri, e),
            }
        }

        debug!("Log writer finished");
    }
}

fn persist(store: &dyn LogStore, entry: LogEntry) -> Result<Option<u64>, StoreError> {
    let since = entry
        .timestamp
        .checked_sub(DUPLICATE_WINDOW)
        .unwrap_or(UNIX_EPOCH);

    if store.has_recent(&entry.ip_address, &entry.uri, since)? {
        return Ok(None);
    }

    store.append(entry).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::{Method, Request, RequestHead};
    use crate::log_store::MemoryLogStore;
    use crate::static_files::StaticFiles;
    use std::sync::Mutex;

    struct ManualClock(Mutex<SystemTime>);

    impl ManualClock {
        fn new() -> Self {
            ManualClock(Mutex::new(UNIX_EPOCH + Duration::from_secs(1_600_000_000)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.0.lock().unwrap()
        }
    }

    fn request(path: &str, ip: &str) -> Request {
        let head = RequestHead::new(Method::GET, path).header("User-Agent", "curl/7.68.0");
        Request::new(head, None, Some(format!("{}:50000", ip).parse().unwrap()))
    }

    fn context(path: &str, ip: &str) -> RequestContext {
        RequestContext::new(request(path, ip), Arc::new(StaticFiles::new("/nonexistent")), false)
    }

    async fn log(logger: &RequestLogger, path: &str, ip: &str) {
        assert!(matches!(logger.handle(context(path, ip)).await, Flow::Continue(_)));
    }

    #[tokio::test]
    async fn it_should_not_log_repeats_within_ten_seconds() {
        let store = Arc::new(MemoryLogStore::new());
        let clock = Arc::new(ManualClock::new());
        let (logger, writer) = RequestLogger::spawn(store.clone(), clock.clone());

        log(&logger, "/about", "10.0.0.1").await;
        clock.advance(Duration::from_secs(5));
        log(&logger, "/about", "10.0.0.1").await;
        clock.advance(Duration::from_secs(6));
        log(&logger, "/about", "10.0.0.1").await;

        drop(logger);
        writer.await.unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1].timestamp.duration_since(entries[0].timestamp).unwrap(),
            Duration::from_secs(11)
        );
        assert_eq!(entries[0].user_agent, "curl/7.68.0");
        assert_eq!(entries[0].referrer, "Unknown Referrer");
    }

    #[tokio::test]
    async fn it_should_log_other_clients_and_paths() {
        let store = Arc::new(MemoryLogStore::new());
        let (logger, writer) = RequestLogger::spawn(store.clone(), Arc::new(ManualClock::new()));

        log(&logger, "/about", "10.0.0.1").await;
        log(&logger, "/about", "10.0.0.2").await;
        log(&logger, "/contact", "10.0.0.1").await;

        drop(logger);
        writer.await.unwrap();

        assert_eq!(store.entries().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn it_should_prefer_params_over_request_headers() {
        let store = Arc::new(MemoryLogStore::new());
        let (logger, writer) = RequestLogger::spawn(store.clone(), Arc::new(ManualClock::new()));

        let mut context = context("/about", "10.0.0.1");
        context.set("user-agent", "Param Agent");
        logger.handle(context).await;

        let head = RequestHead::new(Method::GET, "/contact").header("Referer", "https://example.com/");
        let request = Request::new(head, None, Some("10.0.0.1:50000".parse().unwrap()));
        logger
            .handle(RequestContext::new(request, Arc::new(StaticFiles::new("/nonexistent")), false))
            .await;

        drop(logger);
        writer.await.unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries[0].user_agent, "Param Agent");
        assert_eq!(entries[1].user_agent, "Unknown User Agent");
        assert_eq!(entries[1].referrer, "https://example.com/");
    }

    #[tokio::test]
    async fn it_should_drop_entries_when_the_queue_is_full() {
        let store = Arc::new(MemoryLogStore::new());
        let (logger, writer) = RequestLogger::with_queue(store.clone(), Arc::new(ManualClock::new()), 1);

        // The writer is not running yet, so only the first entry fits.
        log(&logger, "/about", "10.0.0.1").await;
        log(&logger, "/contact", "10.0.0.1").await;
        log(&logger, "/projects", "10.0.0.1").await;

        drop(logger);
        writer.run().await;

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri, "/about");
    }

    #[tokio::test]
    async fn it_should_skip_log_pages_and_stylesheets() {
        let store = Arc::new(MemoryLogStore::new());
        let (logger, writer) = RequestLogger::spawn(store.clone(), Arc::new(ManualClock::new()));

        log(&logger, "/admin/log", "10.0.0.1").await;
        log(&logger, "/admin/log/3", "10.0.0.1").await;
        log(&logger, "/css/site.css", "10.0.0.1").await;

        drop(logger);
        writer.await.unwrap();

        assert!(store.entries().unwrap().is_empty());
    }
}
