use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::context::RequestContext;
use crate::core::response::Response;
use crate::core::route::{Handler, Route};
use crate::core::writer::{escape_html, ResponseWriter};
use crate::log_store::{LogEntry, LogStore, StoreError};
use crate::module::Module;
use crate::modules::page;

const BREADCRUMB: &str = "<p><a href=\"/admin\">Admin Home</a> &gt; <a href=\"/admin/log\">Request log</a></p>";

struct LogTable {
    store: Arc<dyn LogStore>,
    version: String,
}

struct LogDetail {
    store: Arc<dyn LogStore>,
    version: String,
}

#[async_trait]
impl Handler for LogTable {
    async fn handle(&self, _context: RequestContext, writer: ResponseWriter) -> Response {
        let store = Arc::clone(&self.store);
        let entries = match read(move || store.entries()).await {
            Ok(entries) => entries,
            Err(message) => return writer.send_error(&message, StatusCode::INTERNAL_SERVER_ERROR),
        };

        let mut rows = String::new();
        for entry in entries.iter().rev() {
            rows.push_str(&format!(
                "<tr><td><a href=\"/admin/log/{id}\">{id}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                seconds(entry.timestamp),
                escape_html(&entry.ip_address),
                escape_html(&entry.method),
                escape_html(&entry.uri),
                id = entry.id,
            ));
        }

        let body = format!(
            "{}<h1>Request log</h1><p>{} entries</p>\n<table>\n\
             <tr><th>ID</th><th>Time</th><th>IP Address</th><th>Method</th><th>URI</th></tr>\n{}</table>",
            BREADCRUMB,
            entries.len(),
            rows
        );

        writer.send_html(page("Request log", &body, &self.version), StatusCode::OK, false)
    }
}

#[async_trait]
impl Handler for LogDetail {
    async fn handle(&self, context: RequestContext, writer: ResponseWriter) -> Response {
        let id = context.param("id").unwrap_or("").to_owned();

        let content = if id.is_empty() {
            "<p>ID Empty</p>".to_owned()
        } else {
            let store = Arc::clone(&self.store);
            let found = match id.parse::<u64>() {
                Ok(number) => read(move || store.entry(number)).await,
                Err(_) => Ok(None),
            };

            match found {
                Ok(Some(entry)) => detail(&entry),
                Ok(None) => format!("<p>ID {} not found</p>", escape_html(&id)),
                Err(message) => return writer.send_error(&message, StatusCode::INTERNAL_SERVER_ERROR),
            }
        };

        let body = format!("{}<h1>Log entry</h1>\n{}", BREADCRUMB, content);
        writer.send_html(page("Log entry", &body, &self.version), StatusCode::OK, false)
    }
}

///
/// Run a store read on the blocking pool.
///
async fn read<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("Reading the request log failed: {}", e);
            Err(e.to_string())
        }
        Err(e) => {
            error!("Request log reader failed: {}", e);
            Err(String::from("Unable to read the request log"))
        }
    }
}

fn seconds(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn detail(entry: &LogEntry) -> String {
    let mut headers: Vec<_> = entry.headers.iter().collect();
    headers.sort();

    let mut rows = String::new();
    for (name, value) in headers {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape_html(name),
            escape_html(value)
        ));
    }

    format!(
        "<p>ID: {}</p><p>Time: {}</p><p>IP Address: {}</p><p>User Agent: {}</p>\
         <p>Referrer: {}</p><p>Method: {}</p><p>URI: {}</p>\n<table>\n{}</table>",
        entry.id,
        seconds(entry.timestamp),
        escape_html(&entry.ip_address),
        escape_html(&entry.user_agent),
        escape_html(&entry.referrer),
        escape_html(&entry.method),
        escape_html(&entry.uri),
        rows
    )
}

///
/// `/admin/log`, a table of every logged request, and `/admin/log/:id` for a
/// single entry.
///
pub fn logs_module(store: Arc<dyn LogStore>, version: &str) -> Module {
    let mut module = Module::new("logs");
    module
        .register(Route::new(
            "/admin/log",
            LogTable {
                store: Arc::clone(&store),
                version: version.to_owned(),
            },
        ))
        .register(Route::new(
            "/admin/log/:id",
            LogDetail {
                store,
                version: version.to_owned(),
            },
        ));

    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{testing, App};
    use crate::config::Config;
    use crate::log_store::MemoryLogStore;
    use crate::static_files::StaticFiles;
    use std::collections::HashMap;

    fn app(handle_trailing_slash: bool) -> App {
        let store = Arc::new(MemoryLogStore::new());
        store
            .append(LogEntry {
                id: 0,
                timestamp: SystemTime::now(),
                ip_address: "10.0.0.7".to_owned(),
                user_agent: "curl/7.68.0".to_owned(),
                referrer: "Unknown Referrer".to_owned(),
                method: "GET".to_owned(),
                uri: "/about<script>".to_owned(),
                headers: HashMap::new(),
            })
            .unwrap();

        let config = Config {
            handle_trailing_slash,
            ..Config::default()
        };
        let mut app = App::new(config, StaticFiles::new("/nonexistent"));
        app.register_module(logs_module(store, "1.0"));
        app
    }

    #[tokio::test]
    async fn it_should_list_entries() {
        let response = testing::get(&app(false), "/admin/log").await;

        assert_eq!(response.status, 200);
        assert!(response.body.contains("10.0.0.7"));
        assert!(response.body.contains("/about&lt;script&gt;"));
        assert!(response.body.contains("<p>1 entries</p>"));
    }

    #[tokio::test]
    async fn it_should_show_a_single_entry() {
        let response = testing::get(&app(false), "/admin/log/1").await;

        assert!(response.body.contains("<p>ID: 1</p>"));
        assert!(response.body.contains("User Agent: curl/7.68.0"));
    }

    #[tokio::test]
    async fn it_should_report_missing_entries() {
        let app = app(false);

        assert!(testing::get(&app, "/admin/log/99").await.body.contains("ID 99 not found"));
        assert!(testing::get(&app, "/admin/log/abc").await.body.contains("ID abc not found"));
    }

    #[tokio::test]
    async fn it_should_report_an_empty_id() {
        let response = testing::get(&app(false), "/admin/log/").await;

        assert_eq!(response.status, 200);
        assert!(response.body.contains("ID Empty"));
    }

    #[tokio::test]
    async fn it_should_prefer_the_table_when_trailing_slashes_are_handled() {
        let response = testing::get(&app(true), "/admin/log/").await;

        assert!(response.body.contains("<h1>Request log</h1>"));
    }
}
