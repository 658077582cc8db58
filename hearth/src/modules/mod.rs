//! The pages the `hearth` binary ships with.

use std::sync::Arc;

use crate::app::App;
use crate::config::Config;
use crate::core::writer::escape_html;
use crate::log_store::LogStore;
use crate::middleware::{LogWriter, RequestLogger, RequestParams};
use crate::static_files::StaticFiles;

pub mod admin;
pub mod home;
pub mod logs;

pub use self::admin::admin_module;
pub use self::home::home_module;
pub use self::logs::logs_module;

///
/// Wrap a page body in the site layout.
///
pub(crate) fn page(title: &str, body: &str, version: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<link href=\"/css/site.css\" rel=\"stylesheet\">\n<title>{} - hearth</title>\n</head>\n<body>\n\
<nav><a href=\"/\">hearth</a></nav>\n<main>\n{}\n<footer>Server version {}</footer>\n</main>\n</body>\n</html>\n",
        escape_html(title),
        body,
        escape_html(version)
    )
}

///
/// The app the binary serves: request params and request logging in front
/// of the home, logs and admin modules. The returned writer must be run for
/// log entries to reach the store.
///
pub fn site(config: Config, files: StaticFiles, store: Arc<dyn LogStore>) -> (App, LogWriter) {
    let version = config.version.clone();
    let (logger, writer) = RequestLogger::new(Arc::clone(&store));

    let mut app = App::new(config, files);
    app.use_middleware(RequestParams)
        .use_middleware(logger)
        .register_module(home_module(&version))
        .register_module(logs_module(store, &version))
        .register_module(admin_module(&version));

    (app, writer)
}
