use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::request::Request;
use crate::core::writer::ResponseWriter;
use crate::static_files::StaticFiles;

///
/// What a request looks like to middleware and handlers: the assembled
/// request, the string parameters middleware attached to it, and the
/// parameters the router pulled out of the path. A new context is made for
/// every request and dropped once it has been answered.
///
pub struct RequestContext {
    pub request: Request,
    pub params: HashMap<String, String>,
    pub route_params: HashMap<String, String>,
    files: Arc<StaticFiles>,
    custom_404: bool,
}

impl RequestContext {
    pub fn new(request: Request, files: Arc<StaticFiles>, custom_404: bool) -> Self {
        RequestContext {
            request,
            params: HashMap::new(),
            route_params: HashMap::new(),
            files,
            custom_404,
        }
    }

    ///
    /// The query-free path being requested.
    ///
    pub fn route(&self) -> &str {
        self.request.path()
    }

    ///
    /// Attach a middleware parameter.
    ///
    pub fn set(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) {
        self.params.remove(key);
    }

    ///
    /// A parameter set by the router, e.g. the route "/users/:id" requested as
    /// "/users/42" gives `param("id") == Some("42")`.
    ///
    pub fn param(&self, key: &str) -> Option<&str> {
        self.route_params.get(key).map(String::as_str)
    }

    ///
    /// Whether the router dispatched this as a POST carrying a body.
    ///
    pub fn is_post(&self) -> bool {
        self.param("method") == Some("POST")
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.request.body()
    }

    pub fn files(&self) -> &StaticFiles {
        &self.files
    }

    ///
    /// A writer for answering this request.
    ///
    pub fn writer(&self) -> ResponseWriter {
        ResponseWriter::new(Arc::clone(&self.files), self.custom_404)
    }
}
