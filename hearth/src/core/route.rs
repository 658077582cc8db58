use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::core::context::RequestContext;
use crate::core::request::Method;
use crate::core::response::Response;
use crate::core::writer::ResponseWriter;

///
/// The placeholder that marks a dynamic route. Only a single trailing
/// placeholder is understood, and it is always captured as `id`.
///
pub const DYNAMIC_SEGMENT: &str = ":id";
pub const DYNAMIC_PARAM: &str = "id";

///
/// Something that can answer a routed request. Implementors must produce
/// exactly one response through the writer they are given, converting any
/// failure of their own into `writer.send_error(..)`.
///
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: RequestContext, writer: ResponseWriter) -> Response;
}

///
/// A registered URI pattern and the handler behind it. Routes are immutable
/// once built.
///
#[derive(Clone)]
pub struct Route {
    uri: String,
    protected: bool,
    dynamic: bool,
    method: Method,
    handler: Arc<dyn Handler>,
}

impl Route {
    ///
    /// A `GET` route. The route is dynamic when its last segment is a
    /// placeholder, e.g. "/admin/log/:id".
    ///
    pub fn new<H: Handler + 'static>(uri: &str, handler: H) -> Route {
        let dynamic = uri
            .rsplit('/')
            .next()
            .map(|segment| segment.starts_with(':'))
            .unwrap_or(false);

        Route {
            uri: uri.to_owned(),
            protected: false,
            dynamic,
            method: Method::GET,
            handler: Arc::new(handler),
        }
    }

    ///
    /// Mark the route protected: it will always answer with the access denied
    /// page instead of running its handler.
    ///
    pub fn protected(mut self) -> Route {
        self.protected = true;
        self
    }

    ///
    /// Declare the method the route is meant for. Routes declared `POST` still
    /// answer `GET`; the handler tells the two apart by `context.is_post()`.
    ///
    pub fn method(mut self, method: Method) -> Route {
        self.method = method;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn allowed_method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub(crate) fn with_uri(&self, uri: String) -> Route {
        Route {
            uri,
            protected: self.protected,
            dynamic: self.dynamic,
            method: self.method.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Route")
            .field("uri", &self.uri)
            .field("protected", &self.protected)
            .field("dynamic", &self.dynamic)
            .field("method", &self.method)
            .finish()
    }
}
