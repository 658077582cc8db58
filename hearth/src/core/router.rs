use fnv::FnvHashMap;
use http::StatusCode;

use crate::core::context::RequestContext;
use crate::core::request::Method;
use crate::core::response::Response;
use crate::core::route::{Route, DYNAMIC_PARAM, DYNAMIC_SEGMENT};
use crate::static_files::StaticContent;

///
/// How a path resolved against the route table.
///
#[derive(Debug)]
pub enum Resolution<'a> {
    Exact(&'a Route),
    Dynamic { route: &'a Route, id: String },
    Fallback,
}

///
/// The route table plus the rules for resolving a request against it.
///
/// Lookups try, in order, an exact match on the path, a dynamic match on the
/// path's parent with a trailing `:id`, and finally the static files. The
/// table is filled at startup and only read while serving.
///
pub struct Router {
    routes: FnvHashMap<String, Route>,
    handle_trailing_slash: bool,
}

impl Router {
    pub fn new(handle_trailing_slash: bool) -> Router {
        Router {
            routes: FnvHashMap::default(),
            handle_trailing_slash,
        }
    }

    ///
    /// Add a route. With trailing slash handling on, a static route that does
    /// not already end in `/` is also registered under `uri + "/"`.
    ///
    pub fn register(&mut self, route: Route) {
        if route.is_dynamic() && !route.uri().ends_with(&format!("/{}", DYNAMIC_SEGMENT)) {
            warn!(
                "Dynamic route {} will never match, only a trailing {} is supported",
                route.uri(),
                DYNAMIC_SEGMENT
            );
        }

        if self.handle_trailing_slash && !route.is_dynamic() && !route.uri().ends_with('/') {
            let mirror = route.with_uri(format!("{}/", route.uri()));
            self.insert(mirror);
        }

        self.insert(route);
    }

    fn insert(&mut self, route: Route) {
        if self.routes.contains_key(route.uri()) {
            warn!("Route {} registered twice, keeping the latest", route.uri());
        }
        debug!("Registered route {:?}", route);

        self.routes.insert(route.uri().to_owned(), route);
    }

    pub fn get(&self, uri: &str) -> Option<&Route> {
        self.routes.get(uri)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn handles_trailing_slash(&self) -> bool {
        self.handle_trailing_slash
    }

    ///
    /// Resolve a path. Exact matches beat dynamic ones, and both beat the
    /// static file fallback.
    ///
    pub fn resolve(&self, path: &str) -> Resolution<'_> {
        if let Some(route) = self.routes.get(path) {
            return Resolution::Exact(route);
        }

        let (parent, last) = match path.rfind('/') {
            Some(index) => (&path[..index], &path[index + 1..]),
            None => ("", path),
        };
        let pattern = format!("{}/{}", parent, DYNAMIC_SEGMENT);

        match self.routes.get(&pattern) {
            Some(route) if route.is_dynamic() => Resolution::Dynamic {
                route,
                id: last.to_owned(),
            },
            _ => Resolution::Fallback,
        }
    }

    ///
    /// Answer a request that made it through the middleware.
    ///
    pub async fn dispatch(&self, mut context: RequestContext) -> Response {
        let writer = context.writer();
        let path = context.route().to_owned();

        let is_post = match context.request.method() {
            Method::GET => false,
            // A POST without a body is treated as a plain GET.
            Method::POST => context.body().is_some(),
            other => {
                return writer.send_html(
                    format!("Unsupported HTTP method {}", other),
                    StatusCode::METHOD_NOT_ALLOWED,
                    true,
                );
            }
        };

        match self.resolve(&path) {
            Resolution::Exact(route) => {
                debug!("Exact route {} for {}", route.uri(), path);
                if route.is_protected() {
                    return writer.access_denied();
                }

                if is_post {
                    context.route_params.insert("method".to_owned(), "POST".to_owned());
                }
                route.handler().handle(context, writer).await
            }
            Resolution::Dynamic { route, id } => {
                debug!("Dynamic route {} for {} ({}={})", route.uri(), path, DYNAMIC_PARAM, id);
                if route.is_protected() {
                    return writer.access_denied();
                }

                context.route_params.insert(DYNAMIC_PARAM.to_owned(), id);
                if is_post {
                    context.route_params.insert("method".to_owned(), "POST".to_owned());
                }
                route.handler().handle(context, writer).await
            }
            Resolution::Fallback if is_post => {
                debug!("No route for POST {}", path);
                writer.serve_404(&path).await
            }
            Resolution::Fallback => match context.files().resolve(&path).await {
                Some(StaticContent::Html(html)) => writer.send_html(html, StatusCode::OK, false),
                Some(StaticContent::Binary { data, mime }) => {
                    writer.send_binary(data, mime, StatusCode::OK)
                }
                None => writer.serve_404(&path).await,
            },
        }
    }

    ///
    /// Every registered route, sorted by URI.
    ///
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by(|a, b| a.uri().cmp(b.uri()));
        routes
    }
}
