use std::sync::Arc;

use crate::config::Config;
use crate::core::context::RequestContext;
use crate::core::middleware::{Flow, Middleware, MiddlewareChain};
use crate::core::request::Request;
use crate::core::response::Response;
use crate::core::route::Route;
use crate::core::router::Router;
use crate::middleware::request_params::client_ip;
use crate::module::Module;
use crate::static_files::StaticFiles;

///
/// App, the entry point for every request. An app owns the route table, the
/// middleware chain and the static file root, and turns an assembled
/// `Request` into exactly one `Response`.
///
/// Setting an app up happens in three steps:
/// 1. `App::new` with the loaded configuration and a static file root
/// 2. Add middleware via `use_middleware`, and routes via `register_route`
///    or `register_module`
/// 3. Hand the app to a `Server`, or call `dispatch` directly
///
/// # Examples
///
/// ```rust, ignore
/// let mut app = App::new(Config::default(), StaticFiles::from_env());
///
/// let mut module = Module::new("home");
/// module.register(Route::new("/", HomePage));
/// app.register_module(module);
///
/// let response = app.dispatch(request).await;
/// ```
///
/// Once the app is shared with a server it is read-only, so registration
/// must be finished before serving starts.
///
pub struct App {
    router: Router,
    middleware: MiddlewareChain,
    files: Arc<StaticFiles>,
    config: Config,
    listing: Vec<String>,
}

impl App {
    pub fn new(config: Config, files: StaticFiles) -> App {
        App {
            router: Router::new(config.handle_trailing_slash),
            middleware: MiddlewareChain::new(),
            files: Arc::new(files),
            config,
            listing: Vec::new(),
        }
    }

    /// Add middleware to run, in registration order, before every request is routed.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut App {
        self.middleware.push(middleware);

        self
    }

    /// Add a single route outside of any module.
    pub fn register_route(&mut self, route: Route) -> &mut App {
        self.listing.push(listing_line("", &route));
        self.router.register(route);

        self
    }

    /// Add every route of a module.
    pub fn register_module(&mut self, module: Module) -> &mut App {
        info!(
            "Registering module {} with {} route(s)",
            module.name(),
            module.routes().len()
        );

        let name = module.name().to_owned();
        for route in module.into_routes() {
            self.listing.push(listing_line(&name, &route));
            self.router.register(route);
        }

        self
    }

    ///
    /// One line per registered route, in registration order, naming the
    /// module it came from. Trailing slash mirrors are not listed.
    ///
    pub fn route_listing(&self) -> &[String] {
        &self.listing
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn files(&self) -> &StaticFiles {
        &self.files
    }

    ///
    /// Run a request through the middleware and then the router.
    ///
    pub async fn dispatch(&self, request: Request) -> Response {
        info!("{}", request_summary(&request));
        trace!("Dispatching {:?}", request);

        let context = RequestContext::new(request, Arc::clone(&self.files), self.config.custom_404);

        match self.middleware.apply(context).await {
            Flow::Continue(context) => self.router.dispatch(context).await,
            Flow::Halt(response) => response,
        }
    }
}

fn request_summary(request: &Request) -> String {
    format!("{} {} from {}", request.method(), request.path(), client_ip(request))
}

fn listing_line(module: &str, route: &Route) -> String {
    if route.is_dynamic() {
        format!("Module: {}, Route: {} (dynamic)", module, route.uri())
    } else {
        format!("Module: {}, Route: {}", module, route.uri())
    }
}
