use crate::core::route::Route;

///
/// A named group of routes contributed by one part of the site.
///
pub struct Module {
    name: String,
    routes: Vec<Route>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_owned(),
            routes: Vec::new(),
        }
    }

    pub fn register(&mut self, route: Route) -> &mut Module {
        self.routes.push(route);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}
