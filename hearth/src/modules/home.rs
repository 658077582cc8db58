use async_trait::async_trait;
use http::StatusCode;

use crate::core::context::RequestContext;
use crate::core::response::Response;
use crate::core::route::{Handler, Route};
use crate::core::writer::ResponseWriter;
use crate::module::Module;
use crate::modules::page;

struct Welcome {
    version: String,
}

#[async_trait]
impl Handler for Welcome {
    async fn handle(&self, _context: RequestContext, writer: ResponseWriter) -> Response {
        let html = page(
            "Welcome",
            "<h1>Welcome</h1><p>This server is up and running!</p>",
            &self.version,
        );

        writer.send_html(html, StatusCode::OK, false)
    }
}

pub fn home_module(version: &str) -> Module {
    let mut module = Module::new("home");
    module.register(Route::new(
        "/",
        Welcome {
            version: version.to_owned(),
        },
    ));

    module
}
