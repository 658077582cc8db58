use async_trait::async_trait;
use http::StatusCode;

use crate::core::context::RequestContext;
use crate::core::response::Response;
use crate::core::route::{Handler, Route};
use crate::core::writer::ResponseWriter;
use crate::module::Module;
use crate::modules::page;

struct AdminHome {
    version: String,
}

#[async_trait]
impl Handler for AdminHome {
    async fn handle(&self, _context: RequestContext, writer: ResponseWriter) -> Response {
        let html = page(
            "Admin Home",
            "<h1>Admin Home</h1><p><a href=\"/admin/log\">Request log</a></p>\
             <p><a href=\"/admin/users\">Users</a></p>",
            &self.version,
        );

        writer.send_html(html, StatusCode::OK, false)
    }
}

// Never runs: the route is protected.
struct Users;

#[async_trait]
impl Handler for Users {
    async fn handle(&self, _context: RequestContext, writer: ResponseWriter) -> Response {
        writer.access_denied()
    }
}

///
/// `/admin`, and the `/admin/users` page which is registered protected and
/// so always answers with access denied.
///
pub fn admin_module(version: &str) -> Module {
    let mut module = Module::new("admin");
    module
        .register(Route::new(
            "/admin",
            AdminHome {
                version: version.to_owned(),
            },
        ))
        .register(Route::new("/admin/users", Users).protected());

    module
}
