use bytes::Bytes;
use http::StatusCode;
use std::sync::Arc;

use crate::core::response::Response;
use crate::static_files::StaticFiles;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const ACCESS_DENIED_BODY: &str = "<html><head><title>Protected</title></head><body>\
<h1>Access Denied</h1><p>This page is protected</p><p><a href=\"/\">Back to site</a></p>\
</body></html>";

///
/// The one way to answer a request. Every method consumes the writer and
/// hands back the finished `Response`, so a handler can respond at most once,
/// and because handlers must return a `Response`, at least once.
///
pub struct ResponseWriter {
    files: Arc<StaticFiles>,
    custom_404: bool,
}

impl ResponseWriter {
    pub fn new(files: Arc<StaticFiles>, custom_404: bool) -> Self {
        ResponseWriter { files, custom_404 }
    }

    ///
    /// Respond with an html body.
    ///
    pub fn send_html<B: Into<String>>(self, body: B, status: StatusCode, is_error: bool) -> Response {
        let body = body.into();
        if is_error {
            warn!("Sending error response: {}", status);
        } else {
            debug!("Sending response: {}", status);
        }

        let mut response = Response::new(status);
        response
            .header("Content-Type", HTML_CONTENT_TYPE)
            .body_bytes(Bytes::from(body));
        response
    }

    ///
    /// Respond with raw bytes of the given mime type.
    ///
    pub fn send_binary(self, data: Bytes, mime_type: &str, status: StatusCode) -> Response {
        debug!("Sending {} bytes of {}: {}", data.len(), mime_type, status);

        let mut response = Response::new(status);
        response
            .header("Content-Type", mime_type)
            .header("Content-Length", &data.len().to_string())
            .body_bytes(data);
        response
    }

    ///
    /// Send the client on to `uri` with a 303.
    ///
    pub fn redirect(self, uri: &str) -> Response {
        debug!("Redirecting to {}", uri);

        let mut response = Response::new(StatusCode::SEE_OTHER);
        response.header("Location", uri);
        response
    }

    ///
    /// The not-found contract: the configured `404.html` when enabled and
    /// readable, otherwise a small generated page naming the URI. Never fails.
    ///
    pub async fn serve_404(self, uri: &str) -> Response {
        if self.custom_404 {
            let page = self.files.not_found_page().await;
            if let Some(page) = page {
                return self.send_html(page, StatusCode::NOT_FOUND, true);
            }
            debug!("Custom 404 page enabled but not readable, using the default");
        }

        let body = format!(
            "<html><body><h1>404 - Not Found</h1><p>The requested URL {} was not found on this server.</p></body></html>",
            escape_html(uri)
        );
        self.send_html(body, StatusCode::NOT_FOUND, true)
    }

    ///
    /// A generated error page carrying the status and message.
    ///
    pub fn send_error(self, message: &str, status: StatusCode) -> Response {
        let body = format!(
            "<html><body><h1>Error {}</h1><p>{}</p></body></html>",
            status.as_u16(),
            escape_html(message)
        );
        self.send_html(body, status, true)
    }

    ///
    /// The page every protected route answers with. It is deliberately sent
    /// with the same status as a normal page.
    ///
    pub fn access_denied(self) -> Response {
        self.send_html(ACCESS_DENIED_BODY, StatusCode::OK, false)
    }
}

///
/// Escape text for embedding in html.
///
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
