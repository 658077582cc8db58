use async_trait::async_trait;

use crate::core::context::RequestContext;
use crate::core::middleware::{Flow, Middleware};
use crate::core::request::Request;

pub const UNKNOWN_IP: &str = "Unknown IP";
pub const REAL_IP_HEADER: &str = "x-real-ip";

///
/// Copies the interesting parts of the request into the context parameters,
/// so later middleware and handlers can read them without touching headers.
/// Register it first.
///
/// Sets `method`, `uri`, `host`, `user-agent`, `referrer`, `client-ip` and
/// `headers`, the last being every header as a json object.
///
pub struct RequestParams;

#[async_trait]
impl Middleware for RequestParams {
    async fn handle(&self, mut context: RequestContext) -> Flow {
        let method = context.request.method().to_string();
        let uri = context.route().to_owned();
        let ip = client_ip(&context.request);
        let headers = match serde_json::to_string(context.request.headers()) {
            Ok(headers) => headers,
            Err(e) => {
                warn!("Unable to snapshot the headers of {}: {}", uri, e);
                String::from("{}")
            }
        };

        for (param, header) in &[("host", "host"), ("user-agent", "user-agent"), ("referrer", "referer")] {
            if let Some(value) = context.request.header(header).map(str::to_owned) {
                context.set(param, &value);
            }
        }

        context.set("method", &method);
        context.set("uri", &uri);
        context.set("client-ip", &ip);
        context.set("headers", &headers);

        Flow::Continue(context)
    }
}

///
/// The address a request came from: the proxy's `X-Real-IP` when present,
/// then the peer address.
///
pub fn client_ip(request: &Request) -> String {
    if let Some(ip) = request.header(REAL_IP_HEADER) {
        return ip.to_owned();
    }

    match request.remote_addr() {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_IP.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::{Method, RequestHead};
    use crate::static_files::StaticFiles;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn context(head: RequestHead, peer: Option<&str>) -> RequestContext {
        let request = Request::new(head, None, peer.map(|p| p.parse().unwrap()));
        RequestContext::new(request, Arc::new(StaticFiles::new("/nonexistent")), false)
    }

    async fn params(context: RequestContext) -> RequestContext {
        match RequestParams.handle(context).await {
            Flow::Continue(context) => context,
            Flow::Halt(_) => panic!("request params never halt"),
        }
    }

    #[tokio::test]
    async fn it_should_copy_request_details_into_params() {
        let head = RequestHead::new(Method::GET, "/about?lang=en")
            .header("Host", "example.com")
            .header("User-Agent", "curl/7.68.0")
            .header("Referer", "https://example.com/");

        let context = params(context(head, Some("192.168.1.20:51000"))).await;

        assert_eq!(context.get("method"), Some("GET"));
        assert_eq!(context.get("uri"), Some("/about"));
        assert_eq!(context.get("host"), Some("example.com"));
        assert_eq!(context.get("user-agent"), Some("curl/7.68.0"));
        assert_eq!(context.get("referrer"), Some("https://example.com/"));
        assert_eq!(context.get("client-ip"), Some("192.168.1.20"));

        let headers: HashMap<String, String> =
            serde_json::from_str(context.get("headers").unwrap()).unwrap();
        assert_eq!(headers.get("user-agent").unwrap(), "curl/7.68.0");
    }

    #[tokio::test]
    async fn it_should_prefer_the_proxy_address() {
        let head = RequestHead::new(Method::GET, "/").header("X-Real-IP", "203.0.113.9");

        let context = params(context(head, Some("127.0.0.1:51000"))).await;

        assert_eq!(context.get("client-ip"), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn it_should_fall_back_to_unknown_ip() {
        let context = params(context(RequestHead::new(Method::GET, "/"), None)).await;

        assert_eq!(context.get("client-ip"), Some(UNKNOWN_IP));
        assert_eq!(context.get("user-agent"), None);
    }
}
