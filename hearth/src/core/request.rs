use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{fmt, str};

///
/// The request methods understood at the transport layer. Only `GET` and `POST`
/// are dispatched by the router, everything else is answered with an
/// "unsupported method" body.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    DELETE,
    GET,
    POST,
    PUT,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::DELETE => "DELETE",
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::Other(method) => method,
        }
    }
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method {
            "DELETE" => Method::DELETE,
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            other => Method::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// The head of a request as it comes off the wire: request line plus headers.
/// Header names are lowercased, and a repeated header keeps its last value.
///
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub version: u8,
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.find('?') {
            Some(index) => (&target[..index], Some(target[index + 1..].to_owned())),
            None => (target, None),
        };

        RequestHead {
            method,
            path: path.to_owned(),
            query,
            version: 1,
            headers: HashMap::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_owned());
        self
    }
}

///
/// A complete request, assembled once every part of it has arrived on the
/// connection. Requests are never mutated after assembly.
///
pub struct Request {
    head: RequestHead,
    body: Option<Bytes>,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn new(head: RequestHead, body: Option<Bytes>, remote_addr: Option<SocketAddr>) -> Self {
        Request {
            head,
            body,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    ///
    /// Get the path as a string ("/some/path"), without the query
    ///
    pub fn path(&self) -> &str {
        &self.head.path
    }

    pub fn query(&self) -> Option<&str> {
        self.head.query.as_deref()
    }

    ///
    /// Get the minor HTTP version, i.e. `1` for HTTP/1.1
    ///
    pub fn version(&self) -> u8 {
        self.head.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.head.headers
    }

    ///
    /// Look up a header by name, case insensitively.
    ///
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head
            .headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    ///
    /// The raw body, present only when the request carried one.
    ///
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    ///
    /// Get the body as a utf8 encoded string, if there is one and it is valid utf8.
    ///
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| str::from_utf8(b).ok())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    ///
    /// Whether the connection may be reused after this request is answered.
    ///
    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(value) if value.eq_ignore_ascii_case("close") => false,
            Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.head.version >= 1,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<HTTP Request {} {}>", self.method(), self.path())
    }
}
