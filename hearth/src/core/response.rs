use std::fmt::{self, Write};

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use smallvec::SmallVec;

pub const SERVER_NAME: &str = "hearth";

///
/// A fully formed response, ready to be encoded onto the wire. Handlers never
/// build these directly; they go through a `ResponseWriter`, which guarantees
/// one response per request.
///
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: SmallVec<[(String, String); 4]>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Response {
        Response {
            status,
            headers: SmallVec::new(),
            body: Bytes::new(),
        }
    }

    ///
    /// Set a header, replacing any previous value under the same name.
    ///
    pub fn header(&mut self, name: &str, value: &str) -> &mut Response {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }

        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&mut self, s: &str) -> &mut Response {
        self.body = Bytes::copy_from_slice(s.as_bytes());
        self
    }

    pub fn body_bytes(&mut self, b: Bytes) -> &mut Response {
        self.body = b;
        self
    }
}

pub fn encode(msg: &Response, buf: &mut BytesMut) {
    let reason = msg.status.canonical_reason().unwrap_or("");

    buf.reserve(128 + msg.body.len());

    // Writing into BytesMut cannot fail.
    let _ = write!(
        FastWrite(buf),
        "HTTP/1.1 {} {}\r\nServer: {}\r\n",
        msg.status.as_u16(),
        reason,
        SERVER_NAME
    );

    if msg.get_header("content-length").is_none() {
        let _ = write!(FastWrite(buf), "Content-Length: {}\r\n", msg.body.len());
    }

    for (name, value) in msg.headers.iter() {
        let _ = write!(FastWrite(buf), "{}: {}\r\n", name, value);
    }

    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(&msg.body);
}

// Right now `write!` on `Vec<u8>` goes through io::Write, so inline a
// less-crufty implementation here which doesn't go through io::Error.
struct FastWrite<'a>(&'a mut BytesMut);

impl<'a> fmt::Write for FastWrite<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (*self.0).extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> fmt::Result {
        fmt::write(self, args)
    }
}
