use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use tokio_util::codec::Decoder;

use crate::app::App;
use crate::core::assembler::ConnectionAssembler;
use crate::core::http::Http;
use crate::core::request::Request;
use crate::core::response::Response;

///
/// The address test requests appear to come from.
///
pub const TEST_PEER: &str = "127.0.0.1:40404";

///
/// Send a request with any method, headers and body through the app, the
/// same way the server would after reading it off a socket.
///
pub async fn request(
    app: &App,
    method: &str,
    route: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> TestResponse {
    let mut raw = format!("{} {} HTTP/1.1\r\nHost: localhost:8888\r\n", method, route);
    for (name, value) in headers {
        raw.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !body.is_empty() {
        raw.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    raw.push_str("\r\n");
    raw.push_str(body);

    let mut bytes = BytesMut::with_capacity(raw.len());
    bytes.put(raw.as_bytes());

    let request = match assemble(&mut bytes) {
        Ok(Some(request)) => request,
        Ok(None) => panic!("test request did not decode to a full request"),
        Err(e) => panic!("test request did not decode: {}", e),
    };
    let response = app.dispatch(request).await;

    TestResponse::new(response)
}

pub async fn get(app: &App, route: &str) -> TestResponse {
    request(app, "GET", route, &[], "").await
}

pub async fn post(app: &App, route: &str, content: &str) -> TestResponse {
    request(app, "POST", route, &[], content).await
}

pub async fn delete(app: &App, route: &str) -> TestResponse {
    request(app, "DELETE", route, &[], "").await
}

fn assemble(bytes: &mut BytesMut) -> io::Result<Option<Request>> {
    let peer: Option<SocketAddr> = TEST_PEER.parse().ok();
    let mut codec = Http::new();
    let mut assembler = ConnectionAssembler::new(peer);

    while let Some(part) = codec.decode(bytes)? {
        if let Some(request) = assembler.push(part) {
            return Ok(Some(request));
        }
    }

    Ok(None)
}

#[derive(Debug)]
pub struct TestResponse {
    pub body: String,
    pub bytes: Bytes,
    pub headers: HashMap<String, String>,
    pub status: u16,
}

impl TestResponse {
    fn new(response: Response) -> TestResponse {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        TestResponse {
            body: String::from_utf8_lossy(&response.body).into_owned(),
            bytes: response.body,
            headers,
            status: response.status.as_u16(),
        }
    }
}
