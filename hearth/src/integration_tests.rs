use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use hearth::log_store::{LogStore, MemoryLogStore};
use hearth::modules::site;
use hearth::{App, Config, Handler, Method, RequestContext, Response, ResponseWriter, Route, Server, StaticFiles};

struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, context: RequestContext, writer: ResponseWriter) -> Response {
        let body = format!(
            "post={} body={}",
            context.is_post(),
            context.request.body_str().unwrap_or("")
        );
        writer.send_html(body, StatusCode::OK, false)
    }
}

struct Served {
    addr: SocketAddr,
    store: Arc<MemoryLogStore>,
    _root: tempfile::TempDir,
}

async fn serve() -> Served {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("css")).unwrap();
    fs::write(root.path().join("css/site.css"), CSS).unwrap();
    fs::write(root.path().join("about.html"), "<h1>About</h1>").unwrap();

    let store = Arc::new(MemoryLogStore::new());
    let (mut app, writer) = site(Config::default(), StaticFiles::new(root.path()), store.clone());
    app.register_route(Route::new("/echo", Echo).method(Method::POST));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(app).with_background(writer.run()).serve(listener));

    Served {
        addr,
        store,
        _root: root,
    }
}

const CSS: &[u8] = b"body {\r\n  color: #333;\r\n}\n\xe2\x80\x94 /* not ascii */\n";

struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl RawResponse {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

async fn read_response(stream: &mut TcpStream) -> RawResponse {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(index) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break index + 4;
        }
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before a full response head");
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines.next().unwrap().split(' ').nth(1).unwrap().parse().unwrap();
    let headers: HashMap<String, String> = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut split = line.splitn(2, ':');
            (
                split.next().unwrap().trim().to_lowercase(),
                split.next().unwrap().trim().to_owned(),
            )
        })
        .collect();

    let length: usize = headers["content-length"].parse().unwrap();
    let mut body = buf[head_end..].to_vec();
    while body.len() < length {
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before the full body");
        body.extend_from_slice(&chunk[..read]);
    }

    RawResponse {
        status,
        headers,
        body,
    }
}

async fn send(addr: SocketAddr, raw: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    read_response(&mut stream).await
}

#[tokio::test]
async fn it_should_serve_the_home_page() {
    let served = serve().await;

    let response = send(served.addr, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.headers["server"], "hearth");
    assert_eq!(response.headers["content-type"], "text/html; charset=utf-8");
    assert!(response.text().contains("Welcome"));
}

#[tokio::test]
async fn it_should_answer_several_requests_on_one_connection() {
    let served = serve().await;
    let mut stream = TcpStream::connect(served.addr).await.unwrap();

    stream
        .write_all(b"GET /about HTTP/1.1\r\nHost: localhost\r\n\r\nGET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let first = read_response(&mut stream).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.text(), "<h1>About</h1>");

    let second = read_response(&mut stream).await;
    assert_eq!(second.status, 404);

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(read_response(&mut stream).await.status, 200);
}

#[tokio::test]
async fn it_should_close_the_connection_when_asked() {
    let served = serve().await;
    let mut stream = TcpStream::connect(served.addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(read_response(&mut stream).await.status, 200);

    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest).await;
    assert!(rest.is_empty());
}

#[tokio::test]
async fn it_should_serve_stylesheets_byte_for_byte() {
    let served = serve().await;

    let response = send(served.addr, "GET /css/site.css HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.headers["content-type"], "text/css");
    assert_eq!(response.headers["content-length"], CSS.len().to_string());
    assert_eq!(response.body, CSS);
}

#[tokio::test]
async fn it_should_reject_unsupported_methods() {
    let served = serve().await;

    let response = send(served.addr, "DELETE /about HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(response.status, 405);
    assert!(response.text().contains("Unsupported HTTP method DELETE"));
}

#[tokio::test]
async fn it_should_name_the_uri_in_not_found_pages() {
    let served = serve().await;

    let response = send(served.addr, "GET /nowhere HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(response.status, 404);
    assert!(response.text().contains("/nowhere"));
}

#[tokio::test]
async fn it_should_deliver_post_bodies_to_handlers() {
    let served = serve().await;

    let response = send(
        served.addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nname=hearth",
    )
    .await;
    assert_eq!(response.text(), "post=true body=name=hearth");

    let response = send(served.addr, "POST /echo HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(response.text(), "post=false body=");
}

#[tokio::test]
async fn it_should_capture_dynamic_ids() {
    let served = serve().await;

    let response = send(served.addr, "GET /admin/log/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert!(response.text().contains("ID 42 not found"));

    let response = send(served.addr, "GET /admin/log/ HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert!(response.text().contains("ID Empty"));
}

#[tokio::test]
async fn it_should_keep_protected_pages_closed() {
    let served = serve().await;

    let response = send(served.addr, "GET /admin/users HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(response.status, 200);
    assert!(response.text().contains("Access Denied"));
}

#[tokio::test]
async fn it_should_drop_connections_sending_garbage() {
    let served = serve().await;
    let mut stream = TcpStream::connect(served.addr).await.unwrap();

    stream.write_all(b"\x00\x01 not http at all\r\n\r\n").await.unwrap();

    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest).await;
    assert!(rest.is_empty());

    let response = send(served.addr, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn it_should_log_a_burst_of_requests_once() {
    let served = serve().await;

    for _ in 0..3 {
        let response = send(served.addr, "GET /about HTTP/1.1\r\nHost: localhost\r\nX-Real-IP: 198.51.100.4\r\n\r\n").await;
        assert_eq!(response.status, 200);
    }

    let mut waited = Duration::from_millis(0);
    while served.store.entries().unwrap().is_empty() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let entries = served.store.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].ip_address, "198.51.100.4");
    assert_eq!(entries[0].uri, "/about");
}

#[tokio::test]
async fn it_should_list_routes_by_module() {
    let (app, _writer): (App, _) = site(
        Config::default(),
        StaticFiles::new("/nonexistent"),
        Arc::new(MemoryLogStore::new()),
    );

    let listing = app.route_listing();

    assert!(listing.contains(&"Module: home, Route: /".to_owned()));
    assert!(listing.contains(&"Module: logs, Route: /admin/log/:id (dynamic)".to_owned()));
    assert!(listing.contains(&"Module: admin, Route: /admin/users".to_owned()));
}
