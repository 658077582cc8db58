use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use socket2::{Domain, Socket, Type};
use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::codec::Framed;

use crate::app::App;
use crate::core::assembler::ConnectionAssembler;
use crate::core::http::Http;

pub const BACKLOG: i32 = 256;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unable to listen on http port: {0}")]
    Listen(#[from] io::Error),
    #[error("Unable to resolve a listen address for {0}")]
    InvalidAddress(String),
    #[error("Unable to start the runtime: {0}")]
    Runtime(#[source] io::Error),
}

///
/// Serves an `App` over TCP. Every accepted connection gets its own task,
/// which reads requests off the socket, dispatches them one at a time and
/// writes each response back before reading on.
///
pub struct Server {
    app: Arc<App>,
    background: Vec<BoxFuture<'static, ()>>,
}

impl Server {
    pub fn new(app: App) -> Self {
        Server {
            app: Arc::new(app),
            background: Vec::new(),
        }
    }

    ///
    /// A task to spawn alongside the server once the runtime is up, such as
    /// a `LogWriter`.
    ///
    pub fn with_background<F>(mut self, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.background.push(Box::pin(task));
        self
    }

    ///
    /// Start a multi-threaded runtime with a worker per cpu and serve on it
    /// until the listener fails.
    ///
    pub fn start(self, host: &str, port: u16) -> Result<(), ServerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_cpus::get())
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        runtime.block_on(self.build(host, port))
    }

    pub async fn build(self, host: &str, port: u16) -> Result<(), ServerError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ServerError::InvalidAddress(format!("{}:{}", host, port)))?;

        let listener = TcpListener::from_std(listen(addr)?)?;
        info!("Server running on {}", addr);

        self.serve(listener).await
    }

    ///
    /// Serve connections from an already bound listener.
    ///
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        for task in self.background {
            tokio::spawn(task);
        }

        let app = self.app;
        let mut incoming = TcpListenerStream::new(listener);

        while let Some(stream) = incoming.next().await {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let peer = stream.peer_addr().ok();
                if let Err(e) = process(&app, stream, peer).await {
                    warn!(
                        "Closing connection from {}: {}",
                        peer.map(|p| p.to_string()).unwrap_or_else(|| "unknown peer".to_owned()),
                        e
                    );
                }
            });
        }

        Ok(())
    }
}

fn listen(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

async fn process(app: &App, socket: TcpStream, peer: Option<SocketAddr>) -> io::Result<()> {
    let mut framed = Framed::new(socket, Http::new());
    let mut assembler = ConnectionAssembler::new(peer);

    while let Some(part) = framed.next().await {
        let request = match assembler.push(part?) {
            Some(request) => request,
            None => continue,
        };

        let keep_alive = request.keep_alive();
        let response = app.dispatch(request).await;
        debug!("Responding {}", response.status);
        framed.send(response).await?;

        if !keep_alive {
            trace!("Client asked to close the connection");
            break;
        }
    }

    Ok(())
}
