use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;

use crate::core::http::RequestPart;
use crate::core::request::{Request, RequestHead};

///
/// Turns the ordered stream of protocol events for one connection into whole
/// requests. Each connection owns its own assembler; nothing here blocks.
///
/// Events that arrive without a preceding head (a stray body chunk, a stray
/// end) are dropped without producing anything.
///
pub struct ConnectionAssembler {
    remote_addr: Option<SocketAddr>,
    head: Option<RequestHead>,
    body: Option<BytesMut>,
}

impl ConnectionAssembler {
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        ConnectionAssembler {
            remote_addr,
            head: None,
            body: None,
        }
    }

    ///
    /// Feed the next event. Returns the assembled request when `part` is the
    /// `End` that completes it.
    ///
    pub fn push(&mut self, part: RequestPart) -> Option<Request> {
        match part {
            RequestPart::Head(head) => {
                self.head = Some(head);
                self.body = None;
                None
            }
            RequestPart::Body(chunk) => {
                if self.head.is_none() {
                    trace!("Ignoring {} body bytes with no request head", chunk.len());
                    return None;
                }

                self.body
                    .get_or_insert_with(BytesMut::new)
                    .extend_from_slice(&chunk);
                None
            }
            RequestPart::End => {
                let head = match self.head.take() {
                    Some(head) => head,
                    None => {
                        trace!("Ignoring end of request with no request head");
                        return None;
                    }
                };
                let body: Option<Bytes> = self.body.take().map(BytesMut::freeze);

                Some(Request::new(head, body, self.remote_addr))
            }
        }
    }

    ///
    /// Whether a request is currently part way through assembly.
    ///
    pub fn is_idle(&self) -> bool {
        self.head.is_none()
    }
}
