use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::request::{Method, RequestHead};
use crate::core::response::{encode, Response};
use std::{io, str};

const MAX_HEADERS: usize = 32;
const MAX_HEAD_LEN: usize = 64 * 1024;
const MAX_BODY_LEN: usize = 8 * 1024 * 1024;

///
/// One protocol event on a connection. A request arrives as a `Head`, zero or
/// more `Body` chunks, and a closing `End`.
///
#[derive(Debug)]
pub enum RequestPart {
    Head(RequestHead),
    Body(Bytes),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body { remaining: usize },
    End,
}

///
/// The HTTP/1.1 codec. Decoding yields `RequestPart`s as soon as the bytes for
/// them are available, encoding writes complete `Response`s.
///
pub struct Http {
    state: State,
}

impl Http {
    pub fn new() -> Self {
        Http { state: State::Head }
    }
}

impl Default for Http {
    fn default() -> Self {
        Http::new()
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn parse_head(buf: &BytesMut) -> io::Result<Option<(RequestHead, usize, usize)>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut r = httparse::Request::new(&mut headers);

    let status = r
        .parse(buf)
        .map_err(|e| invalid(format!("failed to parse http request: {:?}", e)))?;

    let amt = match status {
        httparse::Status::Complete(amt) => amt,
        httparse::Status::Partial => {
            if buf.len() > MAX_HEAD_LEN {
                return Err(invalid("request head too large".to_owned()));
            }
            return Ok(None);
        }
    };

    let method = r
        .method
        .ok_or_else(|| invalid("missing request method".to_owned()))?;
    let target = r
        .path
        .ok_or_else(|| invalid("missing request target".to_owned()))?;

    let mut head = RequestHead::new(Method::from(method), target);
    head.version = r.version.unwrap_or(1);

    let mut body_len: usize = 0;
    for header in r.headers.iter() {
        let value = str::from_utf8(header.value)
            .map_err(|_| invalid(format!("header {} is not valid utf8", header.name)))?;
        let name = header.name.to_ascii_lowercase();

        match name.as_str() {
            "content-length" => {
                body_len = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("bad content-length: {}", value)))?;
            }
            "transfer-encoding" if value.to_ascii_lowercase().contains("chunked") => {
                return Err(invalid("chunked request bodies are not supported".to_owned()));
            }
            _ => {}
        }

        head.headers.insert(name, value.to_owned());
    }

    if body_len > MAX_BODY_LEN {
        return Err(invalid(format!("request body of {} bytes is too large", body_len)));
    }

    Ok(Some((head, amt, body_len)))
}

impl Decoder for Http {
    type Item = RequestPart;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<RequestPart>> {
        match self.state {
            State::Head => {
                let (head, amt, body_len) = match parse_head(buf)? {
                    Some(parsed) => parsed,
                    None => return Ok(None),
                };
                buf.advance(amt);

                self.state = if body_len > 0 {
                    State::Body {
                        remaining: body_len,
                    }
                } else {
                    State::End
                };

                Ok(Some(RequestPart::Head(head)))
            }
            State::Body { remaining } => {
                if buf.is_empty() {
                    return Ok(None);
                }

                let take = remaining.min(buf.len());
                let chunk = buf.split_to(take).freeze();

                self.state = if take == remaining {
                    State::End
                } else {
                    State::Body {
                        remaining: remaining - take,
                    }
                };

                Ok(Some(RequestPart::Body(chunk)))
            }
            State::End => {
                self.state = State::Head;
                Ok(Some(RequestPart::End))
            }
        }
    }
}

impl Encoder<Response> for Http {
    type Error = io::Error;

    fn encode(&mut self, msg: Response, buf: &mut BytesMut) -> io::Result<()> {
        encode(&msg, buf);

        Ok(())
    }
}
