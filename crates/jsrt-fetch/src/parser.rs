//! Streaming HTTP/1.1 response parser.
//!
//! Bytes are pushed in as they arrive from the socket. The head is
//! parsed incrementally with httparse; the body is framed by
//! `Content-Length`, chunked transfer coding, or connection close. The
//! caller polls [`ResponseParser::is_complete`] after every feed and
//! settles on EOF via [`ResponseParser::finish`].

use crate::error::{FetchError, FetchResult, FetchState};
use crate::headers::Headers;
use tracing::trace;

const MAX_HEADERS: usize = 64;

fn protocol_error(reason: impl std::fmt::Display) -> FetchError {
    FetchError::at(FetchState::Receiving, reason)
}

/// Parsed head of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub status_text: String,
    pub http_version: String,
    pub headers: Headers,
}

enum BodyFraming {
    /// `Content-Length: n`, counting down.
    Length(usize),
    /// Chunked transfer coding.
    Chunked(ChunkState),
    /// No framing header: body runs to connection close.
    UntilEof,
    /// Status lines that never carry a body (1xx, 204, 304).
    None,
}

enum ChunkState {
    /// Reading the `<hex>\r\n` size line.
    SizeLine,
    /// Reading `n` bytes of chunk data.
    Data(usize),
    /// Reading the CRLF after chunk data.
    DataCrlf,
    /// Reading trailers after the zero-size chunk.
    Trailer,
    Done,
}

enum State {
    Head,
    Body(BodyFraming),
    Complete,
}

pub struct ResponseParser {
    state: State,
    buffer: Vec<u8>,
    head: Option<ResponseHead>,
    body: Vec<u8>,
}

impl ResponseParser {
    pub fn new() -> Self {
        ResponseParser {
            state: State::Head,
            buffer: Vec::new(),
            head: None,
            body: Vec::new(),
        }
    }

    /// Push incoming bytes through the parser.
    pub fn feed(&mut self, bytes: &[u8]) -> FetchResult<()> {
        self.buffer.extend_from_slice(bytes);
        loop {
            match &mut self.state {
                State::Head => {
                    if !self.try_parse_head()? {
                        return Ok(());
                    }
                }
                State::Body(_) => return self.consume_body(),
                State::Complete => return Ok(()),
            }
        }
    }

    /// Whether the message is fully parsed.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete)
    }

    /// Settle the parse at connection close. A complete message or an
    /// EOF-terminated body yields a response; anything else is a
    /// protocol error.
    pub fn finish(mut self) -> FetchResult<(ResponseHead, Vec<u8>)> {
        match self.state {
            State::Complete => {}
            State::Body(BodyFraming::UntilEof) | State::Body(BodyFraming::None) => {
                self.state = State::Complete;
            }
            State::Head => {
                return Err(protocol_error("connection closed before response head"));
            }
            State::Body(BodyFraming::Length(remaining)) => {
                return Err(protocol_error(format!(
                    "connection closed with {remaining} body bytes missing"
                )));
            }
            State::Body(BodyFraming::Chunked(_)) => {
                return Err(protocol_error("connection closed mid-chunk"));
            }
        }
        match self.head {
            Some(head) => Ok((head, self.body)),
            None => Err(protocol_error("response settled without a head")),
        }
    }

    fn try_parse_head(&mut self) -> FetchResult<bool> {
        let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut response = httparse::Response::new(&mut header_storage);

        let head_len = match response.parse(&self.buffer) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => return Ok(false),
            Err(err) => return Err(protocol_error(format!("malformed response head: {err}"))),
        };

        let status = response
            .code
            .ok_or_else(|| protocol_error("missing status code"))?;
        let headers: Headers = response
            .headers
            .iter()
            .map(|h| {
                (
                    h.name.to_string(),
                    String::from_utf8_lossy(h.value).into_owned(),
                )
            })
            .collect();

        let head = ResponseHead {
            status,
            status_text: response.reason.unwrap_or("").to_string(),
            http_version: format!("1.{}", response.version.unwrap_or(1)),
            headers,
        };
        trace!(status = head.status, "response head parsed");

        let framing = Self::framing_for(&head)?;
        self.buffer.drain(..head_len);
        self.head = Some(head);
        self.state = match framing {
            BodyFraming::None => State::Complete,
            framing => State::Body(framing),
        };
        Ok(true)
    }

    fn framing_for(head: &ResponseHead) -> FetchResult<BodyFraming> {
        if head.status < 200 || head.status == 204 || head.status == 304 {
            return Ok(BodyFraming::None);
        }
        if let Some(te) = head.headers.get("transfer-encoding") {
            if te.to_ascii_lowercase().contains("chunked") {
                return Ok(BodyFraming::Chunked(ChunkState::SizeLine));
            }
        }
        if let Some(cl) = head.headers.get("content-length") {
            let length: usize = cl
                .trim()
                .parse()
                .map_err(|_| protocol_error(format!("bad Content-Length '{cl}'")))?;
            return Ok(if length == 0 {
                BodyFraming::None
            } else {
                BodyFraming::Length(length)
            });
        }
        Ok(BodyFraming::UntilEof)
    }

    fn consume_body(&mut self) -> FetchResult<()> {
        let State::Body(framing) = &mut self.state else {
            return Ok(());
        };

        match framing {
            BodyFraming::Length(remaining) => {
                let take = (*remaining).min(self.buffer.len());
                self.body.extend_from_slice(&self.buffer[..take]);
                self.buffer.drain(..take);
                *remaining -= take;
                if *remaining == 0 {
                    self.state = State::Complete;
                }
                Ok(())
            }
            BodyFraming::UntilEof => {
                self.body.append(&mut self.buffer);
                Ok(())
            }
            BodyFraming::Chunked(chunk_state) => {
                let done = decode_chunks(chunk_state, &mut self.buffer, &mut self.body)?;
                if done {
                    self.state = State::Complete;
                }
                Ok(())
            }
            BodyFraming::None => {
                self.state = State::Complete;
                Ok(())
            }
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the chunked-coding state machine as far as the buffer allows.
/// Returns true once the terminal chunk and trailers are consumed.
fn decode_chunks(
    state: &mut ChunkState,
    buffer: &mut Vec<u8>,
    body: &mut Vec<u8>,
) -> FetchResult<bool> {
    loop {
        match state {
            ChunkState::SizeLine => {
                let Some(line_end) = find_crlf(buffer) else {
                    return Ok(false);
                };
                let line = String::from_utf8_lossy(&buffer[..line_end]).into_owned();
                let size_text = line.split(';').next().unwrap_or("").trim();
                let size = usize::from_str_radix(size_text, 16)
                    .map_err(|_| protocol_error(format!("bad chunk size '{size_text}'")))?;
                buffer.drain(..line_end + 2);
                *state = if size == 0 {
                    ChunkState::Trailer
                } else {
                    ChunkState::Data(size)
                };
            }
            ChunkState::Data(remaining) => {
                let take = (*remaining).min(buffer.len());
                body.extend_from_slice(&buffer[..take]);
                buffer.drain(..take);
                *remaining -= take;
                if *remaining > 0 {
                    return Ok(false);
                }
                *state = ChunkState::DataCrlf;
            }
            ChunkState::DataCrlf => {
                if buffer.len() < 2 {
                    return Ok(false);
                }
                if &buffer[..2] != b"\r\n" {
                    return Err(protocol_error("missing CRLF after chunk data"));
                }
                buffer.drain(..2);
                *state = ChunkState::SizeLine;
            }
            ChunkState::Trailer => {
                // Consume trailer lines until the blank line.
                let Some(line_end) = find_crlf(buffer) else {
                    return Ok(false);
                };
                let is_blank = line_end == 0;
                buffer.drain(..line_end + 2);
                if is_blank {
                    *state = ChunkState::Done;
                    return Ok(true);
                }
            }
            ChunkState::Done => return Ok(true),
        }
    }
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(raw: &[u8]) -> (ResponseHead, Vec<u8>) {
        let mut parser = ResponseParser::new();
        parser.feed(raw).unwrap();
        parser.finish().unwrap()
    }

    #[test]
    fn test_content_length_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"n\":1}";
        let (head, body) = parse_all(raw);
        assert_eq!(head.status, 200);
        assert_eq!(head.status_text, "OK");
        assert_eq!(head.http_version, "1.1");
        assert_eq!(
            head.headers.get("content-type").as_deref(),
            Some("application/json")
        );
        assert_eq!(body, b"{\"n\":1}");
    }

    #[test]
    fn test_byte_at_a_time_feeding() {
        let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\ngone";
        let mut parser = ResponseParser::new();
        for byte in raw.iter() {
            parser.feed(std::slice::from_ref(byte)).unwrap();
        }
        assert!(parser.is_complete());
        let (head, body) = parser.finish().unwrap();
        assert_eq!(head.status, 404);
        assert_eq!(head.status_text, "Not Found");
        assert_eq!(body, b"gone");
    }

    #[test]
    fn test_chunked_body() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let (head, body) = parse_all(raw);
        assert_eq!(head.status, 200);
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn test_chunked_with_extension_and_trailer() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4;ext=1\r\nData\r\n0\r\nX-Trailer: t\r\n\r\n";
        let (_, body) = parse_all(raw);
        assert_eq!(body, b"Data");
    }

    #[test]
    fn test_eof_terminated_body() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\npartial content";
        let mut parser = ResponseParser::new();
        parser.feed(raw).unwrap();
        assert!(!parser.is_complete());
        let (head, body) = parser.finish().unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(body, b"partial content");
    }

    #[test]
    fn test_no_body_statuses() {
        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        let mut parser = ResponseParser::new();
        parser.feed(raw).unwrap();
        assert!(parser.is_complete());
        let (head, body) = parser.finish().unwrap();
        assert_eq!(head.status, 204);
        assert!(body.is_empty());
    }

    #[test]
    fn test_eof_mid_length_body_is_protocol_error() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort";
        let mut parser = ResponseParser::new();
        parser.feed(raw).unwrap();
        let err = parser.finish().unwrap_err();
        assert_eq!(err.state(), Some(FetchState::Receiving));
    }

    #[test]
    fn test_eof_before_head_is_protocol_error() {
        let mut parser = ResponseParser::new();
        parser.feed(b"HTTP/1.1 20").unwrap();
        assert!(parser.finish().is_err());
    }

    #[test]
    fn test_malformed_head_rejected() {
        let mut parser = ResponseParser::new();
        let err = parser.feed(b"NOT HTTP AT ALL\r\n\r\n").unwrap_err();
        assert_eq!(err.state(), Some(FetchState::Receiving));
    }

    #[test]
    fn test_bad_chunk_size_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        let mut parser = ResponseParser::new();
        assert!(parser.feed(raw).is_err());
    }
}
