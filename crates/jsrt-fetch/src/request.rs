//! Request construction and RFC 7230 serialization.

use crate::error::{FetchError, FetchResult, FetchState};
use crate::headers::Headers;
use url::Url;

/// Default User-Agent on every request.
pub const USER_AGENT: &str = "jsrt/1.0";

/// The pieces of an http/https URL the fetch machine needs.
#[derive(Debug, Clone)]
pub struct FetchUrl {
    pub host: String,
    pub port: u16,
    /// Path plus query, always starting with `/`.
    pub path: String,
    pub is_https: bool,
}

impl FetchUrl {
    /// Parse and validate; only `http` and `https` are fetchable.
    pub fn parse(raw: &str) -> FetchResult<FetchUrl> {
        let parsed =
            Url::parse(raw).map_err(|err| FetchError::at(FetchState::ParsingUrl, err))?;

        let is_https = match parsed.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(FetchError::at(
                    FetchState::ParsingUrl,
                    format!("unsupported scheme '{other}'"),
                ));
            }
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::at(FetchState::ParsingUrl, "missing host"))?
            .to_string();
        let port = parsed
            .port()
            .unwrap_or(if is_https { 443 } else { 80 });

        let mut path = parsed.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(FetchUrl {
            host,
            port,
            path,
            is_https,
        })
    }
}

/// Options accepted by `fetch(url, init)`.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    /// Defaults to GET.
    pub method: Option<String>,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// A constructed fetch request: eagerly validated URL plus options.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Build a request, validating the URL up front (the `Request`
    /// constructor throws on a bad URL before any fetch happens).
    pub fn new(url: &str, init: Option<RequestInit>) -> FetchResult<Request> {
        FetchUrl::parse(url)?;
        let init = init.unwrap_or_default();
        Ok(Request {
            url: url.to_string(),
            method: init
                .method
                .map(|m| m.to_ascii_uppercase())
                .unwrap_or_else(|| "GET".to_string()),
            headers: init.headers,
            body: init.body,
        })
    }

    pub(crate) fn into_init(self) -> (String, RequestInit) {
        (
            self.url,
            RequestInit {
                method: Some(self.method),
                headers: self.headers,
                body: self.body,
            },
        )
    }
}

/// Serialize one HTTP/1.1 request.
///
/// Emits the request line, `Host: host:port`, the user headers with
/// `User-Agent` defaulted, a forced `Connection: close`, `Content-Length`
/// when a body is present, a blank line, then the body.
pub fn serialize_request(url: &FetchUrl, init: &RequestInit) -> Vec<u8> {
    let method = init
        .method
        .as_deref()
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_else(|| "GET".to_string());

    let mut out = Vec::with_capacity(256 + init.body.as_ref().map_or(0, |b| b.len()));
    out.extend_from_slice(format!("{method} {} HTTP/1.1\r\n", url.path).as_bytes());
    out.extend_from_slice(format!("Host: {}:{}\r\n", url.host, url.port).as_bytes());

    for (name, value) in init.headers.iter() {
        // Connection and Content-Length are controlled below.
        if name == "connection" || name == "content-length" {
            continue;
        }
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    if !init.headers.has("user-agent") {
        out.extend_from_slice(format!("User-Agent: {USER_AGENT}\r\n").as_bytes());
    }
    out.extend_from_slice(b"Connection: close\r\n");

    if let Some(body) = &init.body {
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    if let Some(body) = &init.body {
        out.extend_from_slice(body);
    }
    out
}
