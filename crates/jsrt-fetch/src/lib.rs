//! jsrt HTTP fetch core.
//!
//! A from-scratch HTTP/1.1 client shaped as an explicit state machine:
//! URL parse, DNS, TCP connect, optional TLS handshake, request write,
//! streaming response parse, settle. The JavaScript-visible
//! `fetch`/`Headers`/`Request`/`Response` surface wraps these types;
//! rejection messages always name the state that failed.

mod client;
mod error;
mod headers;
mod parser;
mod request;
mod response;

pub use client::{fetch, fetch_request};
pub use error::{FetchError, FetchResult, FetchState};
pub use headers::Headers;
pub use parser::{ResponseHead, ResponseParser};
pub use request::{FetchUrl, Request, RequestInit, USER_AGENT, serialize_request};
pub use response::Response;
