//! The `Response` half of the fetch surface.

use crate::error::{FetchError, FetchResult};
use crate::headers::Headers;
use crate::parser::ResponseHead;
use bytes::Bytes;

/// A settled fetch response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub http_version: String,
    pub headers: Headers,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(head: ResponseHead, body: Vec<u8>) -> Self {
        Response {
            status: head.status,
            status_text: head.status_text,
            http_version: head.http_version,
            headers: head.headers,
            body: Bytes::from(body),
        }
    }

    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body as UTF-8 text, stripping a leading BOM per the
    /// Web text() contract.
    pub async fn text(&self) -> FetchResult<String> {
        let body = self
            .body
            .strip_prefix(&[0xEF, 0xBB, 0xBF][..])
            .unwrap_or(&self.body);
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    /// Decode the body as JSON.
    pub async fn json(&self) -> FetchResult<serde_json::Value> {
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(|err| FetchError::Json(err.to_string()))
    }
}
