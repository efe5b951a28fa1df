//! `http://` / `https://` module transport.
//!
//! Remote module loading is policy-gated: scheme allowlist, optional
//! domain allowlist, response size limit, and a content-type prefix list.
//! Downloaded bodies are sanitized before they reach the engine: UTF-8 BOM
//! stripped, CRLF normalized to LF, and stray control bytes dropped.

use super::ProtocolHandler;
use crate::error::{ModuleError, ModuleResult};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "jsrt/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Security policy for remote module loading.
#[derive(Debug, Clone)]
pub struct HttpSecurityPolicy {
    /// Schemes the handler will touch.
    pub allowed_schemes: Vec<String>,
    /// When set, only these domains may serve modules.
    pub allowed_domains: Option<Vec<String>>,
    /// Response body cap in bytes.
    pub max_response_size: usize,
    /// Accepted `Content-Type` prefixes. An absent header is accepted.
    pub allowed_content_types: Vec<String>,
}

impl Default for HttpSecurityPolicy {
    fn default() -> Self {
        HttpSecurityPolicy {
            allowed_schemes: vec!["http".into(), "https".into()],
            allowed_domains: None,
            max_response_size: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "application/javascript".into(),
                "text/javascript".into(),
                "application/json".into(),
                "text/plain".into(),
                "application/typescript".into(),
            ],
        }
    }
}

impl HttpSecurityPolicy {
    /// Validate a URL before any network activity.
    pub fn validate_url(&self, raw: &str) -> ModuleResult<url::Url> {
        let parsed = url::Url::parse(raw).map_err(|err| ModuleError::HttpSecurity {
            url: raw.to_string(),
            reason: format!("invalid URL: {err}"),
        })?;

        if !self.allowed_schemes.iter().any(|s| s == parsed.scheme()) {
            return Err(ModuleError::HttpSecurity {
                url: raw.to_string(),
                reason: format!("scheme '{}' not allowed", parsed.scheme()),
            });
        }

        if let Some(domains) = &self.allowed_domains {
            let host = parsed.host_str().unwrap_or("");
            if !domains.iter().any(|d| d == host) {
                return Err(ModuleError::HttpSecurity {
                    url: raw.to_string(),
                    reason: format!("domain '{host}' not in allowlist"),
                });
            }
        }

        Ok(parsed)
    }

    /// Validate response metadata before the body is accepted.
    pub fn validate_response(
        &self,
        url: &str,
        content_type: Option<&str>,
        body_size: usize,
    ) -> ModuleResult<()> {
        if body_size > self.max_response_size {
            return Err(ModuleError::HttpSecurity {
                url: url.to_string(),
                reason: format!(
                    "response size {body_size} exceeds limit {}",
                    self.max_response_size
                ),
            });
        }

        if let Some(content_type) = content_type {
            let accepted = self
                .allowed_content_types
                .iter()
                .any(|prefix| content_type.starts_with(prefix.as_str()));
            if !accepted {
                return Err(ModuleError::HttpSecurity {
                    url: url.to_string(),
                    reason: format!("content type '{content_type}' not allowed"),
                });
            }
        }

        Ok(())
    }
}

/// Sanitize downloaded source before handing it to the engine.
///
/// Strips a leading UTF-8 BOM, folds CRLF (and lone CR) to LF, and drops
/// null and control bytes other than tab and newline.
pub fn sanitize_source(body: &[u8]) -> Vec<u8> {
    let body = body.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(body);

    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if c == b'\r' {
            out.push(b'\n');
            if body.get(i + 1) == Some(&b'\n') {
                i += 1;
            }
        } else if c >= 32 || c == b'\t' || c == b'\n' {
            out.push(c);
        }
        // Null bytes and other control characters are dropped.
        i += 1;
    }
    out
}

/// The always-registered remote transport.
pub struct HttpHandler {
    policy: HttpSecurityPolicy,
    client: reqwest::blocking::Client,
}

impl HttpHandler {
    pub fn new(policy: HttpSecurityPolicy) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("blocking HTTP client construction");
        HttpHandler { policy, client }
    }

    pub fn policy(&self) -> &HttpSecurityPolicy {
        &self.policy
    }
}

impl ProtocolHandler for HttpHandler {
    fn name(&self) -> &str {
        "http"
    }

    fn load(&self, url: &str) -> ModuleResult<Vec<u8>> {
        let validated = self.policy.validate_url(url)?;
        debug!(url, "downloading remote module");

        let response =
            self.client
                .get(validated)
                .send()
                .map_err(|err| ModuleError::HttpNetwork {
                    url: url.to_string(),
                    reason: err.to_string(),
                })?;

        let status = response.status();
        if status.as_u16() != 200 {
            warn!(url, status = status.as_u16(), "remote module request failed");
            return Err(ModuleError::HttpProtocol {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().map_err(|err| ModuleError::HttpNetwork {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        self.policy
            .validate_response(url, content_type.as_deref(), body.len())?;

        Ok(sanitize_source(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_scheme() {
        let policy = HttpSecurityPolicy::default();
        assert!(policy.validate_url("https://example.com/a.js").is_ok());
        assert!(policy.validate_url("ftp://example.com/a.js").is_err());
        assert!(policy.validate_url("not a url").is_err());
    }

    #[test]
    fn test_validate_url_domain_allowlist() {
        let policy = HttpSecurityPolicy {
            allowed_domains: Some(vec!["cdn.example.com".into()]),
            ..Default::default()
        };
        assert!(policy.validate_url("https://cdn.example.com/a.js").is_ok());
        let err = policy.validate_url("https://evil.com/a.js").unwrap_err();
        assert_eq!(err.code(), "ERR_HTTP_SECURITY_VIOLATION");
    }

    #[test]
    fn test_validate_response_limits() {
        let policy = HttpSecurityPolicy {
            max_response_size: 100,
            ..Default::default()
        };
        assert!(policy.validate_response("u", None, 50).is_ok());
        assert!(policy.validate_response("u", None, 101).is_err());
        assert!(
            policy
                .validate_response("u", Some("application/javascript; charset=utf-8"), 10)
                .is_ok()
        );
        assert!(policy.validate_response("u", Some("image/png"), 10).is_err());
    }

    #[test]
    fn test_sanitize_strips_bom() {
        let body = b"\xEF\xBB\xBFmodule.exports = 1;";
        let cleaned = sanitize_source(body);
        assert_eq!(cleaned[0], b'm');
        assert_eq!(cleaned, b"module.exports = 1;");
    }

    #[test]
    fn test_sanitize_normalizes_line_endings() {
        assert_eq!(sanitize_source(b"a\r\nb\rc\nd"), b"a\nb\nc\nd");
    }

    #[test]
    fn test_sanitize_drops_control_bytes() {
        assert_eq!(sanitize_source(b"a\x00b\x01c\td"), b"abc\td");
    }

    #[test]
    fn test_sanitize_keeps_plain_source() {
        let src = b"export const x = 1;\n";
        assert_eq!(sanitize_source(src), src);
    }
}
