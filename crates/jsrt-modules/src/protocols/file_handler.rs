//! `file://` transport.
//!
//! Accepts both two-slash (`file://path`) and three-slash
//! (`file:///path`) forms plus bare filesystem paths (the dispatcher
//! defaults scheme-less URLs here). Percent-escapes are decoded before the
//! read. Windows drive paths arrive as `file:///C:/...`; UNC paths are
//! not supported.

use super::ProtocolHandler;
use crate::error::{ModuleError, ModuleResult};
use tracing::debug;

pub struct FileHandler;

impl FileHandler {
    pub fn new() -> Self {
        FileHandler
    }
}

impl Default for FileHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `%XX` escapes; malformed escapes pass through untouched.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &input[i + 1..i + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Turn a `file://` URL (or bare path) into a filesystem path.
pub(crate) fn file_url_to_path(url: &str) -> ModuleResult<String> {
    // Bare filesystem paths (scheme-less dispatch) pass through verbatim;
    // only URL forms carry percent-escapes.
    let rest = match url.strip_prefix("file://") {
        None => return Ok(url.to_string()),
        Some(rest) => rest,
    };

    // file:///abs  -> "/abs"; file://abs -> "abs" treated as "/abs"-less
    // host form. A leading "//" after the prefix would be a UNC host,
    // which is unsupported.
    if rest.starts_with("//") {
        return Err(ModuleError::UnsupportedProtocol {
            scheme: "file (UNC)".to_string(),
        });
    }

    let decoded = percent_decode(rest);

    // Windows drive form: /C:/rest -> C:/rest
    let bytes = decoded.as_bytes();
    if bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
    {
        return Ok(decoded[1..].to_string());
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Ok(decoded);
    }

    // Two-slash form starts the absolute path right after the prefix:
    // file://tmp/a.js is read as /tmp/a.js.
    if !decoded.starts_with('/') {
        return Ok(format!("/{decoded}"));
    }

    Ok(decoded)
}

impl ProtocolHandler for FileHandler {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, url: &str) -> ModuleResult<Vec<u8>> {
        let path = file_url_to_path(url)?;
        debug!(url, path = %path, "reading file module");
        std::fs::read(&path).map_err(|err| ModuleError::load_failed(url, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_three_slash_form() {
        assert_eq!(file_url_to_path("file:///tmp/a.js").unwrap(), "/tmp/a.js");
    }

    #[test]
    fn test_two_slash_form() {
        // Two-slash form starts the absolute path right after the prefix.
        assert_eq!(file_url_to_path("file://tmp/a.js").unwrap(), "/tmp/a.js");
    }

    #[test]
    fn test_bare_path_passthrough() {
        assert_eq!(file_url_to_path("/tmp/a.js").unwrap(), "/tmp/a.js");
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            file_url_to_path("file:///tmp/with%20space.js").unwrap(),
            "/tmp/with space.js"
        );
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        // Malformed escapes pass through.
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_windows_drive_form() {
        assert_eq!(
            file_url_to_path("file:///C:/tmp/x/m.mjs").unwrap(),
            "C:/tmp/x/m.mjs"
        );
    }

    #[test]
    fn test_unc_rejected() {
        assert!(file_url_to_path("file:////server/share/a.js").is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("mod.js");
        std::fs::write(&file, "exports.x = 1;").unwrap();

        let handler = FileHandler::new();
        let url = format!("file://{}", file.display());
        assert_eq!(handler.load(&url).unwrap(), b"exports.x = 1;");
        // Bare path form works too.
        assert_eq!(
            handler.load(file.to_str().unwrap()).unwrap(),
            b"exports.x = 1;"
        );
    }

    #[test]
    fn test_load_missing_file_errors() {
        let handler = FileHandler::new();
        let err = handler.load("file:///definitely/not/here.js").unwrap_err();
        assert_eq!(err.code(), "ERR_MODULE_LOAD_FAILED");
    }
}
