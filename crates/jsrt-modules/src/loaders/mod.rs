//! The four loaders: CommonJS, ESM, JSON, and builtin.
//!
//! All share one contract: consult the cache before doing work (the
//! facade handles the lookup), populate it on success, and remove any
//! speculative entry when evaluation fails.

mod builtin;
mod commonjs;
mod esm;
mod json;

pub use commonjs::MAX_LOADING_DEPTH;

/// Replace a leading `#!` line with spaces so line numbers in stack
/// traces still match the on-disk file.
pub(crate) fn strip_shebang(source: &str) -> String {
    if source.starts_with("#!") {
        if let Some(newline_pos) = source.find('\n') {
            format!("{}{}", " ".repeat(newline_pos), &source[newline_pos..])
        } else {
            String::new()
        }
    } else {
        source.to_string()
    }
}
