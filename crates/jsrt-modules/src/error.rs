//! Module subsystem errors.
//!
//! Every variant maps to a stable `code` string visible from JavaScript;
//! embedders attach the code to the thrown error object.

use jsrt_engine::EngineError;
use thiserror::Error;

/// Errors produced by resolution, protocol dispatch, and loading.
#[derive(Error, Debug)]
pub enum ModuleError {
    /// Specifier could not be resolved to any candidate resource.
    #[error("Cannot find module '{specifier}'")]
    NotFound { specifier: String },

    /// Specifier is empty or syntactically unusable.
    #[error("Invalid module specifier '{specifier}'")]
    InvalidSpecifier { specifier: String },

    /// Package `exports` does not expose the requested subpath.
    #[error("Package subpath '{subpath}' is not defined by \"exports\" in {package_dir}/package.json")]
    PathNotExported { package_dir: String, subpath: String },

    /// Package `imports` does not define the requested `#` name.
    #[error("Package import specifier '{name}' is not defined in {package_dir}/package.json")]
    ImportNotDefined { package_dir: String, name: String },

    /// I/O, parse, compile, or evaluation failure while loading.
    #[error("Failed to load module '{specifier}': {reason}")]
    LoadFailed { specifier: String, reason: String },

    /// The format detector produced something no loader accepts.
    #[error("Unsupported module format for '{path}'")]
    UnsupportedFormat { path: String },

    /// No protocol handler is registered for the URL scheme.
    #[error("Unsupported protocol '{scheme}'")]
    UnsupportedProtocol { scheme: String },

    /// HTTP module loading was refused by the security policy.
    #[error("HTTP security violation for '{url}': {reason}")]
    HttpSecurity { url: String, reason: String },

    /// Network-level failure while fetching a remote module.
    #[error("Network error for '{url}': {reason}")]
    HttpNetwork { url: String, reason: String },

    /// The remote server answered with something unusable.
    #[error("HTTP protocol error for '{url}': {reason}")]
    HttpProtocol { url: String, reason: String },

    /// The module cache refused an insert. Never reaches JavaScript;
    /// a full cache is an internal assertion.
    #[error("Module cache is full ({capacity} entries)")]
    CacheFull { capacity: usize },

    /// The CommonJS loading stack exceeded its depth cap. Fatal.
    #[error("Module loading stack overflow (depth > {max_depth})")]
    LoadingStackOverflow { max_depth: usize },

    /// Failure surfaced by the engine during compile or evaluation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ModuleError {
    /// The stable `code` string exposed to JavaScript callers.
    pub fn code(&self) -> &'static str {
        match self {
            ModuleError::NotFound { .. } => "MODULE_NOT_FOUND",
            ModuleError::InvalidSpecifier { .. } => "ERR_INVALID_MODULE_SPECIFIER",
            ModuleError::PathNotExported { .. } => "ERR_PACKAGE_PATH_NOT_EXPORTED",
            ModuleError::ImportNotDefined { .. } => "ERR_PACKAGE_IMPORT_NOT_DEFINED",
            ModuleError::LoadFailed { .. } => "ERR_MODULE_LOAD_FAILED",
            ModuleError::UnsupportedFormat { .. } => "ERR_UNSUPPORTED_MODULE_FORMAT",
            ModuleError::UnsupportedProtocol { .. } => "ERR_UNSUPPORTED_PROTOCOL",
            ModuleError::HttpSecurity { .. } => "ERR_HTTP_SECURITY_VIOLATION",
            ModuleError::HttpNetwork { .. } => "ERR_HTTP_NETWORK",
            ModuleError::HttpProtocol { .. } => "ERR_HTTP_PROTOCOL",
            ModuleError::CacheFull { .. } => "ERR_INTERNAL_ASSERTION",
            ModuleError::LoadingStackOverflow { .. } => "ERR_MODULE_LOAD_FAILED",
            ModuleError::Engine(_) => "ERR_MODULE_LOAD_FAILED",
        }
    }

    /// Wrap a protocol or engine failure with the specifier it concerns.
    pub fn load_failed(specifier: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ModuleError::LoadFailed {
            specifier: specifier.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for module operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        let err = ModuleError::NotFound {
            specifier: "p".into(),
        };
        assert_eq!(err.code(), "MODULE_NOT_FOUND");

        let err = ModuleError::InvalidSpecifier {
            specifier: String::new(),
        };
        assert_eq!(err.code(), "ERR_INVALID_MODULE_SPECIFIER");

        let err = ModuleError::load_failed("./x.js", "read error");
        assert_eq!(err.code(), "ERR_MODULE_LOAD_FAILED");
        assert!(err.to_string().contains("./x.js"));
    }
}
