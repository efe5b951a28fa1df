//! Module specifier classification.
//!
//! Import strings fall into six syntactic categories. The checks overlap
//! (a bare name could look like a scheme), so ordering matters: package
//! imports first, then known builtin prefixes, then any other scheme, then
//! absolute and relative paths, and bare package names last.

use crate::error::{ModuleError, ModuleResult};
use crate::path;

/// Builtin module scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScheme {
    /// `jsrt:` runtime-native modules.
    Jsrt,
    /// `node:` Node-compatibility modules.
    Node,
}

impl BuiltinScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinScheme::Jsrt => "jsrt",
            BuiltinScheme::Node => "node",
        }
    }
}

/// A classified import string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// `jsrt:name` or `node:name`.
    Builtin { scheme: BuiltinScheme, name: String },
    /// Any `scheme://...` form. Scheme validity is the resolver's concern.
    Url { scheme: String, url: String },
    /// Starts with `./` or `../`.
    Relative(String),
    /// Platform-absolute path.
    Absolute(String),
    /// Starts with `#`: package-internal import.
    PackageImport(String),
    /// Anything else: a package name with optional subpath.
    Bare {
        package: String,
        subpath: Option<String>,
    },
}

impl Specifier {
    /// Classify a raw import string. Empty strings are invalid.
    pub fn classify(specifier: &str) -> ModuleResult<Specifier> {
        if specifier.is_empty() {
            return Err(ModuleError::InvalidSpecifier {
                specifier: specifier.to_string(),
            });
        }

        if specifier.starts_with('#') {
            return Ok(Specifier::PackageImport(specifier.to_string()));
        }

        if let Some(name) = specifier.strip_prefix("jsrt:") {
            return Ok(Specifier::Builtin {
                scheme: BuiltinScheme::Jsrt,
                name: name.to_string(),
            });
        }
        if let Some(name) = specifier.strip_prefix("node:") {
            return Ok(Specifier::Builtin {
                scheme: BuiltinScheme::Node,
                name: name.to_string(),
            });
        }

        if let Some(scheme) = url_scheme(specifier) {
            return Ok(Specifier::Url {
                scheme,
                url: specifier.to_string(),
            });
        }

        if path::is_absolute(specifier) {
            return Ok(Specifier::Absolute(specifier.to_string()));
        }

        if path::is_relative(specifier) {
            return Ok(Specifier::Relative(specifier.to_string()));
        }

        let (package, subpath) = split_package(specifier);
        Ok(Specifier::Bare { package, subpath })
    }

    /// The classification tag, used by [`ResolvedPath`](crate::resolver::ResolvedPath).
    pub fn kind(&self) -> SpecifierKind {
        match self {
            Specifier::Builtin { .. } => SpecifierKind::Builtin,
            Specifier::Url { .. } => SpecifierKind::Url,
            Specifier::Relative(_) => SpecifierKind::Relative,
            Specifier::Absolute(_) => SpecifierKind::Absolute,
            Specifier::PackageImport(_) => SpecifierKind::PackageImport,
            Specifier::Bare { .. } => SpecifierKind::Bare,
        }
    }
}

/// Classification tag without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Builtin,
    Url,
    Relative,
    Absolute,
    PackageImport,
    Bare,
}

/// Extract the scheme of a `scheme://` specifier, or `None`.
fn url_scheme(specifier: &str) -> Option<String> {
    let marker = specifier.find("://")?;
    if marker == 0 {
        return None;
    }
    let scheme = &specifier[..marker];
    if scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(scheme.to_ascii_lowercase())
    } else {
        None
    }
}

/// Split a bare specifier into package name and optional subpath.
///
/// Scoped packages (`@org/name`) span through the second slash; plain
/// packages through the first.
fn split_package(specifier: &str) -> (String, Option<String>) {
    if let Some(rest) = specifier.strip_prefix('@') {
        match rest.find('/') {
            None => (specifier.to_string(), None),
            Some(first_slash) => {
                let after_scope = &rest[first_slash + 1..];
                match after_scope.find('/') {
                    None => (specifier.to_string(), None),
                    Some(second_slash) => {
                        let pkg_len = 1 + first_slash + 1 + second_slash;
                        (
                            specifier[..pkg_len].to_string(),
                            Some(specifier[pkg_len + 1..].to_string()),
                        )
                    }
                }
            }
        }
    } else {
        match specifier.find('/') {
            None => (specifier.to_string(), None),
            Some(slash) => (
                specifier[..slash].to_string(),
                Some(specifier[slash + 1..].to_string()),
            ),
        }
    }
}
