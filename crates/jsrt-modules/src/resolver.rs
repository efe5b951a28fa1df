//! Specifier resolution.
//!
//! Turns a `(specifier, referrer)` pair into an absolute, existence-probed
//! filesystem path, a validated URL, or a builtin marker. Filesystem
//! outcomes are probed with Node-style fallbacks: exact file, then
//! `.js`/`.mjs`/`.cjs` extensions, then directory `index.*`. When nothing
//! exists the unadorned candidate is still returned; the loader surfaces
//! the I/O error with better context.

use crate::error::{ModuleError, ModuleResult};
use crate::package_json::PackageManifest;
use crate::path;
use crate::specifier::{Specifier, SpecifierKind};
use tracing::debug;

/// URL schemes the resolver accepts.
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "file"];

/// Extension fallbacks probed after the exact path.
const EXTENSION_CANDIDATES: &[&str] = &[".js", ".mjs", ".cjs"];

/// Index files probed inside a directory.
const INDEX_CANDIDATES: &[&str] = &["index.js", "index.mjs", "index.cjs"];

/// Resolver output. Invariants: a builtin keeps the original specifier as
/// `resolved`; a URL outcome has a validated scheme; anything else is an
/// absolute path that has been probed for existence.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub resolved: String,
    pub is_url: bool,
    pub is_builtin: bool,
    /// Scheme for builtin and URL outcomes.
    pub protocol: Option<String>,
    /// Classification tag of the original specifier.
    pub kind: SpecifierKind,
}

/// Resolves specifiers against a base directory (usually the process cwd).
pub struct Resolver {
    base_dir: String,
}

impl Resolver {
    pub fn new(base_dir: impl Into<String>) -> Self {
        Resolver {
            base_dir: base_dir.into(),
        }
    }

    /// Resolver rooted at the current working directory.
    pub fn from_cwd() -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| ".".to_string());
        Resolver::new(cwd)
    }

    fn referrer_dir(&self, referrer: Option<&str>) -> String {
        match referrer {
            Some(r) => path::dirname(r),
            None => self.base_dir.clone(),
        }
    }

    /// Resolve `specifier` as imported from `referrer`. `is_esm` selects
    /// the conditional-exports branch (`import` vs `require`).
    pub fn resolve(
        &self,
        specifier: &str,
        referrer: Option<&str>,
        is_esm: bool,
    ) -> ModuleResult<ResolvedPath> {
        let classified = Specifier::classify(specifier)?;
        let kind = classified.kind();
        debug!(specifier, ?kind, referrer, "resolving specifier");

        match classified {
            Specifier::Builtin { scheme, .. } => Ok(ResolvedPath {
                resolved: specifier.to_string(),
                is_url: false,
                is_builtin: true,
                protocol: Some(scheme.as_str().to_string()),
                kind,
            }),

            Specifier::Url { scheme, url } => {
                if !ALLOWED_URL_SCHEMES.contains(&scheme.as_str()) {
                    return Err(ModuleError::UnsupportedProtocol { scheme });
                }
                Ok(ResolvedPath {
                    resolved: url,
                    is_url: true,
                    is_builtin: false,
                    protocol: Some(scheme),
                    kind,
                })
            }

            Specifier::Relative(rel) => {
                let base = self.referrer_dir(referrer);
                let (resolved, _) = probe_existence(&path::join(&base, &rel));
                Ok(self.path_outcome(resolved, kind))
            }

            Specifier::Absolute(abs) => {
                let (resolved, _) = probe_existence(&path::normalize(&abs));
                Ok(self.path_outcome(resolved, kind))
            }

            Specifier::PackageImport(name) => {
                let base = self.referrer_dir(referrer);
                let manifest = PackageManifest::find_and_parse(&base).ok_or_else(|| {
                    ModuleError::ImportNotDefined {
                        package_dir: base.clone(),
                        name: name.clone(),
                    }
                })?;
                let target = manifest.resolve_imports(&name)?;
                let (resolved, _) = probe_existence(&path::join(&manifest.dir, &target));
                Ok(self.path_outcome(resolved, kind))
            }

            Specifier::Bare { package, subpath } => {
                let base = self.referrer_dir(referrer);
                let package_dir = find_package_dir(&base, &package).ok_or_else(|| {
                    ModuleError::NotFound {
                        specifier: specifier.to_string(),
                    }
                })?;
                let manifest =
                    PackageManifest::parse_exact(&path::join(&package_dir, "package.json"));
                let resolved = resolve_in_package(&package_dir, manifest.as_ref(), subpath, is_esm)?;
                Ok(self.path_outcome(resolved, kind))
            }
        }
    }

    fn path_outcome(&self, resolved: String, kind: SpecifierKind) -> ResolvedPath {
        ResolvedPath {
            resolved,
            is_url: false,
            is_builtin: false,
            protocol: None,
            kind,
        }
    }
}

/// Probe a candidate path: exact file, extension fallbacks, directory
/// index files. Returns the chosen path and whether anything exists.
fn probe_existence(candidate: &str) -> (String, bool) {
    let meta = std::fs::metadata(candidate);
    if meta.as_ref().map(|m| m.is_file()).unwrap_or(false) {
        return (candidate.to_string(), true);
    }

    for ext in EXTENSION_CANDIDATES {
        let with_ext = format!("{candidate}{ext}");
        if std::path::Path::new(&with_ext).is_file() {
            return (with_ext, true);
        }
    }

    if meta.map(|m| m.is_dir()).unwrap_or(false) {
        for index in INDEX_CANDIDATES {
            let index_path = path::join(candidate, index);
            if std::path::Path::new(&index_path).is_file() {
                return (index_path, true);
            }
        }
    }

    (candidate.to_string(), false)
}

/// Walk ancestors of `start_dir` looking for `node_modules/<package>`.
fn find_package_dir(start_dir: &str, package: &str) -> Option<String> {
    let mut current = path::normalize(start_dir);
    loop {
        let candidate = path::join(&path::join(&current, "node_modules"), package);
        if std::path::Path::new(&candidate).is_dir() {
            debug!(package, dir = %candidate, "found package directory");
            return Some(candidate);
        }
        let parent = path::dirname(&current);
        if parent == current {
            return None;
        }
        current = parent;
    }
}

/// Resolve a subpath (or the package root) inside a located package.
fn resolve_in_package(
    package_dir: &str,
    manifest: Option<&PackageManifest>,
    subpath: Option<String>,
    is_esm: bool,
) -> ModuleResult<String> {
    match subpath {
        Some(sub) => {
            if let Some(manifest) = manifest {
                if let Some(target) = manifest.resolve_exports(&format!("./{sub}"), is_esm) {
                    let (resolved, _) = probe_existence(&path::join(package_dir, &target));
                    return Ok(resolved);
                }
            }
            // Fall back to joining the subpath directly.
            let (resolved, exists) = probe_existence(&path::join(package_dir, &sub));
            if !exists {
                if let Some(manifest) = manifest {
                    if manifest.exports.is_some() {
                        return Err(ModuleError::PathNotExported {
                            package_dir: package_dir.to_string(),
                            subpath: format!("./{sub}"),
                        });
                    }
                }
            }
            Ok(resolved)
        }
        None => {
            if let Some(manifest) = manifest {
                if let Some(target) = manifest.resolve_exports(".", is_esm) {
                    let (resolved, _) = probe_existence(&path::join(package_dir, &target));
                    return Ok(resolved);
                }
                if let Some(main) = manifest.get_main(is_esm) {
                    let (resolved, exists) = probe_existence(&path::join(package_dir, main));
                    if exists {
                        return Ok(resolved);
                    }
                }
            }
            for index in ["index.js", "index.mjs"] {
                let candidate = path::join(package_dir, index);
                if std::path::Path::new(&candidate).is_file() {
                    return Ok(candidate);
                }
            }
            Ok(path::join(package_dir, "index.js"))
        }
    }
}
