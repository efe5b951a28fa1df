//! Package manifest reader.
//!
//! Reads the nearest ancestor `package.json` and answers the questions the
//! resolver and format detector ask: `type`, entry points, and the
//! `exports`/`imports` maps. A manifest that exists but fails to parse is
//! treated as absent; the walk continues upward.

use crate::error::{ModuleError, ModuleResult};
use crate::path;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Parsed fields of a `package.json`, plus the directory containing it.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    /// `"module"`, `"commonjs"`, or unset.
    pub package_type: Option<String>,
    pub main: Option<String>,
    pub module: Option<String>,
    /// String or conditional object; interpreted by [`resolve_exports`].
    pub exports: Option<Value>,
    /// `#name` mappings; interpreted by [`resolve_imports`].
    pub imports: Option<Value>,
    /// Absolute directory the manifest was read from.
    pub dir: String,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "type")]
    package_type: Option<String>,
    main: Option<String>,
    module: Option<String>,
    exports: Option<Value>,
    imports: Option<Value>,
}

impl PackageManifest {
    /// Read exactly one `package.json`. Returns `None` when the file does
    /// not exist or does not parse.
    pub fn parse_exact(manifest_path: &str) -> Option<PackageManifest> {
        let content = std::fs::read_to_string(manifest_path).ok()?;
        let raw: RawManifest = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = manifest_path, %err, "ignoring unparseable package.json");
                return None;
            }
        };
        Some(PackageManifest {
            package_type: raw.package_type,
            main: raw.main,
            module: raw.module,
            exports: raw.exports,
            imports: raw.imports,
            dir: path::dirname(manifest_path),
        })
    }

    /// Walk ancestor directories from `start_dir` until a parseable
    /// `package.json` is found or the filesystem root is reached.
    pub fn find_and_parse(start_dir: &str) -> Option<PackageManifest> {
        let mut current = path::normalize(start_dir);
        loop {
            let candidate = path::join(&current, "package.json");
            if std::path::Path::new(&candidate).is_file() {
                if let Some(manifest) = Self::parse_exact(&candidate) {
                    debug!(dir = %manifest.dir, "found package manifest");
                    return Some(manifest);
                }
            }
            let parent = path::dirname(&current);
            if parent == current {
                return None;
            }
            current = parent;
        }
    }

    /// True iff `"type": "module"`.
    pub fn is_esm(&self) -> bool {
        self.package_type.as_deref() == Some("module")
    }

    /// Entry point: `module` when resolving for ESM, otherwise `main`.
    pub fn get_main(&self, is_esm: bool) -> Option<&str> {
        if is_esm {
            if let Some(module) = self.module.as_deref() {
                return Some(module);
            }
        }
        self.main.as_deref()
    }

    /// Resolve a subpath through the `exports` field.
    ///
    /// `subpath` is `.` for the package root or `./<rest>` otherwise.
    /// String exports only answer `.`; object exports are looked up by
    /// subpath and then by condition: `import` or `require` (depending on
    /// the importer), then `default`. Pattern (`*`) exports are not
    /// supported.
    pub fn resolve_exports(&self, subpath: &str, is_esm: bool) -> Option<String> {
        let exports = self.exports.as_ref()?;
        match exports {
            Value::String(target) if subpath == "." => Some(target.clone()),
            Value::Object(map) => {
                let entry = map.get(subpath)?;
                resolve_conditional(entry, if is_esm { "import" } else { "require" })
            }
            _ => None,
        }
    }

    /// Resolve a `#name` through the `imports` field. Conditions are
    /// limited to `default`.
    pub fn resolve_imports(&self, name: &str) -> ModuleResult<String> {
        let not_defined = || ModuleError::ImportNotDefined {
            package_dir: self.dir.clone(),
            name: name.to_string(),
        };
        let imports = self.imports.as_ref().ok_or_else(not_defined)?;
        let entry = imports
            .as_object()
            .and_then(|map| map.get(name))
            .ok_or_else(not_defined)?;
        resolve_conditional(entry, "default").ok_or_else(not_defined)
    }
}

/// Apply the string-or-conditional-object rule shared by `exports` and
/// `imports`: strings win directly, objects are tried with the given
/// condition and then `default`.
fn resolve_conditional(entry: &Value, condition: &str) -> Option<String> {
    match entry {
        Value::String(target) => Some(target.clone()),
        Value::Object(conditions) => {
            for key in [condition, "default"] {
                if let Some(Value::String(target)) = conditions.get(key) {
                    return Some(target.clone());
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &std::path::Path, content: &str) {
        std::fs::write(dir.join("package.json"), content).unwrap();
    }

    #[test]
    fn test_find_and_parse_walks_ancestors() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"type": "module", "main": "index.js"}"#);
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let manifest = PackageManifest::find_and_parse(nested.to_str().unwrap()).unwrap();
        assert!(manifest.is_esm());
        assert_eq!(manifest.dir, dir.path().to_str().unwrap());
    }

    #[test]
    fn test_unparseable_manifest_is_absent() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "{ not json");
        assert!(
            PackageManifest::parse_exact(dir.path().join("package.json").to_str().unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_get_main_prefers_module_for_esm() {
        let manifest = PackageManifest {
            package_type: None,
            main: Some("index.cjs".into()),
            module: Some("index.mjs".into()),
            exports: None,
            imports: None,
            dir: "/p".into(),
        };
        assert_eq!(manifest.get_main(true), Some("index.mjs"));
        assert_eq!(manifest.get_main(false), Some("index.cjs"));
    }

    #[test]
    fn test_resolve_exports_string_form() {
        let manifest = PackageManifest {
            package_type: None,
            main: None,
            module: None,
            exports: Some(serde_json::json!("./lib/index.js")),
            imports: None,
            dir: "/p".into(),
        };
        assert_eq!(
            manifest.resolve_exports(".", false).as_deref(),
            Some("./lib/index.js")
        );
        assert_eq!(manifest.resolve_exports("./sub", false), None);
    }

    #[test]
    fn test_resolve_exports_conditionals() {
        let manifest = PackageManifest {
            package_type: None,
            main: None,
            module: None,
            exports: Some(serde_json::json!({
                ".": { "require": "./r.js", "import": "./i.mjs" },
                "./feature": "./feature.js"
            })),
            imports: None,
            dir: "/p".into(),
        };
        assert_eq!(manifest.resolve_exports(".", false).as_deref(), Some("./r.js"));
        assert_eq!(manifest.resolve_exports(".", true).as_deref(), Some("./i.mjs"));
        assert_eq!(
            manifest.resolve_exports("./feature", true).as_deref(),
            Some("./feature.js")
        );
    }

    #[test]
    fn test_resolve_exports_default_condition() {
        let manifest = PackageManifest {
            package_type: None,
            main: None,
            module: None,
            exports: Some(serde_json::json!({ ".": { "default": "./d.js" } })),
            imports: None,
            dir: "/p".into(),
        };
        assert_eq!(manifest.resolve_exports(".", false).as_deref(), Some("./d.js"));
        assert_eq!(manifest.resolve_exports(".", true).as_deref(), Some("./d.js"));
    }

    #[test]
    fn test_resolve_imports() {
        let manifest = PackageManifest {
            package_type: None,
            main: None,
            module: None,
            exports: None,
            imports: Some(serde_json::json!({
                "#utils": "./src/utils.js",
                "#cond": { "default": "./src/cond.js" }
            })),
            dir: "/p".into(),
        };
        assert_eq!(manifest.resolve_imports("#utils").unwrap(), "./src/utils.js");
        assert_eq!(manifest.resolve_imports("#cond").unwrap(), "./src/cond.js");
        let err = manifest.resolve_imports("#missing").unwrap_err();
        assert_eq!(err.code(), "ERR_PACKAGE_IMPORT_NOT_DEFINED");
    }
}
