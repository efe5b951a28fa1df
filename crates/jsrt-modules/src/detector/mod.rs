//! Module format detection.
//!
//! Three sources, in order: file extension, nearest package manifest
//! `type`, lexical content scan. The main entry point never answers
//! `Unknown`; ambiguity defaults to CommonJS.

mod content;

pub use content::analyze;

use crate::package_json::PackageManifest;
use crate::path;
use tracing::debug;

/// Execution format of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    CommonJs,
    Esm,
    Json,
    /// Only intermediate detection stages produce this; [`detect`]
    /// resolves it to CommonJS.
    Unknown,
}

/// Detect format from the file extension alone.
pub fn detect_by_extension(file_path: &str) -> ModuleFormat {
    match path::extension(file_path) {
        Some(".cjs") => ModuleFormat::CommonJs,
        Some(".mjs") => ModuleFormat::Esm,
        Some(".json") => ModuleFormat::Json,
        _ => ModuleFormat::Unknown,
    }
}

/// Detect format from the nearest ancestor manifest's `type` field.
pub fn detect_by_manifest(file_path: &str) -> ModuleFormat {
    let dir = path::dirname(file_path);
    match PackageManifest::find_and_parse(&dir) {
        Some(manifest) => match manifest.package_type.as_deref() {
            Some("module") => ModuleFormat::Esm,
            Some("commonjs") => ModuleFormat::CommonJs,
            _ => ModuleFormat::Unknown,
        },
        None => ModuleFormat::Unknown,
    }
}

/// Full detection pipeline: extension, then manifest, then content scan,
/// defaulting to CommonJS.
pub fn detect(file_path: &str, source: Option<&str>) -> ModuleFormat {
    let by_extension = detect_by_extension(file_path);
    if by_extension != ModuleFormat::Unknown {
        debug!(path = file_path, ?by_extension, "format from extension");
        return by_extension;
    }

    let by_manifest = detect_by_manifest(file_path);
    if by_manifest != ModuleFormat::Unknown {
        debug!(path = file_path, ?by_manifest, "format from package.json type");
        return by_manifest;
    }

    if let Some(source) = source {
        let by_content = analyze(source);
        if by_content != ModuleFormat::Unknown {
            debug!(path = file_path, ?by_content, "format from content scan");
            return by_content;
        }
    }

    ModuleFormat::CommonJs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extension_wins() {
        assert_eq!(detect("/p/a.cjs", Some("import x from 'y';")), ModuleFormat::CommonJs);
        assert_eq!(detect("/p/a.mjs", Some("module.exports = 1;")), ModuleFormat::Esm);
        assert_eq!(detect("/p/a.json", None), ModuleFormat::Json);
    }

    #[test]
    fn test_manifest_type_decides_js() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"type": "module"}"#).unwrap();
        let file = dir.path().join("a.js");
        assert_eq!(
            detect(file.to_str().unwrap(), Some("module.exports = 1;")),
            ModuleFormat::Esm
        );
    }

    #[test]
    fn test_content_scan_fallback() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        let p = file.to_str().unwrap();
        assert_eq!(detect(p, Some("export const x = 1;")), ModuleFormat::Esm);
        assert_eq!(detect(p, Some("exports.x = 1;")), ModuleFormat::CommonJs);
    }

    #[test]
    fn test_defaults_to_commonjs() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        let p = file.to_str().unwrap();
        assert_eq!(detect(p, Some("const a = 1;")), ModuleFormat::CommonJs);
        assert_eq!(detect(p, None), ModuleFormat::CommonJs);
    }
}
