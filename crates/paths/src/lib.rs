//! Centralised file-path validation, shared by the config loader and every
//! runtime action that opens a path named inside a plan (`payload`,
//! `match_file`, `response`, `externalvars`, `planinclude`, each
//! `txninclude`'s file).
//!
//! Validation is segment-aware rather than a raw substring search: a raw
//! `contains("..")` check over-rejects legitimate filenames like
//! `a..b.json` while still being trivially defeated by encoding tricks, so
//! walking `Path::components` is both more correct and more permissive.

use std::path::{Component, Path, PathBuf};

use errors::{EngineError, EngineResult};

/// Rejects any `..` component in `path`, then - if `base` is supplied -
/// resolves `path` against it and requires the result to stay inside
/// `base`. Returns the resolved path ready to open.
pub fn validate(path: &str, base: Option<&Path>) -> EngineResult<PathBuf> {
    let candidate = Path::new(path);
    if candidate.components().any(|c| c == Component::ParentDir) {
        return Err(EngineError::path_traversal(format!("path {path:?} contains a '..' segment")));
    }

    let Some(base) = base else {
        return Ok(candidate.to_path_buf());
    };

    let joined = if candidate.is_absolute() { candidate.to_path_buf() } else { base.join(candidate) };
    let resolved = normalize(&joined);
    let base = normalize(base);
    if !resolved.starts_with(&base) {
        return Err(EngineError::path_traversal(format!(
            "path {path:?} resolves outside base directory {}",
            base.display()
        )));
    }
    Ok(resolved)
}

/// Lexically collapses `.`/`..` components without touching the
/// filesystem - `base` and `path` may not exist yet (e.g. a response
/// fixture written by the test itself moments before launch).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            },
            Component::CurDir => {},
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_segment() {
        let err = validate("../secret.yaml", None).unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::PathTraversal);
    }

    #[test]
    fn rejects_parent_dir_segment_mid_path() {
        let err = validate("fixtures/../../etc/passwd", None).unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::PathTraversal);
    }

    #[test]
    fn permits_dotted_filename_without_base() {
        assert!(validate("a..b.json", None).is_ok());
    }

    #[test]
    fn stays_within_base_directory() {
        let base = Path::new("/plans/demo");
        let resolved = validate("fixtures/body.json", Some(base)).unwrap();
        assert_eq!(resolved, PathBuf::from("/plans/demo/fixtures/body.json"));
    }

    #[test]
    fn absolute_path_outside_base_is_rejected() {
        let base = Path::new("/plans/demo");
        let err = validate("/etc/passwd", Some(base)).unwrap_err();
        assert_eq!(err.code, errors::ErrorCode::PathTraversal);
    }
}
