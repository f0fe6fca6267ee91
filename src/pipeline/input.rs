//! Input resolution: validate the user-supplied PDF path.
//!
//! We check existence, read permission and the `%PDF` magic bytes up front
//! so callers get a meaningful error instead of a renderer or partitioner
//! failure deep inside the run.

use crate::error::ParseError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(path: &Path) -> Result<PathBuf, ParseError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ParseError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ParseError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ParseError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ParseError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Where the JSON output for `input` goes: `<folder>/<stem>.json`, with
/// `folder` defaulting to the input's own directory.
pub fn output_path_for(input: &Path, save_folder: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "document".into());
    let mut file_name = stem;
    file_name.push(".json");

    let folder = match save_folder {
        Some(f) => f.to_path_buf(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    folder.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = resolve_input(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_non_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04zip").unwrap();
        let err = resolve_input(f.path()).unwrap_err();
        assert!(matches!(err, ParseError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn accepts_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_input(f.path()).unwrap(), f.path());
    }

    #[test]
    fn output_path_defaults_to_input_dir() {
        let out = output_path_for(Path::new("/data/in/report.v2.pdf"), None);
        assert_eq!(out, PathBuf::from("/data/in/report.v2.json"));
    }

    #[test]
    fn output_path_uses_save_folder() {
        let out = output_path_for(Path::new("/data/in/report.pdf"), Some(Path::new("/tmp/out")));
        assert_eq!(out, PathBuf::from("/tmp/out/report.json"));
    }

    #[test]
    fn output_path_for_bare_file_name() {
        let out = output_path_for(Path::new("report.pdf"), None);
        assert_eq!(out, PathBuf::from("report.json"));
    }
}
