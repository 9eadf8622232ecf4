//! File utility functions for listing integer-named directory entries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Parses an entry name such as `34` or `0034` into its integer value.
pub fn parse_index(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Returns `(index, path)` for every subdirectory of `dir` whose name is an integer,
/// sorted by index.
pub fn numeric_subdirs(dir: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(index) = entry.file_name().to_str().and_then(parse_index) {
            result.push((index, path));
        }
    }
    result.sort_by_key(|(index, _)| *index);
    Ok(result)
}

/// Returns `(index, path)` for every file in `dir` named `<integer>.<extension>`,
/// sorted by index. The extension is matched case-insensitively.
pub fn numeric_files(dir: &Path, extension: &str) -> io::Result<Vec<(u32, PathBuf)>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext_matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !ext_matches {
            continue;
        }
        if let Some(index) = path.file_stem().and_then(|s| s.to_str()).and_then(parse_index) {
            result.push((index, path));
        }
    }
    result.sort_by_key(|(index, _)| *index);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_index_accepts_zero_padding() {
        assert_eq!(parse_index("0034"), Some(34));
        assert_eq!(parse_index("7"), Some(7));
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("12a"), None);
    }

    #[test]
    fn numeric_subdirs_skips_files_and_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2")).unwrap();
        fs::create_dir(dir.path().join("0010")).unwrap();
        fs::create_dir(dir.path().join("logs")).unwrap();
        fs::write(dir.path().join("3"), b"").unwrap();

        let indices: Vec<u32> = numeric_subdirs(dir.path())
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(indices, vec![2, 10]);
    }

    #[test]
    fn numeric_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.png"), b"").unwrap();
        fs::write(dir.path().join("0.PNG"), b"").unwrap();
        fs::write(dir.path().join("2.jpg"), b"").unwrap();
        fs::write(dir.path().join("blank.png"), b"").unwrap();

        let indices: Vec<u32> = numeric_files(dir.path(), "png")
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(numeric_subdirs(Path::new("/nonexistent/tiles")).is_err());
    }
}
