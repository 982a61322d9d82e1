use std::path::{Path, PathBuf};

use crate::error::Result;

/// A word-list file found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the walked root directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

impl DiscoveredFile {
    /// File name without its extension.
    pub fn stem(&self) -> String {
        self.relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<String> {
        self.relative_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// Extensions picked up by the directory importer.
pub const WORD_LIST_EXTENSIONS: &[&str] = &["csv", "json"];

/// Recursively walk a directory and discover files with one of
/// `extensions` (compared without case).
///
/// Hidden files and directories (names starting with `.`) are skipped.
/// Results are sorted by relative path.
pub fn discover_files(root: &Path, extensions: &[&str]) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, extensions, true, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

/// Like [`discover_files`], but only looks at the top level of `dir`.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = dir.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, extensions, false, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    extensions: &[&str],
    recursive: bool,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                walk_dir(root, &entry.path(), extensions, recursive, results)?;
            }
        } else if file_type.is_symlink() {
            let Ok(resolved) = entry.path().canonicalize() else {
                continue; // broken link
            };
            if resolved.is_file() && has_extension(&resolved, extensions) {
                results.push(make_discovered(root, &entry.path(), &resolved)?);
            }
        } else if file_type.is_file() && has_extension(&entry.path(), extensions) {
            let abs = entry.path().canonicalize()?;
            results.push(make_discovered(root, &entry.path(), &abs)?);
        }
    }

    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: &Path,
) -> Result<DiscoveredFile> {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();
    let size = std::fs::metadata(absolute_path)?.len();

    Ok(DiscoveredFile {
        relative_path,
        absolute_path: absolute_path.to_path_buf(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn discovers_csv_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("高考.csv"), "a,b").unwrap();
        std::fs::write(tmp.path().join("gre.JSON"), "[]").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let files = discover_files(tmp.path(), WORD_LIST_EXTENSIONS).unwrap();
        assert_eq!(names(&files), vec!["gre.JSON", "高考.csv"]);
        assert_eq!(files[0].extension().as_deref(), Some("json"));
        assert_eq!(files[1].stem(), "高考");
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let hidden = tmp.path().join(".cache");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("a.csv"), "a").unwrap();
        std::fs::write(tmp.path().join(".b.csv"), "b").unwrap();
        std::fs::write(tmp.path().join("c.csv"), "c").unwrap();

        let files = discover_files(tmp.path(), &["csv"]).unwrap();
        assert_eq!(names(&files), vec!["c.csv"]);
    }

    #[test]
    fn recursion_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("deep.csv"), "d").unwrap();
        std::fs::write(tmp.path().join("top.csv"), "t").unwrap();

        let all = discover_files(tmp.path(), &["csv"]).unwrap();
        assert_eq!(names(&all), vec!["sub/deep.csv", "top.csv"]);

        let top = list_files(tmp.path(), &["csv"]).unwrap();
        assert_eq!(names(&top), vec!["top.csv"]);
    }

    #[test]
    fn records_file_size() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.csv"), "hello").unwrap();
        let files = list_files(tmp.path(), &["csv"]).unwrap();
        assert_eq!(files[0].size, 5);
        assert_eq!(files[0].file_name(), "a.csv");
    }

    #[test]
    fn empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_files(tmp.path(), WORD_LIST_EXTENSIONS).unwrap().is_empty());
    }
}
