use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DATA_DIR_ENV_VAR: &str = "WORDHOARD_DATA_DIR";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The WORDHOARD_DATA_DIR environment variable, when non-empty
    /// 3. The XDG data directory (~/.local/share/wordhoard/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(DATA_DIR_ENV_VAR).map(PathBuf::from);
        Self::resolve_with(explicit, from_env)
    }

    fn resolve_with(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Result<Self> {
        let root = match (explicit, from_env) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) if !path.as_os_str().is_empty() => path,
            _ => xdg::BaseDirectories::with_prefix("wordhoard")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?,
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Words, dictionaries, memberships, catalogue and settings.
    pub fn vocab_db(&self) -> PathBuf {
        self.root.join("vocab.redb")
    }

    pub fn graph_db(&self) -> PathBuf {
        self.root.join("graph.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.vocab_db(), tmp.path().join("vocab.redb"));
        assert_eq!(dir.graph_db(), tmp.path().join("graph.redb"));
    }

    #[test]
    fn env_directory_is_used_without_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let from_env = tmp.path().join("from-env");
        let dir = DataDir::resolve_with(None, Some(from_env.clone())).unwrap();

        assert_eq!(dir.root(), from_env);
        assert!(from_env.is_dir());
    }

    #[test]
    fn explicit_path_wins_over_env() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("explicit");
        let from_env = tmp.path().join("from-env");
        let dir = DataDir::resolve_with(Some(&explicit), Some(from_env.clone())).unwrap();

        assert_eq!(dir.root(), explicit);
        assert!(!from_env.exists());
    }

    #[test]
    fn missing_explicit_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();

        assert!(nested.is_dir());
        assert_eq!(dir.root(), nested);
    }
}
