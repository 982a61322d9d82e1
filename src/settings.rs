//! Persisted settings with built-in defaults.

use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    vocab_db::VocabDb,
};

/// Directory scanned by `import`.
pub const BOOKS_DIR: &str = "books_dir";
/// Directory scanned by `catalogue register`.
pub const TRANSLATION_DIR: &str = "translation_dir";

/// Every known key with its default value.
pub const DEFAULTS: &[(&str, &str)] = &[
    (BOOKS_DIR, "/app/books"),
    (TRANSLATION_DIR, "/opt/translation"),
];

fn default_for(key: &str) -> Result<&'static str> {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| Error::Config(format!("unknown setting '{key}'")))
}

pub fn get(db: &VocabDb, key: &str) -> Result<String> {
    let default = default_for(key)?;
    db.get_setting_or(key, default)
}

pub fn set(db: &VocabDb, key: &str, value: &str) -> Result<()> {
    default_for(key)?;
    if value.trim().is_empty() {
        return Err(Error::Config(format!("setting '{key}' must not be blank")));
    }
    db.set_setting(key, value.trim())
}

/// All settings in declaration order, with defaults filled in.
pub fn all(db: &VocabDb) -> Result<Vec<(&'static str, String)>> {
    DEFAULTS
        .iter()
        .map(|(key, default)| Ok((*key, db.get_setting_or(key, default)?)))
        .collect()
}

/// A directory from the command line, or else from the setting `key`.
pub fn resolve_dir(db: &VocabDb, key: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(PathBuf::from(get(db, key)?)),
    }
}
