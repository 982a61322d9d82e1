//! Catalogue of vocabulary files found in the translation directory.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    classify::classify,
    error::Result,
    model::VocabularyFile,
    vocab_db::VocabDb,
    walker::list_files,
};

/// Register every top-level `.csv` file of `dir` not yet in the catalogue.
/// Returns how many were added.
pub fn register_files(db: &VocabDb, dir: &Path) -> Result<usize> {
    let mut added = 0;
    for file in list_files(dir, &["csv"])? {
        let file_name = file.file_name();
        if db.vocabulary_file_exists(&file_name)? {
            debug!(file_name, "already catalogued");
            continue;
        }
        db.insert_vocabulary_file(&VocabularyFile {
            id: 0,
            category: classify(&file_name).label().to_string(),
            file_path: file.absolute_path.to_string_lossy().to_string(),
            file_size: file.size,
            file_name,
            created_at: 0,
            updated_at: 0,
        })?;
        added += 1;
    }
    info!(added, dir = %dir.display(), "registered vocabulary files");
    Ok(added)
}

pub fn files_by_category(db: &VocabDb, label: &str) -> Result<Vec<VocabularyFile>> {
    Ok(db
        .list_vocabulary_files()?
        .into_iter()
        .filter(|f| f.category == label)
        .collect())
}
