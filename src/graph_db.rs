//! Graph mirror of the vocabulary-file catalogue.
//!
//! Each catalogue record becomes a file node keyed by file name, linked
//! through a `HAS_CATEGORY` edge to a category node of type
//! `"vocabulary"`. The mirror lives in its own redb file so it can be
//! rebuilt or cleared without touching the vocabulary store.

use std::{collections::BTreeSet, path::Path};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    model::{VocabularyFile, unix_now},
};

/// File name -> encoded [`FileNode`].
const FILE_NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("file_nodes");
/// Category label -> node type.
const CATEGORY_NODES: TableDefinition<&str, &str> =
    TableDefinition::new("category_nodes");
/// File name -> category label.
const HAS_CATEGORY: TableDefinition<&str, &str> = TableDefinition::new("has_category");

pub const CATEGORY_NODE_TYPE: &str = "vocabulary";

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub category: String,
    pub synced_at: u64,
}

pub struct GraphDb {
    db: Database,
}

impl GraphDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        let txn = db.begin_write()?;
        txn.open_table(FILE_NODES)?;
        txn.open_table(CATEGORY_NODES)?;
        txn.open_table(HAS_CATEGORY)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Mirror catalogue records into the graph. Each record is written in
    /// its own transaction; a failing record is logged and skipped.
    /// Returns how many records were mirrored.
    pub fn sync(&self, files: &[VocabularyFile]) -> Result<usize> {
        let mut synced = 0;
        for (idx, file) in files.iter().enumerate() {
            match self.upsert_file(file) {
                Ok(()) => synced += 1,
                Err(e) => {
                    warn!(file_name = %file.file_name, error = %e, "failed to mirror vocabulary file");
                }
            }
            if (idx + 1) % PROGRESS_EVERY == 0 {
                info!(processed = idx + 1, total = files.len(), "graph sync progress");
            }
        }
        info!(synced, total = files.len(), "graph sync finished");
        Ok(synced)
    }

    /// Upsert one file node, its category node and the edge between them.
    pub fn upsert_file(&self, file: &VocabularyFile) -> Result<()> {
        let file_name = file.file_name.trim();
        let category = file.category.trim();
        if file_name.is_empty() || category.is_empty() {
            return Err(Error::InvalidInput(format!(
                "vocabulary file {} has a blank name or category",
                file.id
            )));
        }

        let node = FileNode {
            file_name: file_name.to_string(),
            file_path: file.file_path.clone(),
            file_size: file.file_size,
            category: category.to_string(),
            synced_at: unix_now(),
        };
        let encoded = serde_json::to_vec(&node)?;

        let txn = self.db.begin_write()?;
        {
            let mut nodes = txn.open_table(FILE_NODES)?;
            nodes.insert(file_name, encoded.as_slice())?;
            let mut categories = txn.open_table(CATEGORY_NODES)?;
            categories.insert(category, CATEGORY_NODE_TYPE)?;
            let mut edges = txn.open_table(HAS_CATEGORY)?;
            edges.insert(file_name, category)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_file(&self, file_name: &str) -> Result<Option<FileNode>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FILE_NODES)?;
        Ok(table
            .get(file_name)?
            .map(|v| serde_json::from_slice(v.value()))
            .transpose()?)
    }

    /// Category linked to a file node.
    pub fn category_of(&self, file_name: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(HAS_CATEGORY)?;
        Ok(table.get(file_name)?.map(|v| v.value().to_string()))
    }

    /// File names linked to a category, sorted.
    pub fn files_in_category(&self, category: &str) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(HAS_CATEGORY)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            if v.value() == category {
                result.push(k.value().to_string());
            }
        }
        Ok(result)
    }

    pub fn categories(&self) -> Result<BTreeSet<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CATEGORY_NODES)?;
        let mut result = BTreeSet::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.insert(k.value().to_string());
        }
        Ok(result)
    }

    /// Number of file nodes.
    pub fn node_count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FILE_NODES)?;
        Ok(table.iter()?.count())
    }

    pub fn category_count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CATEGORY_NODES)?;
        Ok(table.iter()?.count())
    }

    /// Delete every node and edge.
    pub fn clear(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(HAS_CATEGORY)?;
        txn.delete_table(CATEGORY_NODES)?;
        txn.delete_table(FILE_NODES)?;
        txn.open_table(FILE_NODES)?;
        txn.open_table(CATEGORY_NODES)?;
        txn.open_table(HAS_CATEGORY)?;
        txn.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for GraphDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDb").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, GraphDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = GraphDb::open(&tmp.path().join("graph.redb")).unwrap();
        (tmp, db)
    }

    fn file(id: u64, name: &str, category: &str) -> VocabularyFile {
        VocabularyFile {
            id,
            file_name: name.to_string(),
            file_path: format!("/opt/translation/{name}"),
            file_size: 10,
            category: category.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn sync_creates_nodes_and_edges() {
        let (_tmp, db) = test_db();
        let files = vec![
            file(1, "gre.csv", "GRE"),
            file(2, "gre2.csv", "GRE"),
            file(3, "高考.csv", "高考"),
        ];

        assert_eq!(db.sync(&files).unwrap(), 3);
        assert_eq!(db.node_count().unwrap(), 3);
        assert_eq!(db.category_count().unwrap(), 2);
        assert_eq!(db.category_of("高考.csv").unwrap().as_deref(), Some("高考"));
        assert_eq!(
            db.files_in_category("GRE").unwrap(),
            vec!["gre.csv", "gre2.csv"]
        );
        assert_eq!(db.get_file("gre.csv").unwrap().unwrap().file_size, 10);
    }

    #[test]
    fn sync_is_an_upsert() {
        let (_tmp, db) = test_db();
        db.sync(&[file(1, "a.csv", "GRE")]).unwrap();
        db.sync(&[file(1, "a.csv", "SAT")]).unwrap();

        assert_eq!(db.node_count().unwrap(), 1);
        assert_eq!(db.category_of("a.csv").unwrap().as_deref(), Some("SAT"));
        assert!(db.files_in_category("GRE").unwrap().is_empty());
    }

    #[test]
    fn bad_records_are_skipped() {
        let (_tmp, db) = test_db();
        let files = vec![file(1, "ok.csv", "GRE"), file(2, "  ", "GRE"), file(3, "x.csv", "")];
        assert_eq!(db.sync(&files).unwrap(), 1);
        assert_eq!(db.node_count().unwrap(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let (_tmp, db) = test_db();
        db.sync(&[file(1, "a.csv", "GRE")]).unwrap();
        db.clear().unwrap();
        assert_eq!(db.node_count().unwrap(), 0);
        assert_eq!(db.category_count().unwrap(), 0);
        assert!(db.category_of("a.csv").unwrap().is_none());
    }
}
