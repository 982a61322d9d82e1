use serde::Serialize;

use crate::{data_dir::DataDir, error::Result, graph_db::GraphDb, vocab_db::VocabDb};

/// Store-wide counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub data_dir: String,
    pub words: usize,
    pub dictionaries: usize,
    pub memberships: usize,
    pub vocabulary_files: usize,
    pub graph_nodes: usize,
    pub graph_categories: usize,
}

pub fn collect(data_dir: &DataDir, vocab: &VocabDb, graph: &GraphDb) -> Result<Status> {
    Ok(Status {
        data_dir: data_dir.root().display().to_string(),
        words: vocab.count_words()?,
        dictionaries: vocab.list_dictionaries()?.len(),
        memberships: vocab.count_memberships()?,
        vocabulary_files: vocab.list_vocabulary_files()?.len(),
        graph_nodes: graph.node_count()?,
        graph_categories: graph.category_count()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dictionaries, entry::WordEntry, reconcile::process_word_list};

    #[test]
    fn counts_reflect_store_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let vocab = VocabDb::open(&data_dir.vocab_db()).unwrap();
        let graph = GraphDb::open(&data_dir.graph_db()).unwrap();

        let d = dictionaries::create_dictionary(&vocab, "d", None).unwrap();
        let entries = vec![WordEntry::Bare("a".into()), WordEntry::Bare("b".into())];
        process_word_list(&vocab, d.id, &entries, None).unwrap();

        let status = collect(&data_dir, &vocab, &graph).unwrap();
        assert_eq!(status.words, 2);
        assert_eq!(status.dictionaries, 1);
        assert_eq!(status.memberships, 2);
        assert_eq!(status.vocabulary_files, 0);
        assert_eq!(status.graph_nodes, 0);
        assert_eq!(status.data_dir, tmp.path().display().to_string());
    }
}
