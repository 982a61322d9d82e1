use std::collections::HashSet;

use crate::{
    error::Result,
    model::{Page, Word},
    vocab_db::VocabDb,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A prefix search over the word set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Prefix of the stored word text. Blank means no filter.
    pub keyword: Option<String>,
    /// Restrict results to members of this dictionary.
    pub dictionary_id: Option<u64>,
    /// Zero-based page index.
    pub page: usize,
    pub size: usize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            keyword: None,
            dictionary_id: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Execute a search, returning one page of words ordered by id.
///
/// The prefix match is case-sensitive and applied to the word as it was
/// first stored.
pub fn execute_search(db: &VocabDb, request: &SearchRequest) -> Result<Page<Word>> {
    let keyword = request
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let members: Option<HashSet<u64>> = match request.dictionary_id {
        Some(id) => Some(db.member_word_ids(id)?),
        None => None,
    };

    let matches = db.scan_words(|word| {
        keyword.is_none_or(|k| word.word.starts_with(k))
            && members.as_ref().is_none_or(|m| m.contains(&word.id))
    })?;

    let offset = request.page.saturating_mul(request.size);
    Ok(Page::from_offset(matches, request.page, request.size, offset))
}

/// Format a page of words for terminal output.
pub fn format_human(page: &Page<Word>) {
    if page.items.is_empty() {
        println!("No words found.");
        return;
    }

    for word in &page.items {
        let phonetic = word.phonetic.as_deref().unwrap_or("");
        println!("{:>6}  {} {} [{}]", word.id, word.word, phonetic, word.difficulty);
        if let Some(definition) = &word.definition {
            println!("        {definition}");
        }
        if let Some(translation) = &word.translation {
            println!("        {translation}");
        }
    }
    println!(
        "\npage {} of {} ({} word(s))",
        page.page,
        page.total_pages(),
        page.total
    );
}

/// Format a page of words as JSON on stdout.
pub fn format_json(page: &Page<Word>) -> Result<()> {
    println!("{}", serde_json::to_string(page)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionaries::{create_dictionary, link_batch, save_bare_word_if_absent};

    fn setup() -> (tempfile::TempDir, VocabDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VocabDb::open(&tmp.path().join("vocab.redb")).unwrap();
        for text in ["apple", "application", "Apply", "banana", "apricot"] {
            save_bare_word_if_absent(&db, text).unwrap();
        }
        (tmp, db)
    }

    fn words(page: &Page<Word>) -> Vec<&str> {
        page.items.iter().map(|w| w.word.as_str()).collect()
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let (_tmp, db) = setup();
        let request = SearchRequest {
            keyword: Some("app".into()),
            ..SearchRequest::default()
        };
        let page = execute_search(&db, &request).unwrap();
        assert_eq!(words(&page), vec!["apple", "application"]);
    }

    #[test]
    fn blank_keyword_matches_everything() {
        let (_tmp, db) = setup();
        let request = SearchRequest {
            keyword: Some("   ".into()),
            ..SearchRequest::default()
        };
        let page = execute_search(&db, &request).unwrap();
        assert_eq!(page.total, 5);
    }

    #[test]
    fn keyword_is_trimmed() {
        let (_tmp, db) = setup();
        let request = SearchRequest {
            keyword: Some(" ban ".into()),
            ..SearchRequest::default()
        };
        assert_eq!(words(&execute_search(&db, &request).unwrap()), vec!["banana"]);
    }

    #[test]
    fn pages_are_zero_based() {
        let (_tmp, db) = setup();
        let request = SearchRequest {
            page: 1,
            size: 2,
            ..SearchRequest::default()
        };
        let page = execute_search(&db, &request).unwrap();
        assert_eq!(words(&page), vec!["Apply", "banana"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn dictionary_filter_restricts_to_members() {
        let (_tmp, db) = setup();
        let d = create_dictionary(&db, "fruit", None).unwrap();
        let apple = db.find_word("apple").unwrap().unwrap();
        let banana = db.find_word("banana").unwrap().unwrap();
        link_batch(&db, d.id, &[apple.id, banana.id]).unwrap();

        let request = SearchRequest {
            keyword: Some("a".into()),
            dictionary_id: Some(d.id),
            ..SearchRequest::default()
        };
        assert_eq!(words(&execute_search(&db, &request).unwrap()), vec!["apple"]);
    }
}
