//! Batch reconciliation of a word list into the store.
//!
//! Each distinct word is upserted into the global word set in its own
//! transaction, then every successfully upserted word is linked to the
//! target dictionary in a single membership batch.

use std::collections::{HashMap, HashSet, hash_map};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    entry::WordEntry,
    error::{Error, Result},
    model::{Word, normalize},
    vocab_db::VocabDb,
};

/// The persistence operations reconciliation needs.
pub trait WordStore {
    fn find_word(&self, text: &str) -> Result<Option<Word>>;
    fn insert_word(&self, word: &Word) -> Result<Word>;
    fn update_word(&self, word: &Word) -> Result<Word>;
    fn member_word_ids(&self, dictionary_id: u64) -> Result<HashSet<u64>>;
    fn insert_memberships(
        &self,
        dictionary_id: u64,
        word_ids: &[u64],
    ) -> Result<usize>;
}

impl WordStore for VocabDb {
    fn find_word(&self, text: &str) -> Result<Option<Word>> {
        VocabDb::find_word(self, text)
    }

    fn insert_word(&self, word: &Word) -> Result<Word> {
        VocabDb::insert_word(self, word)
    }

    fn update_word(&self, word: &Word) -> Result<Word> {
        VocabDb::update_word(self, word)
    }

    fn member_word_ids(&self, dictionary_id: u64) -> Result<HashSet<u64>> {
        VocabDb::member_word_ids(self, dictionary_id)
    }

    fn insert_memberships(
        &self,
        dictionary_id: u64,
        word_ids: &[u64],
    ) -> Result<usize> {
        VocabDb::insert_memberships(self, dictionary_id, word_ids)
    }
}

/// Counts reported by one reconciliation call.
///
/// `existed + created + failed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Distinct non-blank words in the input.
    pub total: usize,
    /// Words that were already in the store.
    pub existed: usize,
    /// Words created by this call.
    pub created: usize,
    /// Memberships created by this call.
    pub added: usize,
    /// Words whose upsert failed.
    pub failed: usize,
}

impl Summary {
    pub fn absorb(&mut self, other: Summary) {
        self.total += other.total;
        self.existed += other.existed;
        self.created += other.created;
        self.added += other.added;
        self.failed += other.failed;
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} words: {} existing, {} new, {} linked, {} failed",
            self.total, self.existed, self.created, self.added, self.failed
        )
    }
}

/// Word cache shared by every reconciliation call of one import run.
///
/// Keyed by normalized word text. Create one at the start of a run and
/// drop it at the end.
#[derive(Debug, Default)]
pub struct ImportContext {
    words: HashMap<String, Word>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Word> {
        self.words.get(key)
    }

    pub fn remember(&mut self, word: Word) {
        self.words.insert(word.key(), word);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Reconcile `entries` into the word set and link them to `dictionary_id`.
///
/// Blank words are dropped. Duplicate words (ignoring case and
/// surrounding whitespace) collapse to the last occurrence, kept at the
/// position of the first. A failure on one word is logged and counted,
/// and processing continues. Memberships that already exist when the
/// batch is written are skipped. A storage failure of the membership
/// batch is returned, leaving the upserted words committed.
///
/// The dictionary id is not checked and its word count is not touched.
pub fn process_word_list<S: WordStore + ?Sized>(
    store: &S,
    dictionary_id: u64,
    entries: &[WordEntry],
    mut ctx: Option<&mut ImportContext>,
) -> Result<Summary> {
    if entries.is_empty() {
        return Err(Error::InvalidInput("word list is empty".into()));
    }

    let unique = dedup_entries(entries);
    let mut summary = Summary {
        total: unique.len(),
        ..Summary::default()
    };

    let mut word_ids = Vec::with_capacity(unique.len());
    for (text, entry) in unique {
        match upsert(store, text, entry, ctx.as_deref_mut()) {
            Ok((word, true)) => {
                summary.existed += 1;
                word_ids.push(word.id);
            }
            Ok((word, false)) => {
                summary.created += 1;
                word_ids.push(word.id);
            }
            Err(e) => {
                summary.failed += 1;
                warn!(word = text, error = %e, "failed to reconcile word");
            }
        }
    }

    let members = store.member_word_ids(dictionary_id)?;
    let mut seen = HashSet::new();
    let fresh: Vec<u64> = word_ids
        .into_iter()
        .filter(|id| !members.contains(id) && seen.insert(*id))
        .collect();
    summary.added = store.insert_memberships(dictionary_id, &fresh)?;

    debug!(dictionary_id, %summary, "reconciled word list");
    Ok(summary)
}

/// Upsert a single entry without touching any dictionary. Returns the
/// stored word and whether it existed before.
pub fn upsert_entry<S: WordStore + ?Sized>(
    store: &S,
    entry: &WordEntry,
) -> Result<(Word, bool)> {
    let text = entry
        .trimmed_word()
        .ok_or_else(|| Error::InvalidInput("word must not be blank".into()))?;
    upsert(store, text, entry, None)
}

/// Trimmed word text paired with the winning entry, in first-seen order.
fn dedup_entries(entries: &[WordEntry]) -> Vec<(&str, &WordEntry)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut ordered: Vec<(&str, &WordEntry)> = Vec::new();

    for entry in entries {
        let Some(text) = entry.trimmed_word() else {
            continue;
        };
        match positions.entry(normalize(text)) {
            hash_map::Entry::Occupied(slot) => {
                ordered[*slot.get()] = (text, entry);
            }
            hash_map::Entry::Vacant(slot) => {
                slot.insert(ordered.len());
                ordered.push((text, entry));
            }
        }
    }
    ordered
}

/// Returns the stored word and whether it existed before.
fn upsert<S: WordStore + ?Sized>(
    store: &S,
    text: &str,
    entry: &WordEntry,
    ctx: Option<&mut ImportContext>,
) -> Result<(Word, bool)> {
    let cached = ctx
        .as_ref()
        .and_then(|c| c.get(&normalize(text)))
        .cloned();
    let found = match cached {
        Some(word) => Some(word),
        None => store.find_word(text)?,
    };

    let (word, existed) = match found {
        Some(mut word) => {
            entry.apply_to(&mut word);
            (store.update_word(&word)?, true)
        }
        None => {
            let mut word = Word::new(text);
            entry.apply_to(&mut word);
            (store.insert_word(&word)?, false)
        }
    };

    if let Some(ctx) = ctx {
        ctx.remember(word.clone());
    }
    Ok((word, existed))
}
