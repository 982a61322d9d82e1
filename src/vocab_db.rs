use std::{collections::HashSet, path::Path};

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    TableDefinition,
    WriteTransaction,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::{Error, Result},
    model::{
        CreationType,
        Dictionary,
        Membership,
        VocabularyFile,
        Word,
        normalize,
        unix_now,
    },
};

const WORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("words");
/// Unique index: normalized word text -> word id.
const WORD_KEYS: TableDefinition<&str, u64> = TableDefinition::new("word_keys");
const DICTIONARIES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("dictionaries");
/// Unique index: dictionary name -> dictionary id.
const DICTIONARY_NAMES: TableDefinition<&str, u64> =
    TableDefinition::new("dictionary_names");
/// (dictionary_id, word_id) -> created_at.
const MEMBERSHIPS: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("memberships");
/// (word_id, dictionary_id) -> created_at, mirror of MEMBERSHIPS.
const WORD_MEMBERSHIPS: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("word_memberships");
const VOCABULARY_FILES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("vocabulary_files");
const VOCABULARY_FILE_NAMES: TableDefinition<&str, u64> =
    TableDefinition::new("vocabulary_file_names");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

const WORD_SEQUENCE: &str = "words";
const DICTIONARY_SEQUENCE: &str = "dictionaries";
const VOCABULARY_FILE_SEQUENCE: &str = "vocabulary_files";

/// The relational side of the vocabulary store: words, dictionaries,
/// memberships, the vocabulary-file catalogue and settings.
///
/// Every public method runs in its own transaction, so each call is
/// committed independently.
pub struct VocabDb {
    db: Database,
}

impl VocabDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(WORDS)?;
        txn.open_table(WORD_KEYS)?;
        txn.open_table(DICTIONARIES)?;
        txn.open_table(DICTIONARY_NAMES)?;
        txn.open_table(MEMBERSHIPS)?;
        txn.open_table(WORD_MEMBERSHIPS)?;
        txn.open_table(VOCABULARY_FILES)?;
        txn.open_table(VOCABULARY_FILE_NAMES)?;
        txn.open_table(SEQUENCES)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Words --

    /// Look a word up by its business key, regardless of casing.
    pub fn find_word(&self, text: &str) -> Result<Option<Word>> {
        let key = normalize(text);
        let txn = self.db.begin_read()?;
        let keys = txn.open_table(WORD_KEYS)?;
        let Some(id) = keys.get(key.as_str())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let words = txn.open_table(WORDS)?;
        words
            .get(id)?
            .map(|v| decode(v.value()))
            .transpose()
    }

    pub fn get_word(&self, id: u64) -> Result<Option<Word>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORDS)?;
        table.get(id)?.map(|v| decode(v.value())).transpose()
    }

    /// Insert a new word, assigning its id and timestamps.
    ///
    /// Fails with [`Error::Conflict`] when another word already owns the
    /// same normalized text.
    pub fn insert_word(&self, word: &Word) -> Result<Word> {
        let key = word.key();
        if key.is_empty() {
            return Err(Error::InvalidInput("word text is blank".into()));
        }

        let txn = self.db.begin_write()?;
        let stored = {
            let mut keys = txn.open_table(WORD_KEYS)?;
            if keys.get(key.as_str())?.is_some() {
                return Err(Error::Conflict {
                    kind: "word",
                    name: word.word.clone(),
                });
            }

            let now = unix_now();
            let mut stored = word.clone();
            stored.id = next_id(&txn, WORD_SEQUENCE)?;
            stored.created_at = now;
            stored.updated_at = now;

            keys.insert(key.as_str(), stored.id)?;
            let mut words = txn.open_table(WORDS)?;
            words.insert(stored.id, encode(&stored)?.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    /// Overwrite an existing word. Re-keys the unique index when the text
    /// changed.
    pub fn update_word(&self, word: &Word) -> Result<Word> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut words = txn.open_table(WORDS)?;
            let previous: Word = match words.get(word.id)? {
                Some(v) => decode(v.value())?,
                None => {
                    return Err(Error::NotFound {
                        kind: "word",
                        name: word.id.to_string(),
                    });
                }
            };

            let old_key = previous.key();
            let new_key = word.key();
            if old_key != new_key {
                if new_key.is_empty() {
                    return Err(Error::InvalidInput(
                        "word text is blank".into(),
                    ));
                }
                let mut keys = txn.open_table(WORD_KEYS)?;
                if keys.get(new_key.as_str())?.is_some() {
                    return Err(Error::Conflict {
                        kind: "word",
                        name: word.word.clone(),
                    });
                }
                keys.remove(old_key.as_str())?;
                keys.insert(new_key.as_str(), word.id)?;
            }

            let mut stored = word.clone();
            stored.created_at = previous.created_at;
            stored.updated_at = unix_now();
            words.insert(stored.id, encode(&stored)?.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    /// Insert when `word.id` is zero, otherwise update.
    pub fn save_word(&self, word: &Word) -> Result<Word> {
        if word.id == 0 {
            self.insert_word(word)
        } else {
            self.update_word(word)
        }
    }

    /// All words ordered by id.
    pub fn list_words(&self) -> Result<Vec<Word>> {
        self.scan_words(|_| true)
    }

    pub fn words_by_difficulty(&self, difficulty: u8) -> Result<Vec<Word>> {
        self.scan_words(|w| w.difficulty == difficulty)
    }

    /// Words whose stored text starts with `prefix` (case-sensitive).
    pub fn words_with_prefix(&self, prefix: &str) -> Result<Vec<Word>> {
        self.scan_words(|w| w.word.starts_with(prefix))
    }

    pub fn scan_words(
        &self,
        mut keep: impl FnMut(&Word) -> bool,
    ) -> Result<Vec<Word>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORDS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_k, v) = entry?;
            let word: Word = decode(v.value())?;
            if keep(&word) {
                result.push(word);
            }
        }
        Ok(result)
    }

    pub fn count_words(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORDS)?;
        Ok(table.iter()?.count())
    }

    /// Delete every membership, dictionary and word. The catalogue and
    /// settings are kept.
    pub fn wipe_all(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        clear_pair_table(&txn, MEMBERSHIPS)?;
        clear_pair_table(&txn, WORD_MEMBERSHIPS)?;
        clear_id_table(&txn, DICTIONARIES)?;
        clear_name_table(&txn, DICTIONARY_NAMES)?;
        clear_id_table(&txn, WORDS)?;
        clear_name_table(&txn, WORD_KEYS)?;
        txn.commit()?;
        Ok(())
    }

    // -- Dictionaries --

    /// Insert a new dictionary. Names are globally unique.
    pub fn insert_dictionary(&self, dictionary: &Dictionary) -> Result<Dictionary> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut names = txn.open_table(DICTIONARY_NAMES)?;
            if names.get(dictionary.name.as_str())?.is_some() {
                return Err(Error::Conflict {
                    kind: "dictionary",
                    name: dictionary.name.clone(),
                });
            }

            let now = unix_now();
            let mut stored = dictionary.clone();
            stored.id = next_id(&txn, DICTIONARY_SEQUENCE)?;
            stored.created_at = now;
            stored.updated_at = now;

            names.insert(stored.name.as_str(), stored.id)?;
            let mut table = txn.open_table(DICTIONARIES)?;
            table.insert(stored.id, encode(&stored)?.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    pub fn get_dictionary(&self, id: u64) -> Result<Option<Dictionary>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DICTIONARIES)?;
        table.get(id)?.map(|v| decode(v.value())).transpose()
    }

    pub fn find_dictionary(&self, name: &str) -> Result<Option<Dictionary>> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(DICTIONARY_NAMES)?;
        let Some(id) = names.get(name)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let table = txn.open_table(DICTIONARIES)?;
        table.get(id)?.map(|v| decode(v.value())).transpose()
    }

    /// All dictionaries ordered by id.
    pub fn list_dictionaries(&self) -> Result<Vec<Dictionary>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DICTIONARIES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_k, v) = entry?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }

    /// Overwrite an existing dictionary, keeping the name index in sync.
    pub fn update_dictionary(&self, dictionary: &Dictionary) -> Result<Dictionary> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut table = txn.open_table(DICTIONARIES)?;
            let previous: Dictionary = match table.get(dictionary.id)? {
                Some(v) => decode(v.value())?,
                None => {
                    return Err(Error::NotFound {
                        kind: "dictionary",
                        name: dictionary.id.to_string(),
                    });
                }
            };

            if previous.name != dictionary.name {
                let mut names = txn.open_table(DICTIONARY_NAMES)?;
                if names.get(dictionary.name.as_str())?.is_some() {
                    return Err(Error::Conflict {
                        kind: "dictionary",
                        name: dictionary.name.clone(),
                    });
                }
                names.remove(previous.name.as_str())?;
                names.insert(dictionary.name.as_str(), dictionary.id)?;
            }

            let mut stored = dictionary.clone();
            stored.created_at = previous.created_at;
            stored.updated_at = unix_now();
            table.insert(stored.id, encode(&stored)?.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    /// Remove one dictionary and its memberships. Returns whether it
    /// existed.
    pub fn remove_dictionary(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(DICTIONARIES)?;
            let previous: Option<Dictionary> =
                table.remove(id)?.map(|v| decode(v.value())).transpose()?;
            match previous {
                Some(dictionary) => {
                    let mut names = txn.open_table(DICTIONARY_NAMES)?;
                    names.remove(dictionary.name.as_str())?;
                    remove_members_of(&txn, id)?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Remove every dictionary with the given creation type, with their
    /// memberships. Returns how many were removed.
    pub fn remove_dictionaries_by_type(
        &self,
        creation_type: CreationType,
    ) -> Result<usize> {
        let doomed: Vec<Dictionary> = self
            .list_dictionaries()?
            .into_iter()
            .filter(|d| d.creation_type == creation_type)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DICTIONARIES)?;
            let mut names = txn.open_table(DICTIONARY_NAMES)?;
            for dictionary in &doomed {
                table.remove(dictionary.id)?;
                names.remove(dictionary.name.as_str())?;
            }
        }
        for dictionary in &doomed {
            remove_members_of(&txn, dictionary.id)?;
        }
        txn.commit()?;
        Ok(doomed.len())
    }

    /// Remove all dictionaries and all memberships.
    pub fn remove_all_dictionaries(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        clear_pair_table(&txn, MEMBERSHIPS)?;
        clear_pair_table(&txn, WORD_MEMBERSHIPS)?;
        clear_id_table(&txn, DICTIONARIES)?;
        clear_name_table(&txn, DICTIONARY_NAMES)?;
        txn.commit()?;
        Ok(())
    }

    // -- Memberships --

    pub fn get_membership(
        &self,
        dictionary_id: u64,
        word_id: u64,
    ) -> Result<Option<Membership>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MEMBERSHIPS)?;
        Ok(table
            .get((dictionary_id, word_id))?
            .map(|v| Membership {
                dictionary_id,
                word_id,
                created_at: v.value(),
            }))
    }

    pub fn memberships_of_dictionary(
        &self,
        dictionary_id: u64,
    ) -> Result<Vec<Membership>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MEMBERSHIPS)?;
        let mut result = Vec::new();
        for entry in table.range((dictionary_id, 0)..=(dictionary_id, u64::MAX))? {
            let (k, v) = entry?;
            let (dictionary_id, word_id) = k.value();
            result.push(Membership {
                dictionary_id,
                word_id,
                created_at: v.value(),
            });
        }
        Ok(result)
    }

    pub fn memberships_of_word(&self, word_id: u64) -> Result<Vec<Membership>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORD_MEMBERSHIPS)?;
        let mut result = Vec::new();
        for entry in table.range((word_id, 0)..=(word_id, u64::MAX))? {
            let (k, v) = entry?;
            let (word_id, dictionary_id) = k.value();
            result.push(Membership {
                dictionary_id,
                word_id,
                created_at: v.value(),
            });
        }
        Ok(result)
    }

    pub fn member_word_ids(&self, dictionary_id: u64) -> Result<HashSet<u64>> {
        Ok(self
            .memberships_of_dictionary(dictionary_id)?
            .into_iter()
            .map(|m| m.word_id)
            .collect())
    }

    /// Insert memberships for `word_ids` in a single transaction.
    ///
    /// The (dictionary, word) pair is unique. Pairs that already exist,
    /// including ones linked since the caller last read the table, and
    /// repeated ids are skipped. Returns how many pairs were inserted.
    pub fn insert_memberships(
        &self,
        dictionary_id: u64,
        word_ids: &[u64],
    ) -> Result<usize> {
        if word_ids.is_empty() {
            return Ok(0);
        }
        let now = unix_now();
        let mut inserted = 0;
        let txn = self.db.begin_write()?;
        {
            let mut forward = txn.open_table(MEMBERSHIPS)?;
            let mut reverse = txn.open_table(WORD_MEMBERSHIPS)?;
            for &word_id in word_ids {
                if forward.get((dictionary_id, word_id))?.is_some() {
                    debug!(dictionary_id, word_id, "membership exists, skipping");
                    continue;
                }
                forward.insert((dictionary_id, word_id), now)?;
                reverse.insert((word_id, dictionary_id), now)?;
                inserted += 1;
            }
        }
        txn.commit()?;
        Ok(inserted)
    }

    /// Remove all memberships of one dictionary. Returns how many were
    /// removed.
    pub fn clear_dictionary(&self, dictionary_id: u64) -> Result<usize> {
        let txn = self.db.begin_write()?;
        let removed = remove_members_of(&txn, dictionary_id)?;
        txn.commit()?;
        Ok(removed)
    }

    pub fn remove_all_memberships(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        clear_pair_table(&txn, MEMBERSHIPS)?;
        clear_pair_table(&txn, WORD_MEMBERSHIPS)?;
        txn.commit()?;
        Ok(())
    }

    pub fn count_memberships(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MEMBERSHIPS)?;
        Ok(table.iter()?.count())
    }

    // -- Vocabulary files --

    /// Register a catalogue record. File names are unique.
    pub fn insert_vocabulary_file(
        &self,
        file: &VocabularyFile,
    ) -> Result<VocabularyFile> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut names = txn.open_table(VOCABULARY_FILE_NAMES)?;
            if names.get(file.file_name.as_str())?.is_some() {
                return Err(Error::Conflict {
                    kind: "vocabulary file",
                    name: file.file_name.clone(),
                });
            }

            let now = unix_now();
            let mut stored = file.clone();
            stored.id = next_id(&txn, VOCABULARY_FILE_SEQUENCE)?;
            stored.created_at = now;
            stored.updated_at = now;

            names.insert(stored.file_name.as_str(), stored.id)?;
            let mut table = txn.open_table(VOCABULARY_FILES)?;
            table.insert(stored.id, encode(&stored)?.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    pub fn vocabulary_file_exists(&self, file_name: &str) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(VOCABULARY_FILE_NAMES)?;
        Ok(names.get(file_name)?.is_some())
    }

    pub fn get_vocabulary_file(&self, id: u64) -> Result<Option<VocabularyFile>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VOCABULARY_FILES)?;
        table.get(id)?.map(|v| decode(v.value())).transpose()
    }

    pub fn list_vocabulary_files(&self) -> Result<Vec<VocabularyFile>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VOCABULARY_FILES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_k, v) = entry?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }

    pub fn clear_vocabulary_files(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        clear_id_table(&txn, VOCABULARY_FILES)?;
        clear_name_table(&txn, VOCABULARY_FILE_NAMES)?;
        txn.commit()?;
        Ok(())
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

impl std::fmt::Debug for VocabDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabDb").finish_non_exhaustive()
    }
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn remove_members_of(txn: &WriteTransaction, dictionary_id: u64) -> Result<usize> {
    let mut forward = txn.open_table(MEMBERSHIPS)?;
    let mut word_ids = Vec::new();
    for entry in forward.range((dictionary_id, 0)..=(dictionary_id, u64::MAX))? {
        let (k, _v) = entry?;
        word_ids.push(k.value().1);
    }

    let mut reverse = txn.open_table(WORD_MEMBERSHIPS)?;
    for &word_id in &word_ids {
        forward.remove((dictionary_id, word_id))?;
        reverse.remove((word_id, dictionary_id))?;
    }
    Ok(word_ids.len())
}

fn clear_id_table(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, u64, &'static [u8]>,
) -> Result<()> {
    let mut table = txn.open_table(definition)?;
    let mut ids = Vec::new();
    for entry in table.iter()? {
        let (k, _v) = entry?;
        ids.push(k.value());
    }
    for id in ids {
        table.remove(id)?;
    }
    Ok(())
}

fn clear_name_table(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, &'static str, u64>,
) -> Result<()> {
    let mut table = txn.open_table(definition)?;
    let mut names = Vec::new();
    for entry in table.iter()? {
        let (k, _v) = entry?;
        names.push(k.value().to_string());
    }
    for name in &names {
        table.remove(name.as_str())?;
    }
    Ok(())
}

fn clear_pair_table(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, (u64, u64), u64>,
) -> Result<()> {
    let mut table = txn.open_table(definition)?;
    let mut pairs = Vec::new();
    for entry in table.iter()? {
        let (k, _v) = entry?;
        pairs.push(k.value());
    }
    for pair in pairs {
        table.remove(pair)?;
    }
    Ok(())
}
