//! Dictionary and membership operations on top of [`VocabDb`], with the
//! rules the store itself does not enforce.

use tracing::info;

use crate::{
    classify::classify,
    error::{Error, Result},
    model::{CreationType, DEFAULT_DIFFICULTY, Dictionary, Membership, Page, Word},
    vocab_db::VocabDb,
};

/// Create a user-created dictionary. The category is derived from the
/// name when not given.
pub fn create_dictionary(
    db: &VocabDb,
    name: &str,
    category: Option<&str>,
) -> Result<Dictionary> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("dictionary name must not be blank".into()));
    }
    let category = match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(label) => label.to_string(),
        None => classify(name).label().to_string(),
    };
    db.insert_dictionary(&Dictionary::new(name, &category, CreationType::UserCreated))
}

pub fn require_dictionary(db: &VocabDb, id: u64) -> Result<Dictionary> {
    db.get_dictionary(id)?.ok_or_else(|| Error::NotFound {
        kind: "dictionary",
        name: id.to_string(),
    })
}

/// Look a dictionary up by numeric id or, failing that, by exact name.
pub fn resolve_dictionary(db: &VocabDb, id_or_name: &str) -> Result<Dictionary> {
    if let Ok(id) = id_or_name.parse::<u64>()
        && let Some(dictionary) = db.get_dictionary(id)?
    {
        return Ok(dictionary);
    }
    db.find_dictionary(id_or_name)?.ok_or_else(|| Error::NotFound {
        kind: "dictionary",
        name: id_or_name.to_string(),
    })
}

pub fn dictionaries_by_category(db: &VocabDb, label: &str) -> Result<Vec<Dictionary>> {
    Ok(db
        .list_dictionaries()?
        .into_iter()
        .filter(|d| d.category == label)
        .collect())
}

/// Set the stored word count. Unknown ids are ignored.
pub fn update_word_count(db: &VocabDb, id: u64, count: u64) -> Result<()> {
    let Some(mut dictionary) = db.get_dictionary(id)? else {
        return Ok(());
    };
    dictionary.word_count = count;
    db.update_dictionary(&dictionary)?;
    Ok(())
}

/// Delete one dictionary and its memberships. System-imported
/// dictionaries are refused.
pub fn delete_dictionary(db: &VocabDb, id: u64) -> Result<()> {
    let dictionary = require_dictionary(db, id)?;
    if dictionary.creation_type != CreationType::UserCreated {
        return Err(Error::InvalidInput(format!(
            "dictionary '{}' was imported by the system and cannot be deleted",
            dictionary.name
        )));
    }
    db.remove_dictionary(id)?;
    info!(id, name = %dictionary.name, "deleted dictionary");
    Ok(())
}

pub fn delete_user_created(db: &VocabDb) -> Result<usize> {
    db.remove_dictionaries_by_type(CreationType::UserCreated)
}

/// Link one word to a dictionary unless already linked. Returns the
/// membership row either way.
pub fn link(db: &VocabDb, dictionary_id: u64, word_id: u64) -> Result<Membership> {
    require_dictionary(db, dictionary_id)?;
    if db.get_word(word_id)?.is_none() {
        return Err(Error::NotFound {
            kind: "word",
            name: word_id.to_string(),
        });
    }
    if let Some(existing) = db.get_membership(dictionary_id, word_id)? {
        return Ok(existing);
    }
    db.insert_memberships(dictionary_id, &[word_id])?;
    db.get_membership(dictionary_id, word_id)?
        .ok_or_else(|| Error::NotFound {
            kind: "membership",
            name: format!("{dictionary_id}:{word_id}"),
        })
}

/// Link many words at once. Pairs that already exist and repeated ids
/// are skipped. Returns how many memberships were created.
pub fn link_batch(db: &VocabDb, dictionary_id: u64, word_ids: &[u64]) -> Result<usize> {
    db.insert_memberships(dictionary_id, word_ids)
}

/// Words of one dictionary, ordered by word id. `page` starts at 1.
pub fn words_of_dictionary(
    db: &VocabDb,
    dictionary_id: u64,
    page: usize,
    size: usize,
) -> Result<Page<Word>> {
    let page = page.max(1);
    let mut words = Vec::new();
    for membership in db.memberships_of_dictionary(dictionary_id)? {
        if let Some(word) = db.get_word(membership.word_id)? {
            words.push(word);
        }
    }
    let offset = (page - 1).saturating_mul(size);
    Ok(Page::from_offset(words, page, size, offset))
}

/// Return the stored word for `text`, creating a bare one when absent.
pub fn save_bare_word_if_absent(db: &VocabDb, text: &str) -> Result<Word> {
    let text = text.trim();
    if let Some(word) = db.find_word(text)? {
        return Ok(word);
    }
    let mut word = Word::new(text);
    word.difficulty = DEFAULT_DIFFICULTY;
    db.save_word(&word)
}
