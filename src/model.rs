//! Records persisted in the vocabulary store.
//!
//! All records are stored as JSON in redb tables and use camelCase keys,
//! so the same shapes are printed by `--json` output and returned by the
//! MCP tools.

use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};

/// Difficulty assigned when an entry does not carry a valid one.
pub const DEFAULT_DIFFICULTY: u8 = 2;

/// Lowest and highest accepted difficulty tiers.
pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// Business key of a word: trimmed and lower-cased.
///
/// ```
/// assert_eq!(wordhoard::model::normalize("  Run "), "run");
/// ```
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Read an optional list, treating an explicit `null` like a missing key.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A canonical vocabulary entry (a "meta word").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// System-assigned id. Zero until the word has been stored.
    pub id: u64,
    /// Word text as cased on first insert.
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_detail: Option<Phonetic>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub part_of_speech_detail: Vec<PartOfSpeech>,
    pub difficulty: u8,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl Word {
    /// An unsaved word carrying only its text and the default difficulty.
    pub fn new(text: &str) -> Self {
        Self {
            id: 0,
            word: text.to_string(),
            phonetic: None,
            definition: None,
            part_of_speech: None,
            example_sentence: None,
            translation: None,
            phonetic_detail: None,
            part_of_speech_detail: Vec::new(),
            difficulty: DEFAULT_DIFFICULTY,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn key(&self) -> String {
        normalize(&self.word)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phonetic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub us: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartOfSpeech {
    pub pos: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub definitions: Vec<Definition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflection: Option<Inflection>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub synonyms: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub antonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub example_sentences: Vec<ExampleSentence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_participle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present_participle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_person_singular: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superlative: Option<String>,
}

/// How a dictionary came to exist. Only user-created dictionaries may be
/// deleted one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreationType {
    SystemImported,
    UserCreated,
}

/// A named, categorized collection of words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dictionary {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub category: String,
    pub word_count: u64,
    pub creation_type: CreationType,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl Dictionary {
    pub fn new(name: &str, category: &str, creation_type: CreationType) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            file_path: None,
            file_size: None,
            category: category.to_string(),
            word_count: 0,
            creation_type,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Association between a dictionary and a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub dictionary_id: u64,
    pub word_id: u64,
    pub created_at: u64,
}

/// A word-list file registered in the vocabulary-file catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyFile {
    pub id: u64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub category: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

/// One page of results plus the size of the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slice `all` into the page starting at `offset`.
    pub fn from_offset(all: Vec<T>, page: usize, size: usize, offset: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(size).collect();
        Self {
            items,
            page,
            size,
            total,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total.div_ceil(self.size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Apple\t"), "apple");
        assert_eq!(normalize("RUN"), normalize("run"));
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn new_word_has_default_difficulty() {
        let word = Word::new("Run");
        assert_eq!(word.id, 0);
        assert_eq!(word.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(word.key(), "run");
    }

    #[test]
    fn word_json_uses_camel_case_and_skips_empty() {
        let mut word = Word::new("run");
        word.example_sentence = Some("I run.".to_string());
        let value = serde_json::to_value(&word).unwrap();

        assert_eq!(value["exampleSentence"], "I run.");
        assert!(value.get("phonetic").is_none());
        assert!(value.get("partOfSpeechDetail").is_none());
    }

    #[test]
    fn creation_type_wire_names() {
        let json = serde_json::to_string(&CreationType::UserCreated).unwrap();
        assert_eq!(json, "\"USER_CREATED\"");
        let parsed: CreationType =
            serde_json::from_str("\"SYSTEM_IMPORTED\"").unwrap();
        assert_eq!(parsed, CreationType::SystemImported);
    }

    #[test]
    fn page_slices_and_counts() {
        let page = Page::from_offset((1..=25).collect::<Vec<_>>(), 2, 10, 20);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);
    }
}
