//! Incoming word entries and the rules for merging them into stored words.
//!
//! Three shapes are accepted: flat entries (plain string fields), structured
//! entries (nested phonetic and part-of-speech objects) and bare word
//! strings. All three feed the same reconciliation routine.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    model::{
        DEFAULT_DIFFICULTY,
        Definition,
        ExampleSentence,
        Inflection,
        MAX_DIFFICULTY,
        MIN_DIFFICULTY,
        PartOfSpeech,
        Phonetic,
        Word,
        null_as_empty,
    },
};

/// Field length limits, in characters.
pub mod limits {
    pub const WORD: usize = 100;
    pub const PHONETIC: usize = 200;
    pub const DEFINITION: usize = 2000;
    pub const PART_OF_SPEECH: usize = 50;
    pub const EXAMPLE_SENTENCE: usize = 1000;
    pub const TRANSLATION: usize = 500;
    pub const PHONETIC_VARIANT: usize = 100;
    pub const POS_DEFINITION: usize = 1000;
    pub const SENTENCE: usize = 500;
    pub const INFLECTION_FORM: usize = 100;
}

/// A word entry with flat string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub example_sentence: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<i64>,
}

impl FlatEntry {
    pub fn new(word: &str) -> Self {
        Self {
            word: Some(word.to_string()),
            ..Self::default()
        }
    }
}

/// A word entry with nested phonetic and part-of-speech detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredEntry {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub phonetic: Option<Phonetic>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub part_of_speech: Vec<PartOfSpeech>,
    #[serde(default)]
    pub difficulty: Option<i64>,
}

impl StructuredEntry {
    pub fn new(word: &str) -> Self {
        Self {
            word: Some(word.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WordEntry {
    Flat(FlatEntry),
    Structured(StructuredEntry),
    Bare(String),
}

impl WordEntry {
    /// Interpret one JSON value as an entry.
    ///
    /// A string is a bare word. An object is structured when its
    /// `phonetic` is an object or its `partOfSpeech` is an array, and flat
    /// otherwise.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let structured = match &value {
            Value::String(_) => None,
            Value::Object(map) => Some(
                map.get("phonetic").is_some_and(Value::is_object)
                    || map.get("partOfSpeech").is_some_and(Value::is_array),
            ),
            _ => Some(false),
        };
        match (structured, value) {
            (None, Value::String(word)) => Ok(WordEntry::Bare(word)),
            (Some(true), value) => serde_json::from_value(value).map(WordEntry::Structured),
            (_, value) => serde_json::from_value(value).map(WordEntry::Flat),
        }
    }

    /// Raw word text, untrimmed.
    pub fn word(&self) -> Option<&str> {
        match self {
            WordEntry::Flat(e) => e.word.as_deref(),
            WordEntry::Structured(e) => e.word.as_deref(),
            WordEntry::Bare(w) => Some(w),
        }
    }

    /// Trimmed word text, or `None` when missing or blank.
    pub fn trimmed_word(&self) -> Option<&str> {
        self.word().map(str::trim).filter(|w| !w.is_empty())
    }

    pub fn difficulty(&self) -> Option<i64> {
        match self {
            WordEntry::Flat(e) => e.difficulty,
            WordEntry::Structured(e) => e.difficulty,
            WordEntry::Bare(_) => None,
        }
    }

    /// Fill in a difficulty when the entry carries none. Bare entries are
    /// promoted to flat ones so they can hold it.
    pub fn with_default_difficulty(self, difficulty: u8) -> Self {
        let difficulty = Some(i64::from(difficulty));
        match self {
            WordEntry::Flat(mut e) => {
                e.difficulty = e.difficulty.or(difficulty);
                WordEntry::Flat(e)
            }
            WordEntry::Structured(mut e) => {
                e.difficulty = e.difficulty.or(difficulty);
                WordEntry::Structured(e)
            }
            WordEntry::Bare(word) => WordEntry::Flat(FlatEntry {
                word: Some(word),
                difficulty,
                ..FlatEntry::default()
            }),
        }
    }

    /// Merge this entry into `word`.
    ///
    /// Non-blank incoming text overwrites, blank or absent text leaves the
    /// stored value alone. Difficulty is set from the entry when it is
    /// valid and reset to the default otherwise.
    pub fn apply_to(&self, word: &mut Word) {
        match self {
            WordEntry::Flat(e) => {
                overwrite(&mut word.phonetic, e.phonetic.as_deref());
                overwrite(&mut word.definition, e.definition.as_deref());
                overwrite(&mut word.part_of_speech, e.part_of_speech.as_deref());
                overwrite(&mut word.example_sentence, e.example_sentence.as_deref());
                overwrite(&mut word.translation, e.translation.as_deref());
            }
            WordEntry::Structured(e) => {
                if let Some(phonetic) = &e.phonetic {
                    merge_phonetic(&mut word.phonetic_detail, phonetic);
                }
                merge_parts_of_speech(&mut word.part_of_speech_detail, &e.part_of_speech);
            }
            WordEntry::Bare(_) => {}
        }
        word.difficulty = resolve_difficulty(self.difficulty());
    }
}

impl<'de> Deserialize<'de> for WordEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        WordEntry::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Difficulty to store for an incoming value.
pub fn resolve_difficulty(incoming: Option<i64>) -> u8 {
    match incoming {
        Some(d) if (i64::from(MIN_DIFFICULTY)..=i64::from(MAX_DIFFICULTY)).contains(&d) => {
            d as u8
        }
        _ => DEFAULT_DIFFICULTY,
    }
}

/// Parse a word list from JSON text: an array whose elements are bare
/// strings, flat objects or structured objects, or an object with a
/// `words` array.
pub fn parse_word_list(json: &str) -> Result<Vec<WordEntry>> {
    let value: Value = serde_json::from_str(json)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("words") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::InvalidInput(
                    "expected a JSON array or an object with a \"words\" array"
                        .into(),
                ));
            }
        },
        _ => {
            return Err(Error::InvalidInput(
                "expected a JSON array of word entries".into(),
            ));
        }
    };
    items
        .into_iter()
        .map(|item| WordEntry::from_value(item).map_err(Error::from))
        .collect()
}

/// Request-level checks: required word, length limits and difficulty
/// range. Every violation is reported, one per line, as `line N: ...`.
pub fn validate_entries(entries: &[WordEntry]) -> Result<()> {
    if entries.is_empty() {
        return Err(Error::InvalidInput("word list must not be empty".into()));
    }

    let problems: Vec<String> = entries
        .iter()
        .enumerate()
        .flat_map(|(idx, entry)| {
            entry_problems(entry)
                .into_iter()
                .map(move |message| format!("line {}: {message}", idx + 1))
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(problems.join("\n")))
    }
}

/// Every rule one entry breaks, without line prefixes.
pub fn entry_problems(entry: &WordEntry) -> Vec<String> {
    let mut problems = Vec::new();
    let mut report = |message: String| problems.push(message);

    let Some(word) = entry.trimmed_word() else {
        report("word must not be blank".into());
        return problems;
    };
    check_len(&mut report, "word", Some(word), limits::WORD);

    if let Some(d) = entry.difficulty()
        && !(i64::from(MIN_DIFFICULTY)..=i64::from(MAX_DIFFICULTY)).contains(&d)
    {
        report(format!(
            "difficulty must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}"
        ));
    }

    match entry {
        WordEntry::Flat(e) => {
            check_len(&mut report, "phonetic", e.phonetic.as_deref(), limits::PHONETIC);
            check_len(&mut report, "definition", e.definition.as_deref(), limits::DEFINITION);
            check_len(
                &mut report,
                "partOfSpeech",
                e.part_of_speech.as_deref(),
                limits::PART_OF_SPEECH,
            );
            check_len(
                &mut report,
                "exampleSentence",
                e.example_sentence.as_deref(),
                limits::EXAMPLE_SENTENCE,
            );
            check_len(&mut report, "translation", e.translation.as_deref(), limits::TRANSLATION);
        }
        WordEntry::Structured(e) => {
            if let Some(p) = &e.phonetic {
                check_len(&mut report, "phonetic.uk", p.uk.as_deref(), limits::PHONETIC_VARIANT);
                check_len(&mut report, "phonetic.us", p.us.as_deref(), limits::PHONETIC_VARIANT);
            }
            for part in &e.part_of_speech {
                validate_part(&mut report, part);
            }
        }
        WordEntry::Bare(_) => {}
    }
    problems
}

fn validate_part(report: &mut impl FnMut(String), part: &PartOfSpeech) {
    if part.pos.trim().is_empty() {
        report("partOfSpeech.pos must not be blank".into());
    }
    check_len(report, "partOfSpeech.pos", Some(&part.pos), limits::PART_OF_SPEECH);
    for def in &part.definitions {
        check_len(report, "definition", Some(&def.definition), limits::POS_DEFINITION);
        check_len(report, "definition.translation", def.translation.as_deref(), limits::TRANSLATION);
        for ex in &def.example_sentences {
            check_len(report, "exampleSentence", Some(&ex.sentence), limits::SENTENCE);
            check_len(
                report,
                "exampleSentence.translation",
                ex.translation.as_deref(),
                limits::TRANSLATION,
            );
        }
    }
    if let Some(inf) = &part.inflection {
        for (name, form) in inflection_forms(inf) {
            check_len(report, name, form, limits::INFLECTION_FORM);
        }
    }
}

fn check_len(report: &mut impl FnMut(String), field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value
        && v.chars().count() > max
    {
        report(format!("{field} must be at most {max} characters"));
    }
}

fn inflection_forms(inf: &Inflection) -> [(&'static str, Option<&str>); 7] {
    [
        ("inflection.plural", inf.plural.as_deref()),
        ("inflection.past", inf.past.as_deref()),
        ("inflection.pastParticiple", inf.past_participle.as_deref()),
        ("inflection.presentParticiple", inf.present_participle.as_deref()),
        ("inflection.thirdPersonSingular", inf.third_person_singular.as_deref()),
        ("inflection.comparative", inf.comparative.as_deref()),
        ("inflection.superlative", inf.superlative.as_deref()),
    ]
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn overwrite(target: &mut Option<String>, incoming: Option<&str>) {
    if let Some(v) = non_blank(incoming) {
        *target = Some(v);
    }
}

fn merge_phonetic(target: &mut Option<Phonetic>, incoming: &Phonetic) {
    let uk = non_blank(incoming.uk.as_deref());
    let us = non_blank(incoming.us.as_deref());
    if uk.is_none() && us.is_none() {
        return;
    }
    let stored = target.get_or_insert_with(Phonetic::default);
    if uk.is_some() {
        stored.uk = uk;
    }
    if us.is_some() {
        stored.us = us;
    }
}

/// Entries are matched on `pos` ignoring case. A matched entry merges
/// field by field, an unmatched one is appended.
fn merge_parts_of_speech(stored: &mut Vec<PartOfSpeech>, incoming: &[PartOfSpeech]) {
    for part in incoming {
        let pos = part.pos.trim();
        if pos.is_empty() {
            continue;
        }
        let key = pos.to_lowercase();
        match stored.iter_mut().find(|p| p.pos.trim().to_lowercase() == key) {
            Some(existing) => merge_part(existing, part),
            None => {
                let mut fresh = PartOfSpeech {
                    pos: pos.to_string(),
                    ..PartOfSpeech::default()
                };
                merge_part(&mut fresh, part);
                stored.push(fresh);
            }
        }
    }
}

fn merge_part(existing: &mut PartOfSpeech, incoming: &PartOfSpeech) {
    let definitions = clean_definitions(&incoming.definitions);
    if !definitions.is_empty() {
        existing.definitions = definitions;
    }
    if let Some(inflection) = &incoming.inflection {
        merge_inflection(&mut existing.inflection, inflection);
    }
    let synonyms = clean_list(&incoming.synonyms);
    if !synonyms.is_empty() {
        existing.synonyms = synonyms;
    }
    let antonyms = clean_list(&incoming.antonyms);
    if !antonyms.is_empty() {
        existing.antonyms = antonyms;
    }
}

fn merge_inflection(target: &mut Option<Inflection>, incoming: &Inflection) {
    if inflection_forms(incoming)
        .iter()
        .all(|(_, form)| non_blank(*form).is_none())
    {
        return;
    }
    let stored = target.get_or_insert_with(Inflection::default);
    overwrite(&mut stored.plural, incoming.plural.as_deref());
    overwrite(&mut stored.past, incoming.past.as_deref());
    overwrite(&mut stored.past_participle, incoming.past_participle.as_deref());
    overwrite(&mut stored.present_participle, incoming.present_participle.as_deref());
    overwrite(
        &mut stored.third_person_singular,
        incoming.third_person_singular.as_deref(),
    );
    overwrite(&mut stored.comparative, incoming.comparative.as_deref());
    overwrite(&mut stored.superlative, incoming.superlative.as_deref());
}

fn clean_definitions(definitions: &[Definition]) -> Vec<Definition> {
    definitions
        .iter()
        .filter_map(|def| {
            let text = non_blank(Some(&def.definition))?;
            Some(Definition {
                definition: text,
                translation: non_blank(def.translation.as_deref()),
                example_sentences: def
                    .example_sentences
                    .iter()
                    .filter_map(|ex| {
                        Some(ExampleSentence {
                            sentence: non_blank(Some(&ex.sentence))?,
                            translation: non_blank(ex.translation.as_deref()),
                        })
                    })
                    .collect(),
            })
        })
        .collect()
}

fn clean_list(items: &[String]) -> Vec<String> {
    items.iter().filter_map(|s| non_blank(Some(s))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(word: &str) -> FlatEntry {
        FlatEntry::new(word)
    }

    #[test]
    fn from_value_detects_shapes() {
        let bare = WordEntry::from_value(serde_json::json!("apple")).unwrap();
        assert_eq!(bare, WordEntry::Bare("apple".into()));

        let flat = WordEntry::from_value(serde_json::json!({
            "word": "apple",
            "phonetic": "/ˈæp.əl/",
            "partOfSpeech": "n."
        }))
        .unwrap();
        assert!(matches!(flat, WordEntry::Flat(ref e) if e.part_of_speech.as_deref() == Some("n.")));

        let structured = WordEntry::from_value(serde_json::json!({
            "word": "apple",
            "phonetic": {"uk": "/ˈæp.əl/"},
            "partOfSpeech": [{"pos": "noun", "definitions": [{"definition": "a fruit"}]}]
        }))
        .unwrap();
        let WordEntry::Structured(e) = structured else {
            panic!("expected structured entry");
        };
        assert_eq!(e.phonetic.unwrap().uk.as_deref(), Some("/ˈæp.əl/"));
        assert_eq!(e.part_of_speech[0].definitions[0].definition, "a fruit");
    }

    #[test]
    fn parse_word_list_accepts_array_and_wrapper() {
        let list = parse_word_list(r#"["a", {"word": "b"}]"#).unwrap();
        assert_eq!(list.len(), 2);

        let wrapped = parse_word_list(r#"{"words": [{"word": "c", "difficulty": 4}]}"#).unwrap();
        assert_eq!(wrapped[0].difficulty(), Some(4));

        assert!(matches!(
            parse_word_list(r#"{"items": []}"#),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn null_lists_read_as_empty() {
        let list = parse_word_list(
            r#"[
                {"word": "a", "partOfSpeech": [{"pos": "n", "definitions": null, "synonyms": null, "antonyms": null}]},
                {"word": "b", "phonetic": {"uk": "/b/"}, "partOfSpeech": null},
                {"word": "c", "partOfSpeech": [{"pos": "v", "definitions": [{"definition": "d", "exampleSentences": null}]}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 3);

        let WordEntry::Structured(a) = &list[0] else {
            panic!("expected structured entry");
        };
        assert!(a.part_of_speech[0].definitions.is_empty());
        assert!(a.part_of_speech[0].synonyms.is_empty());

        let WordEntry::Structured(b) = &list[1] else {
            panic!("expected structured entry");
        };
        assert!(b.part_of_speech.is_empty());

        let WordEntry::Structured(c) = &list[2] else {
            panic!("expected structured entry");
        };
        assert!(c.part_of_speech[0].definitions[0].example_sentences.is_empty());
        assert!(validate_entries(&list).is_ok());
    }

    #[test]
    fn trimmed_word_rejects_blank() {
        assert_eq!(WordEntry::Bare("  ".into()).trimmed_word(), None);
        assert_eq!(WordEntry::Flat(FlatEntry::default()).trimmed_word(), None);
        assert_eq!(WordEntry::Bare(" run ".into()).trimmed_word(), Some("run"));
    }

    #[test]
    fn flat_merge_preserves_blank_fields_and_resets_difficulty() {
        let mut word = Word::new("run");
        word.definition = Some("D1".into());
        word.translation = Some("跑".into());
        word.difficulty = 5;

        let entry = WordEntry::Flat(FlatEntry {
            definition: Some("   ".into()),
            phonetic: Some(" /rʌn/ ".into()),
            ..flat("run")
        });
        entry.apply_to(&mut word);

        assert_eq!(word.definition.as_deref(), Some("D1"));
        assert_eq!(word.translation.as_deref(), Some("跑"));
        assert_eq!(word.phonetic.as_deref(), Some("/rʌn/"));
        assert_eq!(word.difficulty, DEFAULT_DIFFICULTY);
    }

    #[test]
    fn difficulty_outside_range_falls_back_to_default() {
        assert_eq!(resolve_difficulty(Some(5)), 5);
        assert_eq!(resolve_difficulty(Some(1)), 1);
        assert_eq!(resolve_difficulty(Some(0)), DEFAULT_DIFFICULTY);
        assert_eq!(resolve_difficulty(Some(9)), DEFAULT_DIFFICULTY);
        assert_eq!(resolve_difficulty(None), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn structured_merge_updates_single_phonetic_variant() {
        let mut word = Word::new("tomato");
        word.phonetic_detail = Some(Phonetic {
            uk: Some("/təˈmɑː.təʊ/".into()),
            us: Some("/təˈmeɪ.t̬oʊ/".into()),
        });

        let entry = WordEntry::Structured(StructuredEntry {
            phonetic: Some(Phonetic {
                uk: Some("/new-uk/".into()),
                us: None,
            }),
            ..StructuredEntry::new("tomato")
        });
        entry.apply_to(&mut word);

        let phonetic = word.phonetic_detail.unwrap();
        assert_eq!(phonetic.uk.as_deref(), Some("/new-uk/"));
        assert_eq!(phonetic.us.as_deref(), Some("/təˈmeɪ.t̬oʊ/"));
    }

    #[test]
    fn structured_merge_matches_parts_of_speech_by_pos() {
        let mut word = Word::new("light");
        word.part_of_speech_detail = vec![PartOfSpeech {
            pos: "noun".into(),
            definitions: vec![Definition {
                definition: "brightness".into(),
                ..Definition::default()
            }],
            inflection: Some(Inflection {
                plural: Some("lights".into()),
                ..Inflection::default()
            }),
            synonyms: vec!["illumination".into()],
            ..PartOfSpeech::default()
        }];

        let entry = WordEntry::Structured(StructuredEntry {
            part_of_speech: vec![
                PartOfSpeech {
                    pos: " Noun ".into(),
                    antonyms: vec!["dark".into(), " ".into()],
                    inflection: Some(Inflection {
                        past: Some("lit".into()),
                        ..Inflection::default()
                    }),
                    ..PartOfSpeech::default()
                },
                PartOfSpeech {
                    pos: "adjective".into(),
                    definitions: vec![Definition {
                        definition: " not heavy ".into(),
                        ..Definition::default()
                    }],
                    ..PartOfSpeech::default()
                },
            ],
            ..StructuredEntry::new("light")
        });
        entry.apply_to(&mut word);

        assert_eq!(word.part_of_speech_detail.len(), 2);
        let noun = &word.part_of_speech_detail[0];
        assert_eq!(noun.definitions[0].definition, "brightness");
        assert_eq!(noun.synonyms, vec!["illumination"]);
        assert_eq!(noun.antonyms, vec!["dark"]);
        let inflection = noun.inflection.as_ref().unwrap();
        assert_eq!(inflection.plural.as_deref(), Some("lights"));
        assert_eq!(inflection.past.as_deref(), Some("lit"));

        let adjective = &word.part_of_speech_detail[1];
        assert_eq!(adjective.pos, "adjective");
        assert_eq!(adjective.definitions[0].definition, "not heavy");
    }

    #[test]
    fn bare_entry_only_resets_difficulty() {
        let mut word = Word::new("go");
        word.definition = Some("move".into());
        word.difficulty = 4;
        WordEntry::Bare("go".into()).apply_to(&mut word);

        assert_eq!(word.definition.as_deref(), Some("move"));
        assert_eq!(word.difficulty, DEFAULT_DIFFICULTY);
    }

    #[test]
    fn with_default_difficulty_keeps_explicit_value() {
        let explicit = WordEntry::Flat(FlatEntry {
            difficulty: Some(5),
            ..flat("a")
        });
        assert_eq!(explicit.with_default_difficulty(1).difficulty(), Some(5));

        let bare = WordEntry::Bare("b".into()).with_default_difficulty(3);
        assert_eq!(bare.difficulty(), Some(3));
        assert_eq!(bare.trimmed_word(), Some("b"));
    }

    #[test]
    fn validate_reports_every_problem_with_line_numbers() {
        let entries = vec![
            WordEntry::Flat(flat("ok")),
            WordEntry::Flat(FlatEntry::default()),
            WordEntry::Flat(FlatEntry {
                part_of_speech: Some("x".repeat(51)),
                difficulty: Some(6),
                ..flat("long")
            }),
        ];
        let Err(Error::InvalidInput(message)) = validate_entries(&entries) else {
            panic!("expected invalid input");
        };
        let lines: Vec<_> = message.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("line 2:"));
        assert!(lines.iter().any(|l| l.contains("difficulty")));
        assert!(lines.iter().any(|l| l.contains("partOfSpeech")));
    }

    #[test]
    fn validate_counts_characters_not_bytes() {
        let entries = vec![WordEntry::Bare("词".repeat(100))];
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn validate_rejects_empty_list() {
        assert!(matches!(validate_entries(&[]), Err(Error::InvalidInput(_))));
    }
}
