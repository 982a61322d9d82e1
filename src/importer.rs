//! Bulk import of word-list files.
//!
//! [`import_books`] walks a directory of wordbooks and turns every new file
//! into a system-imported dictionary. [`import_csv`] loads one uploaded
//! CSV file into an existing dictionary after validating every row.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    time::Instant,
};

use kdam::{BarExt, tqdm};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    classify::{classify, estimate_difficulty},
    dictionaries::{require_dictionary, update_word_count},
    entry::{FlatEntry, WordEntry, entry_problems, parse_word_list},
    error::{Error, Result},
    model::{CreationType, Dictionary},
    reconcile::{ImportContext, Summary, process_word_list},
    vocab_db::VocabDb,
    walker::{DiscoveredFile, WORD_LIST_EXTENSIONS, discover_files},
};

/// Largest CSV file accepted by [`import_csv`].
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Outcome of importing one wordbook file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub dictionary_id: u64,
    pub category: String,
    /// Non-blank rows read from the file, before deduplication.
    pub rows: usize,
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub files_found: usize,
    /// Files whose name is already a dictionary, or is used by an
    /// earlier file of the same run.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub dictionaries_created: usize,
    pub rows: usize,
    pub summary: Summary,
    pub files: Vec<FileReport>,
    pub elapsed_ms: u64,
}

/// Import every unseen wordbook under `root`.
///
/// Files are parsed in parallel and reconciled one at a time, sharing one
/// [`ImportContext`] for the run. With `fresh`, all words, dictionaries
/// and memberships are deleted first. A file that cannot be read or
/// parsed is logged and skipped.
pub fn import_books(db: &VocabDb, root: &Path, fresh: bool) -> Result<ImportReport> {
    let started = Instant::now();
    if fresh {
        db.wipe_all()?;
        info!("wiped words, dictionaries and memberships");
    }

    let files = discover_files(root, WORD_LIST_EXTENSIONS)?;
    let known: HashSet<String> = db
        .list_dictionaries()?
        .into_iter()
        .map(|d| d.name)
        .collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut pending: Vec<&DiscoveredFile> = Vec::new();
    for file in &files {
        let stem = file.stem();
        if known.contains(&stem) {
            continue;
        }
        if !claimed.insert(stem) {
            warn!(
                path = %file.relative_path.display(),
                "another wordbook already uses this name, skipping"
            );
            continue;
        }
        pending.push(file);
    }

    let mut report = ImportReport {
        files_found: files.len(),
        files_skipped: files.len() - pending.len(),
        ..ImportReport::default()
    };
    info!(
        found = report.files_found,
        skipped = report.files_skipped,
        root = %root.display(),
        "discovered wordbooks"
    );
    if pending.is_empty() {
        report.elapsed_ms = elapsed_ms(started);
        return Ok(report);
    }

    // Parse in parallel, then reconcile sequentially in path order.
    let parsed: Vec<(&DiscoveredFile, Result<Vec<WordEntry>>)> = pending
        .par_iter()
        .map(|file| (*file, parse_word_file(file)))
        .collect();

    let mut ctx = ImportContext::new();
    let mut pb = tqdm!(total = parsed.len(), desc = "Importing");
    for (file, entries) in parsed {
        let outcome = entries.and_then(|entries| import_file(db, file, entries, &mut ctx));
        match outcome {
            Ok(file_report) => {
                report.dictionaries_created += 1;
                report.rows += file_report.rows;
                report.summary.absorb(file_report.summary);
                report.files.push(file_report);
            }
            Err(e) => {
                report.files_failed += 1;
                warn!(
                    path = %file.relative_path.display(),
                    error = %e,
                    "skipping wordbook"
                );
            }
        }
        pb.update(1)?;
    }
    eprintln!();

    report.elapsed_ms = elapsed_ms(started);
    info!(
        dictionaries = report.dictionaries_created,
        rows = report.rows,
        words = ctx.len(),
        elapsed_ms = report.elapsed_ms,
        "import finished"
    );
    Ok(report)
}

fn import_file(
    db: &VocabDb,
    file: &DiscoveredFile,
    entries: Vec<WordEntry>,
    ctx: &mut ImportContext,
) -> Result<FileReport> {
    let name = file.stem();
    let category = classify(&name);
    let difficulty = estimate_difficulty(category);

    let mut dictionary = Dictionary::new(&name, category.label(), CreationType::SystemImported);
    dictionary.file_path = Some(file.absolute_path.to_string_lossy().to_string());
    dictionary.file_size = Some(file.size);
    let dictionary = db.insert_dictionary(&dictionary)?;

    let rows = entries.iter().filter(|e| e.trimmed_word().is_some()).count();
    let entries: Vec<WordEntry> = entries
        .into_iter()
        .map(|e| e.with_default_difficulty(difficulty))
        .collect();
    let summary = fill_or_remove(db, &dictionary, || {
        let summary = if entries.is_empty() {
            Summary::default()
        } else {
            process_word_list(db, dictionary.id, &entries, Some(ctx))?
        };
        update_word_count(db, dictionary.id, rows as u64)?;
        Ok(summary)
    })?;

    Ok(FileReport {
        path: file.relative_path.clone(),
        dictionary_id: dictionary.id,
        category: category.label().to_string(),
        rows,
        summary,
    })
}

/// Run `fill` for a freshly created dictionary, removing the dictionary
/// again if it fails. A half-filled dictionary would otherwise be skipped
/// as known on the next run.
fn fill_or_remove<T>(
    db: &VocabDb,
    dictionary: &Dictionary,
    fill: impl FnOnce() -> Result<T>,
) -> Result<T> {
    fill().inspect_err(|_| {
        if let Err(cleanup) = db.remove_dictionary(dictionary.id) {
            warn!(
                dictionary = %dictionary.name,
                error = %cleanup,
                "failed to remove partially imported dictionary"
            );
        }
    })
}

fn parse_word_file(file: &DiscoveredFile) -> Result<Vec<WordEntry>> {
    match file.extension().as_deref() {
        Some("csv") => parse_books_csv(&file.absolute_path),
        Some("json") => {
            let text = std::fs::read_to_string(&file.absolute_path)?;
            parse_word_list(&text)
        }
        _ => Err(Error::InvalidInput(format!(
            "unsupported file type: {}",
            file.relative_path.display()
        ))),
    }
}

/// Read a headerless `word,definition` wordbook.
///
/// Rows with fewer than two columns or a blank word are skipped with a
/// warning.
pub fn parse_books_csv(path: &Path) -> Result<Vec<WordEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() < 2 {
            warn!(path = %path.display(), line, "skipping row with fewer than two columns");
            continue;
        }
        let word = record[0].trim_start_matches('\u{feff}').trim();
        if word.is_empty() {
            warn!(path = %path.display(), line, "skipping row with a blank word");
            continue;
        }
        entries.push(WordEntry::Flat(FlatEntry {
            definition: Some(record[1].trim().to_string()),
            ..FlatEntry::new(word)
        }));
    }
    Ok(entries)
}

/// Column order of a headerless upload, and the names recognised in a
/// header row.
const UPLOAD_COLUMNS: [&str; 7] = [
    "word",
    "phonetic",
    "definition",
    "partOfSpeech",
    "exampleSentence",
    "translation",
    "difficulty",
];

/// Load an uploaded CSV file into an existing dictionary.
///
/// The whole file is validated before anything is written; any invalid
/// row rejects the upload with every problem listed as `line N: ...`.
pub fn import_csv(
    db: &VocabDb,
    dictionary_id: u64,
    path: &Path,
    has_header: bool,
) -> Result<Summary> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(Error::InvalidInput(format!(
            "{} is not a .csv file",
            path.display()
        )));
    }
    let size = std::fs::metadata(path)?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(Error::InvalidInput(format!(
            "{} is {size} bytes, the limit is {MAX_UPLOAD_BYTES}",
            path.display()
        )));
    }
    require_dictionary(db, dictionary_id)?;

    let entries = read_upload(path, has_header)?;
    let summary = process_word_list(db, dictionary_id, &entries, None)?;
    info!(dictionary_id, path = %path.display(), %summary, "imported CSV upload");
    Ok(summary)
}

fn read_upload(path: &Path, has_header: bool) -> Result<Vec<WordEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)?;

    // Column index for each of UPLOAD_COLUMNS.
    let columns: Vec<Option<usize>> = if has_header {
        let positions: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| (column_key(name), idx))
            .collect();
        UPLOAD_COLUMNS
            .iter()
            .map(|name| positions.get(&column_key(name)).copied())
            .collect()
    } else {
        (0..UPLOAD_COLUMNS.len()).map(Some).collect()
    };
    if columns[0].is_none() {
        return Err(Error::InvalidInput("header has no \"word\" column".into()));
    }

    let mut entries = Vec::new();
    let mut problems = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let cell = |idx: usize| {
            columns[idx]
                .and_then(|c| record.get(c))
                .map(|v| v.trim().trim_start_matches('\u{feff}'))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut row_problems = Vec::new();
        let difficulty = match cell(6) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(d) => Some(d),
                Err(_) => {
                    row_problems.push(format!("difficulty '{raw}' is not a number"));
                    None
                }
            },
        };
        let entry = WordEntry::Flat(FlatEntry {
            word: cell(0),
            phonetic: cell(1),
            definition: cell(2),
            part_of_speech: cell(3),
            example_sentence: cell(4),
            translation: cell(5),
            difficulty,
        });
        if cell(2).is_none() {
            row_problems.push("definition must not be blank".into());
        }
        row_problems.extend(entry_problems(&entry));

        problems.extend(
            row_problems
                .into_iter()
                .map(|message| format!("line {line}: {message}")),
        );
        entries.push(entry);
    }

    if !problems.is_empty() {
        return Err(Error::InvalidInput(problems.join("\n")));
    }
    if entries.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} contains no words",
            path.display()
        )));
    }
    Ok(entries)
}

fn column_key(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect::<String>()
        .to_lowercase()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db(tmp: &tempfile::TempDir) -> VocabDb {
        VocabDb::open(&tmp.path().join("vocab.redb")).unwrap()
    }

    fn books_dir(tmp: &tempfile::TempDir) -> PathBuf {
        let dir = tmp.path().join("books");
        std::fs::create_dir(&dir).unwrap();
        dir
    }

    #[test]
    fn books_csv_skips_short_and_blank_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("b.csv");
        std::fs::write(&path, "apple,苹果\nlonely\n ,空\nbanana,香蕉\n").unwrap();

        let entries = parse_books_csv(&path).unwrap();
        let words: Vec<_> = entries.iter().filter_map(WordEntry::trimmed_word).collect();
        assert_eq!(words, vec!["apple", "banana"]);
    }

    #[test]
    fn import_creates_classified_dictionaries() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dir = books_dir(&tmp);
        std::fs::write(dir.join("2024高考词汇.csv"), "apple,苹果\nbanana,香蕉\nApple,苹果2\n")
            .unwrap();
        std::fs::write(
            dir.join("GRE.json"),
            r#"[{"word": "abate", "phonetic": {"us": "/əˈbeɪt/"},
                 "partOfSpeech": [{"pos": "verb", "definitions": [{"definition": "lessen"}]}]}]"#,
        )
        .unwrap();

        let report = import_books(&db, &dir, false).unwrap();
        assert_eq!(report.files_found, 2);
        assert_eq!(report.dictionaries_created, 2);
        assert_eq!(report.rows, 4);

        let gaokao = db.find_dictionary("2024高考词汇").unwrap().unwrap();
        assert_eq!(gaokao.category, "高考");
        assert_eq!(gaokao.creation_type, CreationType::SystemImported);
        assert_eq!(gaokao.word_count, 3);
        assert_eq!(gaokao.file_size, Some(std::fs::metadata(dir.join("2024高考词汇.csv")).unwrap().len()));
        assert_eq!(db.member_word_ids(gaokao.id).unwrap().len(), 2);

        let apple = db.find_word("apple").unwrap().unwrap();
        assert_eq!(apple.definition.as_deref(), Some("苹果2"));
        assert_eq!(apple.difficulty, 2);

        let abate = db.find_word("abate").unwrap().unwrap();
        assert_eq!(abate.difficulty, 4);
        assert_eq!(
            abate.phonetic_detail.unwrap().us.as_deref(),
            Some("/əˈbeɪt/")
        );
    }

    #[test]
    fn second_run_skips_known_files() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dir = books_dir(&tmp);
        std::fs::write(dir.join("四级.csv"), "run,跑\n").unwrap();

        import_books(&db, &dir, false).unwrap();
        std::fs::write(dir.join("六级.csv"), "run,跑步\nwalk,走\n").unwrap();
        let report = import_books(&db, &dir, false).unwrap();

        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.dictionaries_created, 1);
        assert_eq!(report.summary.existed, 1);
        assert_eq!(report.summary.created, 1);
        assert_eq!(db.count_words().unwrap(), 2);
        assert_eq!(
            db.find_word("run").unwrap().unwrap().difficulty,
            estimate_difficulty(classify("六级"))
        );
    }

    #[test]
    fn fresh_import_wipes_first() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dir = books_dir(&tmp);
        std::fs::write(dir.join("a.csv"), "one,1\n").unwrap();
        import_books(&db, &dir, false).unwrap();
        crate::dictionaries::save_bare_word_if_absent(&db, "stray").unwrap();

        let report = import_books(&db, &dir, true).unwrap();
        assert_eq!(report.files_skipped, 0);
        assert_eq!(report.dictionaries_created, 1);
        assert!(db.find_word("stray").unwrap().is_none());
        assert_eq!(db.list_dictionaries().unwrap().len(), 1);
    }

    #[test]
    fn unparsable_file_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dir = books_dir(&tmp);
        std::fs::write(dir.join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.join("ok.csv"), "fine,好\n").unwrap();

        let report = import_books(&db, &dir, false).unwrap();
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.dictionaries_created, 1);
        assert!(db.find_dictionary("broken").unwrap().is_none());
    }

    #[test]
    fn files_sharing_a_name_import_once() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dir = books_dir(&tmp);
        std::fs::create_dir(dir.join("more")).unwrap();
        std::fs::write(dir.join("四级.csv"), "run,跑
").unwrap();
        std::fs::write(dir.join("四级.json"), r#"["walk"]"#).unwrap();
        std::fs::write(dir.join("more").join("四级.csv"), "swim,游
").unwrap();

        let report = import_books(&db, &dir, false).unwrap();
        assert_eq!(report.files_found, 3);
        assert_eq!(report.dictionaries_created, 1);
        assert_eq!(report.files_skipped, 2);
        assert_eq!(report.files_failed, 0);
        assert_eq!(db.list_dictionaries().unwrap().len(), 1);
    }

    #[test]
    fn failed_fill_removes_the_dictionary() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let word = crate::dictionaries::save_bare_word_if_absent(&db, "run").unwrap();
        let dictionary = db
            .insert_dictionary(&Dictionary::new("四级", "四级", CreationType::SystemImported))
            .unwrap();

        let result: Result<()> = fill_or_remove(&db, &dictionary, || {
            db.insert_memberships(dictionary.id, &[word.id])?;
            Err(Error::InvalidInput("interrupted".into()))
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(db.find_dictionary("四级").unwrap().is_none());
        assert!(db.memberships_of_word(word.id).unwrap().is_empty());

        let kept = fill_or_remove(&db, &Dictionary::new("x", "其他", CreationType::SystemImported), || Ok(7));
        assert_eq!(kept.unwrap(), 7);
    }

    #[test]
    fn upload_with_header_maps_columns_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dict = crate::dictionaries::create_dictionary(&db, "mine", None).unwrap();
        let path = tmp.path().join("upload.csv");
        std::fs::write(
            &path,
            "word,definition,translation,difficulty\nhello,a greeting,你好,1\nworld,the earth,世界,\n",
        )
        .unwrap();

        let summary = import_csv(&db, dict.id, &path, true).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.added, 2);
        let hello = db.find_word("hello").unwrap().unwrap();
        assert_eq!(hello.translation.as_deref(), Some("你好"));
        assert_eq!(hello.difficulty, 1);
    }

    #[test]
    fn upload_without_header_is_positional() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dict = crate::dictionaries::create_dictionary(&db, "mine", None).unwrap();
        let path = tmp.path().join("upload.csv");
        std::fs::write(&path, "run,/rʌn/,move fast,v.,I run.,跑,3\n").unwrap();

        import_csv(&db, dict.id, &path, false).unwrap();
        let run = db.find_word("run").unwrap().unwrap();
        assert_eq!(run.phonetic.as_deref(), Some("/rʌn/"));
        assert_eq!(run.part_of_speech.as_deref(), Some("v."));
        assert_eq!(run.example_sentence.as_deref(), Some("I run."));
        assert_eq!(run.difficulty, 3);
    }

    #[test]
    fn invalid_upload_is_rejected_whole() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let dict = crate::dictionaries::create_dictionary(&db, "mine", None).unwrap();
        let path = tmp.path().join("upload.csv");
        std::fs::write(&path, "good,fine\nbad,\nworse,x,,,,,9\n").unwrap();

        let Err(Error::InvalidInput(message)) = import_csv(&db, dict.id, &path, false) else {
            panic!("expected invalid input");
        };
        assert!(message.contains("line 2: definition must not be blank"));
        assert!(message.contains("line 3: difficulty"));
        assert_eq!(db.count_words().unwrap(), 0);
    }

    #[test]
    fn upload_checks_file_type_and_dictionary() {
        let tmp = tempfile::tempdir().unwrap();
        let db = test_db(&tmp);
        let txt = tmp.path().join("words.txt");
        std::fs::write(&txt, "a,b\n").unwrap();
        assert!(matches!(
            import_csv(&db, 1, &txt, false),
            Err(Error::InvalidInput(_))
        ));

        let csv = tmp.path().join("words.csv");
        std::fs::write(&csv, "a,b\n").unwrap();
        assert!(matches!(
            import_csv(&db, 42, &csv, false),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn column_keys_ignore_case_and_separators() {
        assert_eq!(column_key("Part_Of_Speech"), column_key("partOfSpeech"));
        assert_eq!(column_key("\u{feff}word"), "word");
    }
}
