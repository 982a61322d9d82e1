use std::{
    io::Read,
    path::{Path, PathBuf},
};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wordhoard::{
    DataDir,
    Error,
    GraphDb,
    Result,
    VocabDb,
    catalogue,
    cli::{
        self,
        CatalogueAction,
        Cli,
        Command,
        ConfigAction,
        DictionaryAction,
        GraphAction,
        MemberAction,
        WordAction,
    },
    dictionaries,
    entry::{FlatEntry, WordEntry, parse_word_list, validate_entries},
    importer,
    mcp,
    model::{Dictionary, Word},
    reconcile,
    search::{self, SearchRequest},
    settings,
    status,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("WORDHOARD_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let db = VocabDb::open(&data_dir.vocab_db())?;

    match cli.command {
        Command::Word { action } => match action {
            WordAction::Add(args) => word_add(&db, args)?,
            WordAction::Get { word, json } => word_get(&db, &word, json)?,
            WordAction::List {
                difficulty,
                prefix,
                json,
            } => word_list(&db, difficulty, prefix.as_deref(), json)?,
            WordAction::Wipe { yes } => {
                require_confirmation(yes, "word wipe")?;
                db.wipe_all()?;
                println!("Deleted all words, dictionaries and memberships");
            }
        },
        Command::Dictionary { action } => dictionary_command(&db, action)?,
        Command::Member { action } => member_command(&db, action)?,
        Command::Add(args) => cmd_add(&db, &args)?,
        Command::Import(args) => {
            let dir =
                settings::resolve_dir(&db, settings::BOOKS_DIR, args.dir.as_deref())?;
            let report = importer::import_books(&db, &dir, args.fresh)?;
            if args.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                for file in &report.files {
                    println!(
                        "{}\t[{}]\t{} rows\t{}",
                        file.path.display(),
                        file.category,
                        file.rows,
                        file.summary
                    );
                }
                println!(
                    "\n{} file(s) found, {} imported, {} already known, {} failed in {} ms",
                    report.files_found,
                    report.dictionaries_created,
                    report.files_skipped,
                    report.files_failed,
                    report.elapsed_ms
                );
            }
        }
        Command::Upload(args) => {
            let dictionary = dictionaries::resolve_dictionary(&db, &args.dictionary)?;
            let summary =
                importer::import_csv(&db, dictionary.id, &args.file, args.header)?;
            print_summary(&dictionary, &summary, args.json)?;
        }
        Command::Catalogue { action } => catalogue_command(&db, action)?,
        Command::Graph { action } => {
            let graph = GraphDb::open(&data_dir.graph_db())?;
            graph_command(&db, &graph, action)?;
        }
        Command::Search(args) => {
            let dictionary_id = match args.dictionary.as_deref() {
                Some(reference) => Some(dictionaries::resolve_dictionary(&db, reference)?.id),
                None => None,
            };
            let request = SearchRequest {
                keyword: args.keyword,
                dictionary_id,
                page: args.page,
                size: args.size,
            };
            let page = search::execute_search(&db, &request)?;
            if args.json {
                search::format_json(&page)?;
            } else {
                search::format_human(&page);
            }
        }
        Command::Status(args) => {
            let graph = GraphDb::open(&data_dir.graph_db())?;
            cmd_status(&data_dir, &db, &graph, args.json)?;
        }
        Command::Config { action } => config_command(&db, action)?,
        Command::Mcp => {
            mcp::run_mcp(db)?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn require_confirmation(yes: bool, command: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "'{command}' deletes data; pass --yes to confirm"
        )))
    }
}

// -- Words --

fn word_add(db: &VocabDb, args: cli::WordAddArgs) -> Result<()> {
    let entry = WordEntry::Flat(FlatEntry {
        word: Some(args.word),
        phonetic: args.phonetic,
        definition: args.definition,
        part_of_speech: args.part_of_speech,
        example_sentence: args.example,
        translation: args.translation,
        difficulty: args.difficulty,
    });
    validate_entries(std::slice::from_ref(&entry))?;

    match args.dictionary {
        Some(reference) => {
            let dictionary = dictionaries::resolve_dictionary(db, &reference)?;
            let summary = reconcile::process_word_list(db, dictionary.id, &[entry], None)?;
            print_summary(&dictionary, &summary, false)?;
        }
        None => {
            let (word, existed) = reconcile::upsert_entry(db, &entry)?;
            let verb = if existed { "Updated" } else { "Created" };
            println!("{verb} word #{} '{}'", word.id, word.word);
        }
    }
    Ok(())
}

/// Resolve a word by numeric id, falling back to a text lookup.
fn find_word(db: &VocabDb, reference: &str) -> Result<Word> {
    if let Ok(id) = reference.parse::<u64>()
        && let Some(word) = db.get_word(id)?
    {
        return Ok(word);
    }
    db.find_word(reference)?.ok_or_else(|| Error::NotFound {
        kind: "word",
        name: reference.to_string(),
    })
}

fn word_get(db: &VocabDb, reference: &str, json: bool) -> Result<()> {
    let word = find_word(db, reference)?;
    if json {
        println!("{}", serde_json::to_string(&word)?);
        return Ok(());
    }

    println!("#{} {}", word.id, word.word);
    println!("difficulty: {}", word.difficulty);
    let fields = [
        ("phonetic", &word.phonetic),
        ("part of speech", &word.part_of_speech),
        ("definition", &word.definition),
        ("example", &word.example_sentence),
        ("translation", &word.translation),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if let Some(phonetic) = &word.phonetic_detail {
        println!(
            "phonetic: UK {} / US {}",
            phonetic.uk.as_deref().unwrap_or("-"),
            phonetic.us.as_deref().unwrap_or("-")
        );
    }
    for part in &word.part_of_speech_detail {
        println!("{}:", part.pos);
        for (i, definition) in part.definitions.iter().enumerate() {
            println!("  {}. {}", i + 1, definition.definition);
            if let Some(translation) = &definition.translation {
                println!("     {translation}");
            }
        }
        if !part.synonyms.is_empty() {
            println!("  synonyms: {}", part.synonyms.join(", "));
        }
        if !part.antonyms.is_empty() {
            println!("  antonyms: {}", part.antonyms.join(", "));
        }
    }
    Ok(())
}

fn word_list(
    db: &VocabDb,
    difficulty: Option<u8>,
    prefix: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut words = match (difficulty, prefix) {
        (Some(d), _) => db.words_by_difficulty(d)?,
        (None, Some(p)) => db.words_with_prefix(p)?,
        (None, None) => db.list_words()?,
    };
    if let (Some(_), Some(p)) = (difficulty, prefix) {
        words.retain(|w| w.word.starts_with(p));
    }

    if json {
        println!("{}", serde_json::to_string(&words)?);
    } else if words.is_empty() {
        println!("No words.");
    } else {
        for word in &words {
            println!(
                "{}\t{}\t{}\t{}",
                word.id,
                word.word,
                word.difficulty,
                word.definition.as_deref().unwrap_or("")
            );
        }
        println!("\n{} word(s)", words.len());
    }
    Ok(())
}

// -- Dictionaries --

fn dictionary_command(db: &VocabDb, action: DictionaryAction) -> Result<()> {
    match action {
        DictionaryAction::Create { name, category } => {
            let dictionary = dictionaries::create_dictionary(db, &name, category.as_deref())?;
            println!(
                "Created dictionary #{} '{}' [{}]",
                dictionary.id, dictionary.name, dictionary.category
            );
        }
        DictionaryAction::List {
            category,
            filter,
            json,
        } => dictionary_list(db, category.as_deref(), filter.as_deref(), json)?,
        DictionaryAction::Show {
            dictionary,
            page,
            size,
            json,
        } => {
            let dictionary = dictionaries::resolve_dictionary(db, &dictionary)?;
            let words = dictionaries::words_of_dictionary(db, dictionary.id, page, size)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&serde_json::json!({
                        "dictionary": dictionary,
                        "words": words,
                    }))?
                );
            } else {
                println!(
                    "#{} {} [{}] {} words ({:?})",
                    dictionary.id,
                    dictionary.name,
                    dictionary.category,
                    dictionary.word_count,
                    dictionary.creation_type
                );
                if let Some(path) = &dictionary.file_path {
                    println!("file: {path}");
                }
                println!();
                search::format_human(&words);
            }
        }
        DictionaryAction::Delete { dictionary } => {
            let dictionary = dictionaries::resolve_dictionary(db, &dictionary)?;
            dictionaries::delete_dictionary(db, dictionary.id)?;
            println!("Deleted dictionary '{}'", dictionary.name);
        }
        DictionaryAction::DeleteUserCreated => {
            let removed = dictionaries::delete_user_created(db)?;
            println!("Deleted {removed} user-created dictionaries");
        }
        DictionaryAction::DeleteAll { yes } => {
            require_confirmation(yes, "dictionary delete-all")?;
            db.remove_all_dictionaries()?;
            println!("Deleted all dictionaries and memberships");
        }
        DictionaryAction::Clear { dictionary } => {
            let dictionary = dictionaries::resolve_dictionary(db, &dictionary)?;
            let removed = db.clear_dictionary(dictionary.id)?;
            println!("Removed {removed} word(s) from '{}'", dictionary.name);
        }
    }
    Ok(())
}

fn dictionary_list(
    db: &VocabDb,
    category: Option<&str>,
    filter: Option<&str>,
    json: bool,
) -> Result<()> {
    let glob = filter
        .map(|pattern| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| Error::Config(format!("invalid glob pattern: {e}")))
        })
        .transpose()?;

    let mut list = match category {
        Some(label) => dictionaries::dictionaries_by_category(db, label)?,
        None => db.list_dictionaries()?,
    };
    if let Some(glob) = &glob {
        list.retain(|d| glob.is_match(&d.name));
    }

    if json {
        println!("{}", serde_json::to_string(&list)?);
    } else if list.is_empty() {
        println!("No dictionaries.");
    } else {
        for d in &list {
            println!(
                "{}\t{}\t{}\t{}\t{:?}",
                d.id, d.name, d.category, d.word_count, d.creation_type
            );
        }
    }
    Ok(())
}

// -- Memberships --

fn member_command(db: &VocabDb, action: MemberAction) -> Result<()> {
    match action {
        MemberAction::Link {
            dictionary,
            word_ids,
        } => {
            let dictionary = dictionaries::resolve_dictionary(db, &dictionary)?;
            for &word_id in &word_ids {
                if db.get_word(word_id)?.is_none() {
                    return Err(Error::NotFound {
                        kind: "word",
                        name: word_id.to_string(),
                    });
                }
            }
            let added = dictionaries::link_batch(db, dictionary.id, &word_ids)?;
            println!("Linked {added} word(s) to '{}'", dictionary.name);
        }
        MemberAction::Of { word, json } => {
            let word = find_word(db, &word)?;
            let mut containing = Vec::new();
            for membership in db.memberships_of_word(word.id)? {
                if let Some(dictionary) = db.get_dictionary(membership.dictionary_id)? {
                    containing.push(dictionary);
                }
            }
            if json {
                println!("{}", serde_json::to_string(&containing)?);
            } else if containing.is_empty() {
                println!("'{}' is not in any dictionary.", word.word);
            } else {
                for d in &containing {
                    println!("{}\t{}\t{}", d.id, d.name, d.category);
                }
            }
        }
        MemberAction::DeleteAll { yes } => {
            require_confirmation(yes, "member delete-all")?;
            db.remove_all_memberships()?;
            println!("Deleted all memberships");
        }
    }
    Ok(())
}

// -- Add --

fn cmd_add(db: &VocabDb, args: &cli::AddArgs) -> Result<()> {
    let dictionary = dictionaries::resolve_dictionary(db, &args.dictionary)?;
    let text = read_input(&args.file)?;
    let entries = parse_word_list(&text)?;
    validate_entries(&entries)?;

    let summary = reconcile::process_word_list(db, dictionary.id, &entries, None)?;
    print_summary(&dictionary, &summary, args.json)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn print_summary(
    dictionary: &Dictionary,
    summary: &reconcile::Summary,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        println!("{}: {summary}", dictionary.name);
    }
    Ok(())
}

// -- Catalogue / Graph --

fn catalogue_command(db: &VocabDb, action: CatalogueAction) -> Result<()> {
    match action {
        CatalogueAction::Register { dir } => {
            let dir: PathBuf =
                settings::resolve_dir(db, settings::TRANSLATION_DIR, dir.as_deref())?;
            let added = catalogue::register_files(db, &dir)?;
            println!("Registered {added} new file(s) from {}", dir.display());
        }
        CatalogueAction::List { category, json } => {
            let files = match category.as_deref() {
                Some(label) => catalogue::files_by_category(db, label)?,
                None => db.list_vocabulary_files()?,
            };
            if json {
                println!("{}", serde_json::to_string(&files)?);
            } else if files.is_empty() {
                println!("No vocabulary files catalogued.");
            } else {
                for f in &files {
                    println!(
                        "{}\t{}\t{}\t{} bytes",
                        f.id, f.file_name, f.category, f.file_size
                    );
                }
            }
        }
        CatalogueAction::Get { id, json } => {
            let file = db.get_vocabulary_file(id)?.ok_or_else(|| Error::NotFound {
                kind: "vocabulary file",
                name: id.to_string(),
            })?;
            if json {
                println!("{}", serde_json::to_string(&file)?);
            } else {
                println!("#{} {}", file.id, file.file_name);
                println!("path: {}", file.file_path);
                println!("size: {} bytes", file.file_size);
                println!("category: {}", file.category);
            }
        }
        CatalogueAction::Clear => {
            db.clear_vocabulary_files()?;
            println!("Cleared the vocabulary-file catalogue");
        }
    }
    Ok(())
}

fn graph_command(db: &VocabDb, graph: &GraphDb, action: GraphAction) -> Result<()> {
    match action {
        GraphAction::Sync => {
            let files = db.list_vocabulary_files()?;
            let synced = graph.sync(&files)?;
            println!("Mirrored {synced} of {} file(s)", files.len());
        }
        GraphAction::Status { json } => {
            let nodes = graph.node_count()?;
            let categories = graph.category_count()?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "nodes": nodes, "categories": categories })
                );
            } else {
                println!("File nodes: {nodes}");
                println!("Category nodes: {categories}");
                for label in graph.categories()? {
                    println!("  {label}: {}", graph.files_in_category(&label)?.len());
                }
            }
        }
        GraphAction::Clear => {
            graph.clear()?;
            println!("Cleared the graph mirror");
        }
    }
    Ok(())
}

// -- Status / Config --

fn cmd_status(
    data_dir: &DataDir,
    db: &VocabDb,
    graph: &GraphDb,
    json: bool,
) -> Result<()> {
    let status = status::collect(data_dir, db, graph)?;
    if json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!("Data directory: {}", status.data_dir);
        println!("Words: {}", status.words);
        println!("Dictionaries: {}", status.dictionaries);
        println!("Memberships: {}", status.memberships);
        println!("Vocabulary files: {}", status.vocabulary_files);
        println!(
            "Graph: {} file node(s), {} categories",
            status.graph_nodes, status.graph_categories
        );
    }
    Ok(())
}

fn config_command(db: &VocabDb, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { json } => {
            let all = settings::all(db)?;
            if json {
                let map: serde_json::Map<String, serde_json::Value> = all
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                    .collect();
                println!("{}", serde_json::Value::Object(map));
            } else {
                for (key, value) in all {
                    println!("{key}\t{value}");
                }
            }
        }
        ConfigAction::Get { key } => println!("{}", settings::get(db, &key)?),
        ConfigAction::Set { key, value } => {
            settings::set(db, &key, &value)?;
            println!("Set {key} = {}", value.trim());
        }
    }
    Ok(())
}
