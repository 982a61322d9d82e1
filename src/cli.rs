use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "wordhoard",
    about = "Manage vocabulary wordbooks: import, reconcile and search words"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage individual words
    Word {
        #[command(subcommand)]
        action: WordAction,
    },
    /// Manage dictionaries
    #[command(alias = "dict")]
    Dictionary {
        #[command(subcommand)]
        action: DictionaryAction,
    },
    /// Manage dictionary memberships
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    /// Reconcile a JSON word list into a dictionary
    Add(AddArgs),
    /// Import every new wordbook from the books directory
    Import(ImportArgs),
    /// Load a CSV file into an existing dictionary
    Upload(UploadArgs),
    /// Manage the vocabulary-file catalogue
    Catalogue {
        #[command(subcommand)]
        action: CatalogueAction,
    },
    /// Manage the catalogue's graph mirror
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
    /// Search words by prefix
    Search(SearchArgs),
    /// Show store statistics
    Status(StatusArgs),
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Words --

#[derive(Debug, Subcommand)]
pub enum WordAction {
    /// Create or update one word
    Add(WordAddArgs),
    /// Show one word by id or text
    Get {
        /// Word id or word text
        word: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List words
    List {
        /// Only words with this difficulty
        #[arg(long)]
        difficulty: Option<u8>,
        /// Only words starting with this prefix (case-sensitive)
        #[arg(long)]
        prefix: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every word, dictionary and membership
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Parser)]
pub struct WordAddArgs {
    /// The word text
    pub word: String,
    #[arg(long)]
    pub phonetic: Option<String>,
    #[arg(long)]
    pub definition: Option<String>,
    #[arg(long)]
    pub part_of_speech: Option<String>,
    #[arg(long)]
    pub example: Option<String>,
    #[arg(long)]
    pub translation: Option<String>,
    /// Difficulty from 1 to 5
    #[arg(long)]
    pub difficulty: Option<i64>,
    /// Also link the word to this dictionary (id or name)
    #[arg(short = 'd', long)]
    pub dictionary: Option<String>,
}

// -- Dictionaries --

#[derive(Debug, Subcommand)]
pub enum DictionaryAction {
    /// Create a user dictionary
    Create {
        /// Unique dictionary name
        name: String,
        /// Category label; derived from the name when omitted
        #[arg(long)]
        category: Option<String>,
    },
    /// List dictionaries
    List {
        /// Only dictionaries with this category label
        #[arg(long)]
        category: Option<String>,
        /// Glob pattern applied to dictionary names
        #[arg(long)]
        filter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a dictionary and one page of its words
    Show {
        /// Dictionary id or name
        dictionary: String,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
        /// Words per page
        #[arg(long, default_value = "20")]
        size: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a user-created dictionary
    Delete {
        /// Dictionary id or name
        dictionary: String,
    },
    /// Delete every user-created dictionary
    DeleteUserCreated,
    /// Delete every dictionary and membership
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Remove every word from a dictionary
    Clear {
        /// Dictionary id or name
        dictionary: String,
    },
}

// -- Memberships --

#[derive(Debug, Subcommand)]
pub enum MemberAction {
    /// Link words to a dictionary
    Link {
        /// Dictionary id or name
        dictionary: String,
        /// Word ids
        #[arg(required = true)]
        word_ids: Vec<u64>,
    },
    /// List the dictionaries containing a word
    Of {
        /// Word id or word text
        word: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every membership
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

// -- Add / Import / Upload --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Dictionary id or name
    pub dictionary: String,
    /// JSON word list, or `-` for stdin
    pub file: PathBuf,
    /// Output the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Books directory; defaults to the `books_dir` setting
    pub dir: Option<PathBuf>,
    /// Delete all words, dictionaries and memberships first
    #[arg(long)]
    pub fresh: bool,
    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct UploadArgs {
    /// Dictionary id or name
    pub dictionary: String,
    /// CSV file to load
    pub file: PathBuf,
    /// The first row is a header naming the columns
    #[arg(long)]
    pub header: bool,
    /// Output the summary as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Catalogue / Graph --

#[derive(Debug, Subcommand)]
pub enum CatalogueAction {
    /// Register new CSV files from the translation directory
    Register {
        /// Directory; defaults to the `translation_dir` setting
        dir: Option<PathBuf>,
    },
    /// List catalogued files
    List {
        /// Only files with this category label
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one catalogued file
    Get {
        id: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every catalogue record
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum GraphAction {
    /// Mirror the catalogue into the graph
    Sync,
    /// Show node and category counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every node and edge
    Clear,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Word prefix (case-sensitive); omit to list everything
    pub keyword: Option<String>,

    /// Search only within this dictionary (id or name)
    #[arg(short = 'd', long)]
    pub dictionary: Option<String>,

    /// Page number, starting at 0
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Results per page
    #[arg(short = 'n', long, default_value = "10")]
    pub size: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Config --

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show every setting
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one setting
    Get { key: String },
    /// Persist a setting
    Set { key: String, value: String },
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "wordhoard",
            &mut std::io::stdout(),
        );
    }
}
