//! wordhoard - a vocabulary-management backend for exam wordbooks.
//!
//! Words live in one global set keyed by their lower-cased text and are
//! grouped into named dictionaries through memberships. Word lists from
//! files, uploads or MCP clients are merged into the set by
//! [`reconcile::process_word_list`], which never duplicates a word and
//! never erases a stored field with a blank one.
//!
//! # Quick start
//!
//! ```no_run
//! use wordhoard::{DataDir, VocabDb};
//! use wordhoard::dictionaries::create_dictionary;
//! use wordhoard::entry::WordEntry;
//! use wordhoard::reconcile::process_word_list;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let db = VocabDb::open(&data_dir.vocab_db()).unwrap();
//! let dictionary = create_dictionary(&db, "2024高考词汇", None).unwrap();
//!
//! let entries = vec![
//!     WordEntry::Bare("apple".to_string()),
//!     WordEntry::Bare("banana".to_string()),
//! ];
//! let summary = process_word_list(&db, dictionary.id, &entries, None).unwrap();
//! println!("{summary}");
//! ```

pub mod catalogue;
pub mod classify;
pub mod cli;
pub mod data_dir;
pub mod dictionaries;
pub mod entry;
pub mod error;
pub mod graph_db;
pub mod importer;
pub mod mcp;
pub mod model;
pub mod reconcile;
pub mod search;
pub mod settings;
pub mod status;
pub mod vocab_db;
pub mod walker;

pub use classify::{Category, classify, estimate_difficulty};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use graph_db::GraphDb;
pub use reconcile::{ImportContext, Summary, WordStore, process_word_list};
pub use vocab_db::VocabDb;
