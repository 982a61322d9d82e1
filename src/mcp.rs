use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    dictionaries::{dictionaries_by_category, resolve_dictionary},
    entry::{WordEntry, validate_entries},
    error::{self, Error},
    model::{Dictionary, Page, Word},
    reconcile::process_word_list,
    search::{self, DEFAULT_PAGE_SIZE, SearchRequest},
    vocab_db::VocabDb,
};

#[derive(Clone)]
pub struct WordhoardMcpServer {
    db: Arc<VocabDb>,
    tool_router: ToolRouter<Self>,
}

impl WordhoardMcpServer {
    fn new(db: VocabDb) -> Self {
        Self {
            db: Arc::new(db),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl WordhoardMcpServer {
    /// Prefix search over stored words.
    #[tool(
        name = "wordhoard_search",
        description = "Search words by case-sensitive prefix. Optionally restrict to one dictionary (id or name). Pages start at 0."
    )]
    pub async fn wordhoard_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let dictionary_id = match params.dictionary.as_deref() {
            Some(reference) => Some(
                resolve_dictionary(&self.db, reference)
                    .map_err(to_mcp_error)?
                    .id,
            ),
            None => None,
        };
        let request = SearchRequest {
            keyword: params.keyword.clone(),
            dictionary_id,
            page: params.page.unwrap_or(0),
            size: params.size.unwrap_or(DEFAULT_PAGE_SIZE),
        };

        let page = search::execute_search(&self.db, &request).map_err(to_mcp_error)?;
        let summary = format_search_summary(&page, params.keyword.as_deref());
        structured_result(summary, &page)
    }

    /// Reconcile a word list into a dictionary.
    #[tool(
        name = "wordhoard_add_words",
        description = "Add words to a dictionary. Each element of `words` is a bare string, a flat object (word, phonetic, definition, partOfSpeech, exampleSentence, translation, difficulty) or a structured object (phonetic {uk, us}, partOfSpeech [...]). Existing words are updated, never duplicated."
    )]
    pub async fn wordhoard_add_words(
        &self,
        params: Parameters<AddWordsParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let dictionary =
            resolve_dictionary(&self.db, &params.dictionary).map_err(to_mcp_error)?;

        let entries = params
            .words
            .into_iter()
            .map(WordEntry::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| rmcp::ErrorData::invalid_params(format!("malformed word entry: {e}"), None))?;
        validate_entries(&entries).map_err(to_mcp_error)?;

        let summary = process_word_list(&*self.db, dictionary.id, &entries, None)
            .map_err(to_mcp_error)?;
        structured_result(format!("{}: {summary}", dictionary.name), &summary)
    }

    /// List dictionaries.
    #[tool(
        name = "wordhoard_dictionaries",
        description = "List dictionaries with their category, word count and creation type. Optionally filter by category label."
    )]
    pub async fn wordhoard_dictionaries(
        &self,
        params: Parameters<DictionariesParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let dictionaries = match params.0.category.as_deref() {
            Some(label) => dictionaries_by_category(&self.db, label),
            None => self.db.list_dictionaries(),
        }
        .map_err(to_mcp_error)?;

        let summary = format_dictionaries_summary(&dictionaries);
        structured_result(summary, &json!({ "dictionaries": dictionaries }))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for WordhoardMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("wordhoard", env!("CARGO_PKG_VERSION"))
                    .with_title("wordhoard MCP"),
            )
            .with_instructions(
                "Use wordhoard_dictionaries to find a dictionary, wordhoard_search to look words up and wordhoard_add_words to add or update words.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Word prefix (case-sensitive). Omit to list everything.
    pub keyword: Option<String>,
    /// Restrict to one dictionary, by id or name.
    pub dictionary: Option<String>,
    /// Zero-based page index (default: 0).
    pub page: Option<usize>,
    /// Page size (default: 10).
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddWordsParams {
    /// Target dictionary, by id or name.
    pub dictionary: String,
    /// Word entries.
    pub words: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DictionariesParams {
    /// Only dictionaries with this category label (e.g. 高考, GRE).
    pub category: Option<String>,
}

fn structured_result(
    summary: String,
    value: &impl Serialize,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let structured = serde_json::to_value(value)
        .map_err(|e| mcp_error("failed to serialize result", e))?;
    let mut result = CallToolResult::success(vec![Content::text(summary)]);
    result.structured_content = Some(structured);
    Ok(result)
}

fn format_search_summary(page: &Page<Word>, keyword: Option<&str>) -> String {
    let keyword = keyword.unwrap_or("");
    if page.items.is_empty() {
        return format!("No words found for \"{keyword}\"");
    }

    let mut lines = Vec::with_capacity(page.items.len() + 1);
    lines.push(format!(
        "Found {} word(s) for \"{keyword}\", showing page {} of {}:",
        page.total,
        page.page,
        page.total_pages()
    ));
    for word in &page.items {
        match &word.definition {
            Some(definition) => lines.push(format!("{} {definition}", word.word)),
            None => lines.push(word.word.clone()),
        }
    }
    lines.join("\n")
}

fn format_dictionaries_summary(dictionaries: &[Dictionary]) -> String {
    if dictionaries.is_empty() {
        return "No dictionaries".to_string();
    }
    dictionaries
        .iter()
        .map(|d| format!("#{} {} [{}] {} words", d.id, d.name, d.category, d.word_count))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_mcp_error(error: Error) -> rmcp::ErrorData {
    match error {
        Error::InvalidInput(_) | Error::NotFound { .. } | Error::Conflict { .. } => {
            rmcp::ErrorData::invalid_params(error.to_string(), None)
        }
        other => mcp_error("request failed", other),
    }
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(db: VocabDb) -> error::Result<()> {
    let server = WordhoardMcpServer::new(db);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionaries::create_dictionary;

    fn server() -> (tempfile::TempDir, WordhoardMcpServer) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VocabDb::open(&tmp.path().join("vocab.redb")).unwrap();
        create_dictionary(&db, "高考核心", None).unwrap();
        (tmp, WordhoardMcpServer::new(db))
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn add_then_search() {
        let (_tmp, server) = server();

        let added = server
            .wordhoard_add_words(Parameters(AddWordsParams {
                dictionary: "高考核心".to_string(),
                words: vec![
                    json!("apple"),
                    json!({"word": "apply", "definition": "make a request", "difficulty": 3}),
                    json!({"word": "abate", "phonetic": {"uk": "/əˈbeɪt/"}}),
                ],
            }))
            .await
            .unwrap();
        let summary = added.structured_content.expect("structured");
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["created"], 3);
        assert_eq!(summary["added"], 3);

        let found = server
            .wordhoard_search(Parameters(SearchParams {
                keyword: Some("app".to_string()),
                dictionary: Some("高考核心".to_string()),
                page: None,
                size: None,
            }))
            .await
            .unwrap();
        assert!(text_of(&found).contains("Found 2 word(s)"));
        let page = found.structured_content.expect("structured");
        let items = page["items"].as_array().expect("items array");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["definition"], "make a request");
    }

    #[tokio::test]
    async fn invalid_words_are_rejected() {
        let (_tmp, server) = server();
        let err = server
            .wordhoard_add_words(Parameters(AddWordsParams {
                dictionary: "高考核心".to_string(),
                words: vec![json!({"word": "x", "difficulty": 9})],
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("line 1"));

        let missing = server
            .wordhoard_add_words(Parameters(AddWordsParams {
                dictionary: "nope".to_string(),
                words: vec![json!("x")],
            }))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn dictionaries_filter_by_category() {
        let (_tmp, server) = server();
        let all = server
            .wordhoard_dictionaries(Parameters(DictionariesParams::default()))
            .await
            .unwrap();
        assert!(text_of(&all).contains("高考核心 [高考]"));

        let none = server
            .wordhoard_dictionaries(Parameters(DictionariesParams {
                category: Some("GRE".to_string()),
            }))
            .await
            .unwrap();
        let structured = none.structured_content.expect("structured");
        assert!(structured["dictionaries"].as_array().unwrap().is_empty());
    }
}
