//! Summarisation and translation services.
//!
//! The pipeline never calls these; they run on demand from the CLI against
//! stored articles and the results are written back with
//! [`ArticleStore::update_field`](crate::store::ArticleStore::update_field).
//!
//! | Provider | Summary | Translation |
//! |----------|---------|-------------|
//! | `disabled` | placeholder | placeholder |
//! | `extractive` | offline sentence ranking | placeholder |
//! | `openai` | chat completion | chat completion |
//!
//! The `openai` provider reads `OPENAI_API_KEY` from the environment. Without
//! it every call degrades to the placeholder instead of failing.

use anyhow::{bail, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::html::clean_text;
use crate::models::Article;

pub const SUMMARY_UNAVAILABLE: &str =
    "_AI summary unavailable (missing OPENAI_API_KEY in secrets)._";
pub const TRANSLATION_UNAVAILABLE: &str =
    "_Translation unavailable (missing OPENAI_API_KEY in secrets)._";

const NOT_STATED: &str = "Not stated";

/// Text-in/text-out service for stored articles.
#[async_trait]
pub trait TextService: Send + Sync {
    fn name(&self) -> &str;

    /// Markdown summary of `text`.
    async fn summarize(&self, text: &str) -> Result<String>;

    /// `text` rendered in `target_language`.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Build the service selected by `[ai].provider`.
pub fn create_service(config: &AiConfig) -> Result<Arc<dyn TextService>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(UnavailableService)),
        "extractive" => Ok(Arc::new(ExtractiveSummarizer::default())),
        "openai" => Ok(Arc::new(OpenAiService::new(
            config.clone(),
            std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        )?)),
        other => bail!("Unknown ai provider: '{}'", other),
    }
}

/// Deterministic "Document context" block built from stored metadata.
pub fn document_context(article: &Article) -> String {
    fn or_not_stated(value: Option<&str>) -> &str {
        value.filter(|v| !v.trim().is_empty()).unwrap_or(NOT_STATED)
    }

    format!(
        "### Document context\n\
         **Publisher:** {}  \n\
         **Published:** {}  \n\
         **Category:** {}  \n\
         **Topics:** {}  \n\n\
         This is an official Welsh Government page. The sections below \
         (summary/translation) are generated from the document text.",
        or_not_stated(article.organisations.as_deref()),
        or_not_stated(article.published.as_deref()),
        or_not_stated(Some(article.category.as_str())),
        or_not_stated(article.topics.as_deref()),
    )
}

/// Always answers with the "unavailable" placeholders.
pub struct UnavailableService;

#[async_trait]
impl TextService for UnavailableService {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn summarize(&self, _text: &str) -> Result<String> {
        Ok(SUMMARY_UNAVAILABLE.to_string())
    }

    async fn translate(&self, _text: &str, _target_language: &str) -> Result<String> {
        Ok(TRANSLATION_UNAVAILABLE.to_string())
    }
}

// ============ Extractive ============

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]{3,}").expect("valid word pattern"));

/// Offline summariser: keeps the sentences whose words are most frequent
/// across the whole document.
pub struct ExtractiveSummarizer {
    pub max_sentences: usize,
    /// Texts shorter than this are returned as-is.
    pub min_chars: usize,
    /// Sentences must be longer than this to be candidates.
    pub min_sentence_chars: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self {
            max_sentences: 6,
            min_chars: 200,
            min_sentence_chars: 30,
        }
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase())
}

impl ExtractiveSummarizer {
    pub fn summarize_text(&self, text: &str) -> String {
        if text.chars().count() < self.min_chars {
            return text.trim().to_string();
        }

        let normalized = clean_text(text);
        let sentences: Vec<String> = split_sentences(&normalized)
            .into_iter()
            .filter(|s| s.chars().count() > self.min_sentence_chars)
            .collect();
        if sentences.len() <= self.max_sentences {
            return sentences.join("\n");
        }

        let mut freq: HashMap<String, usize> = HashMap::new();
        for word in words(&normalized) {
            *freq.entry(word).or_default() += 1;
        }

        let score = |sentence: &str| -> f64 {
            let ws: Vec<String> = words(sentence).collect();
            if ws.is_empty() {
                return 0.0;
            }
            let total: usize = ws.iter().map(|w| freq.get(w).copied().unwrap_or(0)).sum();
            total as f64 / (ws.len() + 1) as f64
        };

        let mut ranked: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| (i, score(s)))
            .collect();
        // Stable sort: equal scores keep document order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut chosen: Vec<usize> = ranked
            .into_iter()
            .take(self.max_sentences)
            .map(|(i, _)| i)
            .collect();
        chosen.sort_unstable();

        chosen
            .into_iter()
            .map(|i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextService for ExtractiveSummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(self.summarize_text(text))
    }

    async fn translate(&self, _text: &str, _target_language: &str) -> Result<String> {
        Ok(TRANSLATION_UNAVAILABLE.to_string())
    }
}

// ============ OpenAI ============

const SUMMARY_SYSTEM: &str =
    "Be accurate, non-hallucinating, concise. If unknown, say 'Not stated'.";
const TRANSLATE_SYSTEM: &str = "Translate faithfully and professionally.";

fn summary_prompt(text: &str) -> String {
    format!(
        "You summarise Welsh Government documents.\n\n\
         Return EXACTLY this markdown:\n\n\
         ### Key points\n- ...\n- ...\n- ...\n- ...\n- ...\n\n\
         ### What changed / what's new\n1-2 bullets.\n\n\
         ### Why it matters\n2-3 sentences, practical.\n\n\
         ### Who is affected\nA short list.\n\n\
         Document text:\n{}\n",
        text
    )
}

fn translate_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following government document into {}.\n\
         Rules:\n\
         - Keep meaning faithful; do not add facts.\n\
         - Keep official tone.\n\
         - Preserve lists and headings.\n\n\
         TEXT:\n{}\n",
        target_language, text
    )
}

/// First `max_chars` characters of `text`, never splitting a code point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Chat-completions client with retry on 429 and 5xx.
pub struct OpenAiService {
    config: AiConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiService {
    pub fn new(config: AiConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn complete(&self, api_key: &str, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.config.url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        warn!(%status, attempt, "Chat completion failed; retrying");
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    debug!(error = %e, attempt, "Chat completion request failed");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

#[async_trait]
impl TextService for OpenAiService {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(SUMMARY_UNAVAILABLE.to_string());
        };
        let text = clean_text(text);
        let prompt = summary_prompt(truncate_chars(&text, self.config.max_input_chars));
        self.complete(api_key, SUMMARY_SYSTEM, &prompt).await
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(TRANSLATION_UNAVAILABLE.to_string());
        };
        let text = clean_text(text);
        let prompt = translate_prompt(
            truncate_chars(&text, self.config.max_input_chars),
            target_language,
        );
        self.complete(api_key, TRANSLATE_SYSTEM, &prompt).await
    }
}
