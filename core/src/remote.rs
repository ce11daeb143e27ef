//! Remote analyzer client.
//!
//! Talks to the relay's OpenAI-compatible surface (`/v1/models`,
//! `/v1/chat/completions`). Long text is split into fixed-size chunks
//! processed sequentially so suggestion offsets stay simple to correct; a
//! malformed chunk result degrades to an empty set instead of failing the
//! whole analysis. Transient transport failures are retried with
//! exponential backoff; HTTP-status and payload errors are not.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RemoteAnalysisError;
use crate::suggestion::{Category, Severity, Suggestion, SuggestionSet};
use crate::RewriteMode;

/// Header carrying the caller-supplied proxy credential.
pub const PROXY_TOKEN_HEADER: &str = "x-cdraft-proxy-token";

const CHUNK_SIZE: usize = 8000;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

const ANALYSE_SYSTEM_PROMPT: &str = "You are a meticulous British-English copy editor. \
Return STRICT JSON: {\"grammar\":[],\"clarity\":[],\"tone\":[]}. Each array contains edits as \
{\"message\":str,\"start\":int,\"end\":int,\"replacement\":str|null}. Indices refer to the given text.";

const REWRITE_SYSTEM_PROMPT: &str =
    "You are a careful British-English editor. Preserve meaning precisely.";

/// Remote analyzer endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub model: String,
    pub proxy_token: Option<String>,
    /// Whether analysis cycles consult the remote analyzer at all.
    pub enabled: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3333".into(),
            model: "gpt-4o-mini".into(),
            proxy_token: None,
            enabled: false,
        }
    }
}

/// A model offered by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
}

/// Built-in fallback list used when the relay cannot be reached.
pub fn default_models() -> Vec<ModelInfo> {
    [
        ("gpt-4o", "GPT-4o"),
        ("gpt-4o-mini", "GPT-4o Mini"),
        ("gpt-4-turbo", "GPT-4 Turbo"),
        ("gpt-4", "GPT-4"),
        ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
    ]
    .into_iter()
    .map(|(id, name)| ModelInfo {
        id: id.into(),
        display_name: name.into(),
    })
    .collect()
}

/// Result of a credential/connectivity check. Never an error: every failure
/// mode maps to a user-visible message.
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub ok: bool,
    pub status: String,
    pub message: String,
}

impl ApiStatus {
    fn success(message: &str) -> Self {
        Self {
            ok: true,
            status: "success".into(),
            message: message.into(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            ok: false,
            status: "error".into(),
            message,
        }
    }
}

/// HTTP client for the remote analyzer, reusable across requests.
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: Option<String>,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token: config.proxy_token.clone(),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Analyze `text`, chunking it to respect request-size limits.
    ///
    /// Chunks are processed sequentially; each chunk's spans are shifted by
    /// the chunk's byte offset before merging. A chunk whose payload cannot
    /// be parsed contributes an empty set; a failed request fails the whole
    /// analysis.
    pub async fn analyze(&self, text: &str) -> Result<SuggestionSet, RemoteAnalysisError> {
        if self.endpoint.is_empty() {
            return Err(RemoteAnalysisError::MissingEndpoint);
        }

        let chunks = chunk_text(text, CHUNK_SIZE);
        let total = chunks.len();
        let mut set = SuggestionSet::default();

        for (index, (offset, chunk)) in chunks.iter().enumerate() {
            let body = json!({
                "model": self.model,
                "response_format": {"type": "json_object"},
                "temperature": 0.1,
                "messages": [
                    {
                        "role": "system",
                        "content": ANALYSE_SYSTEM_PROMPT,
                        "cache_control": {"type": "ephemeral"},
                    },
                    {
                        "role": "user",
                        "content": format!("Text (chunk {}/{}):\n{}", index + 1, total, chunk),
                    },
                ],
            });

            let content = self.chat_completion(body).await?;
            let Some(data) = parse_chunk_payload(&content) else {
                tracing::warn!(
                    chunk = index + 1,
                    total,
                    "failed to parse remote analysis payload; skipping chunk"
                );
                continue;
            };
            collect_edits(&mut set.grammar, &data, "grammar", Category::Grammar, *offset, text);
            collect_edits(&mut set.clarity, &data, "clarity", Category::Clarity, *offset, text);
            collect_edits(&mut set.tone, &data, "tone", Category::Tone, *offset, text);
        }

        Ok(set)
    }

    /// Rewrite the whole text (no chunking) in the requested register.
    pub async fn rewrite(
        &self,
        text: &str,
        mode: RewriteMode,
    ) -> Result<String, RemoteAnalysisError> {
        if self.endpoint.is_empty() {
            return Err(RemoteAnalysisError::MissingEndpoint);
        }

        let body = json!({
            "model": self.model,
            "temperature": 0.25,
            "messages": [
                {
                    "role": "system",
                    "content": REWRITE_SYSTEM_PROMPT,
                    "cache_control": {"type": "ephemeral"},
                },
                {
                    "role": "user",
                    "content": format!("{}\n\nText:\n\"\"\"{}\"\"\"", mode.instruction(), text),
                },
            ],
        });

        let content = self.chat_completion(body).await?;
        if content.is_empty() {
            return Err(RemoteAnalysisError::Payload(
                "rewrite returned empty output".into(),
            ));
        }
        Ok(content)
    }

    /// List models offered by the relay, filtered to recognised families.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, RemoteAnalysisError> {
        if self.endpoint.is_empty() {
            return Err(RemoteAnalysisError::MissingEndpoint);
        }

        let url = format!("{}/v1/models", self.endpoint);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header(PROXY_TOKEN_HEADER, token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteAnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RemoteAnalysisError::Payload(e.to_string()))?;
        let models = value
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                    .filter(|id| id.contains("gpt") || id.contains("o1"))
                    .map(|id| ModelInfo {
                        id: id.to_string(),
                        display_name: display_model_name(id),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }

    /// Probe the relay and translate the outcome into a user-visible status.
    pub async fn check_credentials(&self) -> ApiStatus {
        if self.endpoint.is_empty() {
            return ApiStatus::error("No endpoint configured".into());
        }

        let url = format!("{}/v1/models", self.endpoint);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header(PROXY_TOKEN_HEADER, token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                ApiStatus::success("Available via proxy")
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".into());
                let message = match status {
                    401 if body.contains("proxy token") => "Proxy: token rejected".into(),
                    401 => "Proxy: API key missing".into(),
                    404 => "Proxy: endpoint missing".into(),
                    other => format!("Proxy: error {other}"),
                };
                ApiStatus::error(message)
            }
            Err(err) if err.is_connect() => ApiStatus::error("Proxy unreachable".into()),
            Err(_) => ApiStatus::error("Check failed".into()),
        }
    }

    /// One chat completion with retry on transient transport failures.
    async fn chat_completion(&self, body: Value) -> Result<String, RemoteAnalysisError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let mut attempt = 0u32;
        loop {
            match self.send_chat(&url, &body).await {
                Ok(content) => return Ok(content),
                Err(RemoteAnalysisError::Transport(err))
                    if attempt < MAX_RETRIES && is_transient(&err) =>
                {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "transient transport failure; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn send_chat(&self, url: &str, body: &Value) -> Result<String, RemoteAnalysisError> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.header(PROXY_TOKEN_HEADER, token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteAnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RemoteAnalysisError::Payload(e.to_string()))?;
        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(content)
    }
}

/// Connection-class failures are worth retrying; HTTP statuses and payload
/// problems are not.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Split into contiguous chunks of at most `chunk_size` bytes, snapping each
/// boundary back onto a char boundary. Each chunk carries its byte offset
/// into the full text.
fn chunk_text(text: &str, chunk_size: usize) -> Vec<(usize, &str)> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push((start, &text[start..end]));
        start = end;
    }
    chunks
}

/// Strict result shape: an object with all three category keys. Anything
/// else counts as malformed and yields no suggestions for the chunk.
fn parse_chunk_payload(content: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(content).ok()?;
    let complete = ["grammar", "clarity", "tone"]
        .iter()
        .all(|key| value.get(*key).is_some());
    complete.then_some(value)
}

/// Validate and offset-correct one category's edits. An edit needs a
/// non-empty message and numeric start/end; corrected spans that fall
/// outside the snapshot (or off a char boundary) are dropped with a warning.
fn collect_edits(
    out: &mut Vec<Suggestion>,
    data: &Value,
    key: &str,
    category: Category,
    offset: usize,
    snapshot: &str,
) {
    let Some(items) = data.get(key).and_then(Value::as_array) else {
        return;
    };
    for item in items {
        let (Some(message), Some(start), Some(end)) = (
            item.get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty()),
            item.get("start").and_then(Value::as_u64),
            item.get("end").and_then(Value::as_u64),
        ) else {
            tracing::warn!(suggestion = %item, "dropping malformed remote suggestion");
            continue;
        };

        let span = (start as usize + offset, end as usize + offset);
        if span.0 > span.1
            || span.1 > snapshot.len()
            || !snapshot.is_char_boundary(span.0)
            || !snapshot.is_char_boundary(span.1)
        {
            tracing::warn!(
                start = span.0,
                end = span.1,
                "dropping remote suggestion with out-of-range span"
            );
            continue;
        }

        out.push(Suggestion {
            id: format!("llm-{category}-{offset}-{start}-{end}"),
            category,
            severity: Severity::Medium,
            message: message.to_string(),
            span,
            replacement: item
                .get("replacement")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
}

fn display_model_name(id: &str) -> String {
    let renamed = match id.strip_prefix("gpt-") {
        Some(rest) => format!("GPT-{rest}"),
        None => id.to_string(),
    };
    renamed
        .replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_the_text_contiguously() {
        let text = "a".repeat(20_000);
        let chunks = chunk_text(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0, 0);
        assert_eq!(chunks[1].0, 8000);
        assert_eq!(chunks[2].0, 16_000);
        assert_eq!(chunks[2].1.len(), 4000);
    }

    #[test]
    fn chunk_boundaries_respect_multibyte_chars() {
        // Three-byte characters: 8000 is not a boundary, so the split snaps
        // back to 7998.
        let text = "\u{2713}".repeat(3000);
        let chunks = chunk_text(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].1.len(), 7998);
        assert_eq!(chunks[1].0, 7998);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(chunk_text("", CHUNK_SIZE).is_empty());
    }

    #[test]
    fn payload_requires_all_three_categories() {
        assert!(parse_chunk_payload(r#"{"grammar":[],"clarity":[],"tone":[]}"#).is_some());
        assert!(parse_chunk_payload(r#"{"grammar":[],"clarity":[]}"#).is_none());
        assert!(parse_chunk_payload("not json").is_none());
    }

    #[test]
    fn collect_edits_offsets_and_validates() {
        let snapshot = "x".repeat(100);
        let data: Value = serde_json::from_str(
            r#"{"grammar": [
                {"message": "ok", "start": 1, "end": 4, "replacement": "y"},
                {"message": "", "start": 1, "end": 4},
                {"message": "no offsets"},
                {"message": "oob", "start": 90, "end": 95}
            ]}"#,
        )
        .unwrap();

        let mut out = Vec::new();
        collect_edits(&mut out, &data, "grammar", Category::Grammar, 10, &snapshot);

        // The empty message, the offset-free entry, and the edit shifted to
        // 100..105 (past the snapshot end) are all dropped.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].span, (11, 14));
        assert_eq!(out[0].severity, Severity::Medium);
        assert_eq!(out[0].replacement.as_deref(), Some("y"));
    }

    #[test]
    fn missing_replacement_means_flag_only() {
        let data: Value =
            serde_json::from_str(r#"{"tone": [{"message": "passive", "start": 0, "end": 2}]}"#)
                .unwrap();
        let mut out = Vec::new();
        collect_edits(&mut out, &data, "tone", Category::Tone, 0, "abcdef");
        assert_eq!(out.len(), 1);
        assert!(out[0].replacement.is_none());
    }

    #[test]
    fn model_names_are_prettified() {
        assert_eq!(display_model_name("gpt-4o-mini"), "GPT 4o Mini");
        assert_eq!(display_model_name("gpt-3.5-turbo"), "GPT 3.5 Turbo");
        assert_eq!(display_model_name("o1-preview"), "O1 Preview");
    }

    #[test]
    fn default_models_cover_the_common_families() {
        let models = default_models();
        assert_eq!(models.len(), 5);
        assert!(models.iter().any(|m| m.id == "gpt-4o-mini"));
    }
}
