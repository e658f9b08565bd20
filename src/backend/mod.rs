//! LLM backend adapter
//!
//! Uniform call signature over the three vendor integrations: one
//! [`BackendClient::invoke`] that attaches the report PDF inline, sends the
//! shared extraction instruction, and returns the model's raw text for the
//! normalizer. Vendor wire formats are confined to this module.
//!
//! The adapter performs no parsing and no retries of its own; rate-limit
//! retry policy belongs to the single-backend call path and escalation
//! policy to the orchestrator.

pub mod prompt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::BackendSettings;
use crate::error::{BackendError, Error};
use crate::models::DraftRecord;
use prompt::ChunkContext;

/// Identifier of one LLM vendor integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Cheap/fast primary
    Gemini,
    /// High-accuracy secondary
    Openai,
    /// Last-resort tertiary
    Claude,
}

impl BackendId {
    /// Stable string form used in logs, API responses, and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Openai => "openai",
            Self::Claude => "claude",
        }
    }

    /// Parse from the API's backendSelector value
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "openai" | "gpt" | "gpt-4o" => Some(Self::Openai),
            "claude" | "anthropic" => Some(Self::Claude),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Minimal response shapes; only the text part is extracted.

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

/// Client for the three LLM backends
pub struct BackendClient {
    client: Client,
    settings: BackendSettings,
}

impl BackendClient {
    /// Create a client from backend settings
    pub fn new(settings: BackendSettings) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Whether a credential is configured for the given backend
    pub fn is_configured(&self, backend: BackendId) -> bool {
        match backend {
            BackendId::Gemini => self.settings.gemini.is_configured(),
            BackendId::Openai => self.settings.openai.is_configured(),
            BackendId::Claude => self.settings.claude.is_configured(),
        }
    }

    /// Invoke one backend with the document attached inline and the draft
    /// embedded in the instruction. Returns the model's raw text output.
    pub async fn invoke(
        &self,
        backend: BackendId,
        payload: &Bytes,
        draft: &DraftRecord,
        chunk: Option<ChunkContext>,
    ) -> Result<String, BackendError> {
        let instruction = prompt::build_instruction(draft, chunk);
        let document = BASE64.encode(payload);

        debug!(
            backend = %backend,
            payload_bytes = payload.len(),
            "Invoking backend"
        );

        match backend {
            BackendId::Gemini => self.invoke_gemini(&instruction, &document).await,
            BackendId::Openai => self.invoke_openai(&instruction, &document).await,
            BackendId::Claude => self.invoke_claude(&instruction, &document).await,
        }
    }

    async fn invoke_gemini(
        &self,
        instruction: &str,
        document: &str,
    ) -> Result<String, BackendError> {
        let backend = BackendId::Gemini;
        let config = &self.settings.gemini;
        let key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(BackendError::Unavailable(backend))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            config.endpoint, config.model, key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    {"inline_data": {"mime_type": "application/pdf", "data": document}},
                    {"text": instruction}
                ]
            }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens
            }
        });

        let response = self.post(backend, &url, &body, &[]).await?;
        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Http { backend, source })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(BackendError::EmptyResponse(backend))
    }

    async fn invoke_openai(
        &self,
        instruction: &str,
        document: &str,
    ) -> Result<String, BackendError> {
        let backend = BackendId::Openai;
        let config = &self.settings.openai;
        let key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(BackendError::Unavailable(backend))?;

        let url = format!("{}/v1/chat/completions", config.endpoint);
        let body = json!({
            "model": config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "file",
                        "file": {
                            "filename": "report.pdf",
                            "file_data": format!("data:application/pdf;base64,{document}")
                        }
                    },
                    {"type": "text", "text": instruction}
                ]
            }],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens
        });

        let auth = format!("Bearer {key}");
        let response = self
            .post(backend, &url, &body, &[("Authorization", auth.as_str())])
            .await?;
        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Http { backend, source })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|t| !t.is_empty())
            .ok_or(BackendError::EmptyResponse(backend))
    }

    async fn invoke_claude(
        &self,
        instruction: &str,
        document: &str,
    ) -> Result<String, BackendError> {
        let backend = BackendId::Claude;
        let config = &self.settings.claude;
        let key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(BackendError::Unavailable(backend))?;

        let url = format!("{}/v1/messages", config.endpoint);
        let body = json!({
            "model": config.model,
            "max_tokens": self.settings.max_output_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "document",
                        "source": {
                            "type": "base64",
                            "media_type": "application/pdf",
                            "data": document
                        }
                    },
                    {"type": "text", "text": instruction}
                ]
            }]
        });

        let response = self
            .post(
                backend,
                &url,
                &body,
                &[("x-api-key", key), ("anthropic-version", "2023-06-01")],
            )
            .await?;
        let parsed: ClaudeResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Http { backend, source })?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .filter(|t| !t.is_empty())
            .ok_or(BackendError::EmptyResponse(backend))
    }

    /// Place one POST, mapping transport failures, timeouts, 429, and other
    /// non-success statuses to [`BackendError`] variants
    async fn post(
        &self,
        backend: BackendId,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, BackendError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|source| {
            if source.is_timeout() {
                BackendError::Timeout(backend)
            } else {
                BackendError::Http { backend, source }
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited(backend));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                backend,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}
