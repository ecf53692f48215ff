//! Gemini-backed ranking oracle.
//!
//! Calls the Google Generative Language `generateContent` endpoint
//! with the ranking prompt and returns the raw model text. Validation
//! of the ranking contract happens downstream; this client only deals
//! with transport, response extraction, and the markdown code fences
//! some models wrap JSON in.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::rank::RankInput;

use super::error::{classify_http_status, OracleError, OracleErrorKind};
use super::{prompt, RankingOracle};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model for ranking requests.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    /// Strip a single surrounding markdown code fence, if present.
    ///
    /// Models occasionally answer with ```json ... ``` despite the
    /// JSON response mime type.
    fn strip_code_fence(text: &str) -> &str {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let Some(body) = rest.strip_suffix("```") else {
            return trimmed;
        };
        // drop the optional language tag on the opening fence
        match body.split_once('\n') {
            Some((first_line, remainder)) if !first_line.trim().contains(' ') => remainder.trim(),
            _ => body.trim(),
        }
    }
}

#[async_trait]
impl RankingOracle for GeminiClient {
    async fn rank(&self, batch: &[RankInput], today: NaiveDate) -> Result<String, OracleError> {
        let tasks_json = serde_json::to_string(batch)
            .map_err(|e| OracleError::empty_response(format!("Failed to encode batch: {}", e)))?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt::render(&tasks_json, today),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.3,
                top_k: 32,
                top_p: 0.9,
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        tracing::debug!("Sending ranking request: model={} n={}", self.model, batch.len());

        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(OracleError::network_error(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(OracleError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(OracleError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let code = status.as_u16();
            return Err(match classify_http_status(code) {
                OracleErrorKind::ClientError => OracleError::client_error(code, body),
                _ => OracleError::server_error(code, body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            OracleError::empty_response(format!("Failed to parse response envelope: {}", e))
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::empty_response(
                "Oracle returned no candidate text".to_string(),
            ));
        }

        Ok(Self::strip_code_fence(&text).to_string())
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f64,
}

/// `generateContent` response envelope (only what we read).
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
