//! Gemini text generation over the public REST API.

use super::{Generated, TextGenerator};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const COLLABORATOR: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the `generateContent` endpoint.
///
/// Grounded calls enable the `google_search` tool and return the web
/// sources listed in the response's grounding metadata.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a client for `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| CollaboratorError::failed(COLLABORATOR, e.to_string()))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateResponse {
    fn into_generated(self, grounded: bool) -> Result<Generated, CollaboratorError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CollaboratorError::failed(COLLABORATOR, "response has no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CollaboratorError::failed(COLLABORATOR, "response has no text"));
        }
        if !grounded {
            return Ok(Generated::Text(text));
        }

        let sources = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| match (web.title, web.uri) {
                        (Some(title), Some(uri)) => Some(format!("{title} ({uri})")),
                        (None, Some(uri)) => Some(uri),
                        (Some(title), None) => Some(title),
                        (None, None) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Generated::Grounded { text, sources })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, grounded: bool) -> Result<Generated, CollaboratorError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: if grounded {
                vec![Tool {
                    google_search: serde_json::json!({}),
                }]
            } else {
                Vec::new()
            },
        };

        debug!(model = %self.model, grounded, prompt_len = prompt.len(), "Calling Gemini");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::failed(COLLABORATOR, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::failed(COLLABORATOR, e.to_string()))?;
        if !status.is_success() {
            return Err(CollaboratorError::failed(COLLABORATOR, format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| CollaboratorError::failed(COLLABORATOR, format!("invalid response: {e}")))?;
        parsed.into_generated(grounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(body: &str) -> GenerateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_plain_response() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#);
        assert_eq!(response.into_generated(false).unwrap(), Generated::Text("Hello world".into()));
    }

    #[test]
    fn test_grounded_response_sources() {
        let response = parse(
            r#"{"candidates":[{
                "content":{"parts":[{"text":"Trends"}]},
                "groundingMetadata":{"groundingChunks":[
                    {"web":{"uri":"https://a.example","title":"A"}},
                    {"web":{"uri":"https://b.example"}},
                    {}
                ]}
            }]}"#,
        );
        assert_eq!(
            response.into_generated(true).unwrap(),
            Generated::Grounded {
                text: "Trends".into(),
                sources: vec!["A (https://a.example)".into(), "https://b.example".into()],
            }
        );
    }

    #[test]
    fn test_empty_candidates() {
        let err = parse(r#"{"candidates":[]}"#).into_generated(false).unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hi" }],
            }],
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"contents":[{"parts":[{"text":"hi"}]}],"tools":[{"google_search":{}}]})
        );
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("key", "gemini-2.5-flash")
            .unwrap()
            .with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(client.endpoint(), "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent");
    }
}
