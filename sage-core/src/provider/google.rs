//! Google Gemini provider implementation
//!
//! Talks to the Google AI Studio `generateContent` REST endpoint.
//! Note: model names must NOT carry a `-latest` suffix; the API rejects it.

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    config: ProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.timeout_secs.unwrap_or(120),
            ))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
    }
}

impl LlmProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn default_model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or("gemini-1.5-flash")
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(self.default_model())
            .trim_end_matches("-latest");

        // Gemini takes the system prompt out-of-band and calls the
        // assistant role "model"
        let mut system_instruction = None;
        let mut contents = Vec::new();
        for msg in &request.messages {
            match msg.role {
                Role::System => {
                    system_instruction = Some(GeminiContent {
                        role: None,
                        parts: vec![GeminiPart {
                            text: msg.content.clone(),
                        }],
                    });
                }
                Role::User => contents.push(GeminiContent {
                    role: Some("user".into()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
                Role::Assistant => contents.push(GeminiContent {
                    role: Some("model".into()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        let api_request = GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        };

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url(),
            model,
            api_key
        );

        let response = self
            .client
            .post(url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();

            if status == 429 {
                return Err(ProviderError::RateLimited { retry_after: None });
            } else if status == 401 || status == 403 {
                return Err(ProviderError::AuthenticationFailed);
            } else if status == 404 {
                return Err(ProviderError::ModelNotFound(model.to_string()));
            }

            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = api_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .filter(|s| !s.is_empty());

        let usage = api_response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            model: model.to_string(),
            content,
            usage,
        })
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}
