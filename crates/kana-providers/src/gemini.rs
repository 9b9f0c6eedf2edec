//! Google Gemini model gateway.
//!
//! Calls the `generateContent` endpoint with the bounded conversation
//! window, the persona system instruction, and — in grounded mode — the
//! web-search tool. Auth via URL query param.

use async_trait::async_trait;
use kana_core::{
    config::GeminiConfig,
    context::{Role, Turn},
    error::KanaError,
    traits::ModelBackend,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client. Clone-cheap (reqwest client is an Arc internally).
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_history: usize,
}

impl GeminiClient {
    /// Create from config values.
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_history: config.max_history,
        }
    }

    /// One model call. `grounded` attaches the web-search tool.
    ///
    /// History is trimmed to the most recent `max_history` turns before the
    /// call. The reply is the **last** text part of the first candidate —
    /// with grounding the model may return several parts and the final one
    /// is the answer synthesized after tool use.
    pub async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
        grounded: bool,
    ) -> Result<String, KanaError> {
        let start = Instant::now();

        let window = &history[history.len().saturating_sub(self.max_history)..];
        let mut contents: Vec<GeminiContent> = window
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::Assistant => "model",
                    Role::User => "user",
                };
                GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart {
                        text: turn.content.clone(),
                    }],
                }
            })
            .collect();

        contents.push(GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: message.to_string(),
            }],
        });

        let system_instruction = if system_prompt.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_prompt.to_string(),
                }],
            })
        };

        let tools = grounded.then(|| {
            vec![GeminiTool {
                google_search: GoogleSearch {},
            }]
        });

        let body = GeminiRequest {
            contents,
            system_instruction,
            tools,
        };

        let url = format!(
            "{GEMINI_BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        debug!(
            "gemini: POST models/{}:generateContent (grounded: {grounded})",
            self.model
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| KanaError::Upstream(format!("gemini request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 || embedded_error_code(&text) == Some(429) {
                return Err(KanaError::RateLimited);
            }
            return Err(KanaError::Upstream(format!("gemini returned {status}: {text}")));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| KanaError::Upstream(format!("gemini: failed to parse response: {e}")))?;

        if let Some(error) = parsed.error {
            if error.code == Some(429) {
                return Err(KanaError::RateLimited);
            }
            return Err(KanaError::Upstream(
                error.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let text = parsed
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.last())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        if text.is_empty() {
            warn!("gemini: empty reply (no candidates or parts)");
        }
        debug!("gemini: responded in {}ms", start.elapsed().as_millis());

        Ok(text)
    }

    /// Probe availability with a cheap model-list request.
    pub async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("gemini: no API key configured");
            return false;
        }
        let url = format!("{GEMINI_BASE_URL}/models?key={}", self.api_key);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("gemini not available: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
        grounded: bool,
    ) -> Result<String, KanaError> {
        GeminiClient::generate(self, system_prompt, history, message, grounded).await
    }
}

/// Pull `error.code` out of a raw error body, if present.
fn embedded_error_code(body: &str) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.get("code")?.as_i64()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<i64>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kana_core::config::GeminiConfig;

    fn client() -> GeminiClient {
        GeminiClient::from_config(&GeminiConfig {
            api_key: "AIza-test".into(),
            model: "gemini-2.0-flash".into(),
            max_history: 2,
        })
    }

    #[test]
    fn test_request_serialization_plain() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart { text: "こんにちは".into() }],
            }],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "ペルソナ".into() }],
            }),
            tools: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("systemInstruction").is_some());
        assert!(json.get("tools").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn test_request_serialization_grounded() {
        let body = GeminiRequest {
            contents: vec![],
            system_instruction: None,
            tools: Some(vec![GeminiTool {
                google_search: GoogleSearch {},
            }]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn test_response_takes_last_part() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[
            {"text":"searching..."},
            {"text":"最終回答です"}
        ]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.last())
            .map(|p| p.text.clone());
        assert_eq!(text, Some("最終回答です".into()));
    }

    #[test]
    fn test_embedded_error_code() {
        let body = r#"{"error":{"code":429,"message":"quota"}}"#;
        assert_eq!(embedded_error_code(body), Some(429));
        assert_eq!(embedded_error_code("not json"), None);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let client = client();
        let history: Vec<Turn> = (0..5)
            .map(|i| Turn::new(Role::User, format!("m{i}")))
            .collect();
        let window = &history[history.len().saturating_sub(client.max_history)..];
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "m3");
    }
}
