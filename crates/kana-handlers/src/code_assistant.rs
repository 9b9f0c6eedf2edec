//! Delegation to the `claude` CLI for code/debugging questions, with the
//! raw answer wrapped through the model for persona tone.

use crate::{process::run_command, Handler};
use async_trait::async_trait;
use kana_core::{error::KanaError, outcome::Outcome};
use kana_providers::GeminiClient;
use std::time::Duration;
use tracing::{info, warn};

const TRIGGER_KW: &[&str] = &[
    "クロード", "claude",
    "コード書いて", "プログラム",
    "エラー", "バグ", "デバッグ",
    "実装",
];

/// Fallback text wrapped through the model when the CLI itself fails.
const CLI_FAILURE_TEXT: &str = "クロードに聞けなかったみたいです…";

pub struct CodeAssistantHandler {
    model: GeminiClient,
    system_prompt: String,
    timeout: Duration,
}

impl CodeAssistantHandler {
    pub fn new(model: GeminiClient, system_prompt: String, timeout_secs: u64) -> Self {
        Self {
            model,
            system_prompt,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Handler for CodeAssistantHandler {
    fn name(&self) -> &str {
        "code-assistant"
    }

    fn detect(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        TRIGGER_KW.iter().any(|kw| lower.contains(&kw.to_lowercase()))
    }

    /// Always delegates and wraps. CLI failures are softened into the
    /// wrap prompt; model failures propagate to the pipeline's error path.
    /// The wrap call is deliberately context-free: the prompt carries the
    /// full raw answer, so no conversation history is sent.
    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        info!("code-assistant: delegating to claude CLI");
        let raw = match run_command("claude", &["-p", text], None, self.timeout, "claude CLI").await
        {
            Ok(stdout) => stdout,
            Err(e) => {
                warn!("claude CLI failed: {e}");
                CLI_FAILURE_TEXT.to_string()
            }
        };

        let reply = self
            .model
            .generate(&self.system_prompt, &[], &wrap_prompt(&raw), false)
            .await?;

        Ok(Some(Outcome::from_model_reply(&reply)))
    }
}

/// Tone-normalization prompt: keep the technical content, answer in persona.
fn wrap_prompt(raw: &str) -> String {
    format!(
        "以下の技術的な回答をカナちゃんの口調で簡潔に伝えて。\
         専門用語はそのまま使ってOK。JSON形式で出力して：\n\n{raw}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kana_core::config::GeminiConfig;

    fn handler() -> CodeAssistantHandler {
        CodeAssistantHandler::new(
            GeminiClient::from_config(&GeminiConfig::default()),
            "persona".into(),
            120,
        )
    }

    #[test]
    fn test_detects_code_queries_case_insensitive() {
        let h = handler();
        assert!(h.detect("Claudeに聞いて"));
        assert!(h.detect("クロード、これどう思う？"));
        assert!(h.detect("このバグ直して"));
        assert!(h.detect("エラーが出てる"));
        assert!(!h.detect("今日の予定は？"));
    }

    #[test]
    fn test_wrap_prompt_embeds_raw_answer() {
        let prompt = wrap_prompt("Use `cargo clippy`.");
        assert!(prompt.contains("Use `cargo clippy`."));
        assert!(prompt.contains("JSON形式"));
    }
}
