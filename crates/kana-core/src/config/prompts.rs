//! Persona / system prompt loading.

use super::{shellexpand, PersonaConfig};

/// Built-in persona used when no prompt file exists. Instructs the model to
/// emit the `{display, speak}` JSON shape and the `<search>` marker the
/// escalation policy looks for.
const DEFAULT_SYSTEM_PROMPT: &str = r#"あなたは「カナ」、音声対話アシスタントです。
明るくフレンドリーな口調で、簡潔に答えてください。

出力は必ず次のJSON形式で返してください：
{"display": "画面に表示するテキスト", "speak": "読み上げ用のテキスト"}

- display: 記号や数字をそのまま使ってOK
- speak: 読み上げやすいように、英略語はカタカナに開いてください（例: API → エーピーアイ）

過去の会話を参照する必要がある質問には、本文の代わりに
<search>キーワード</search> だけを出力してください。"#;

/// Load the system prompt from the configured file, falling back to the
/// built-in persona.
pub fn load_system_prompt(persona: &PersonaConfig) -> String {
    let path = shellexpand(&persona.prompt_path);
    match std::fs::read_to_string(&path) {
        Ok(content) if !content.trim().is_empty() => content,
        Ok(_) => {
            tracing::warn!("persona file {path} is empty, using built-in persona");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(_) => {
            tracing::info!("persona file {path} not found, using built-in persona");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_persona_mentions_contract() {
        let prompt = load_system_prompt(&PersonaConfig {
            prompt_path: "/nonexistent/persona.txt".into(),
        });
        assert!(prompt.contains("display"));
        assert!(prompt.contains("speak"));
        assert!(prompt.contains("<search>"));
    }
}
