//! One chat turn, end to end: validate, route, remember, speak.
//!
//! Routing order is fixed: registered handlers first (priority order),
//! then search-intent on the raw utterance, then the plain model with the
//! escalation policy. Only a committed turn is pushed to context and
//! persisted; failing turns leave no trace.

use super::escalation::{self, Decision};
use super::{ChatReply, Gateway};
use kana_core::context::{Role, Turn};
use kana_core::error::KanaError;
use kana_core::outcome::Outcome;
use kana_core::traits::ModelBackend;
use tracing::{debug, info, warn};

impl Gateway {
    pub async fn handle_chat(&self, message: &str) -> Result<ChatReply, KanaError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(KanaError::Validation("message is required".to_string()));
        }

        let outcome = self.route(text).await?;

        let session_id = {
            let mut ctx = self.context.lock().await;
            let session_id = ctx.ensure_session_id();
            ctx.push(Role::User, text);
            ctx.push(Role::Assistant, &outcome.display);
            session_id
        };

        // Exactly two rows per committed turn.
        self.store.append(&session_id, "user", text).await?;
        self.store
            .append(&session_id, "assistant", &outcome.display)
            .await?;

        let audio = self.synthesize_b64(&outcome.speak).await;
        Ok(ChatReply {
            display: outcome.display,
            speak: outcome.speak,
            audio,
        })
    }

    async fn route(&self, text: &str) -> Result<Outcome, KanaError> {
        if let Some(handler) = self.registry.find(text) {
            info!(handler = handler.name(), "handler matched");
            if let Some(outcome) = handler.execute(text).await? {
                return Ok(outcome);
            }
            // Category detected but nothing actionable; ask the model
            // without escalating further.
            debug!(handler = handler.name(), "handler declined, using model");
            let history = self.history_snapshot().await;
            let reply = self
                .model
                .generate(&self.system_prompt, &history, text, false)
                .await?;
            return Ok(finalize(&reply));
        }

        let history = self.history_snapshot().await;

        // Live-information questions skip the plain call entirely.
        if escalation::needs_search(text) {
            info!("search intent in utterance, calling grounded");
            let reply = self
                .model
                .generate(&self.system_prompt, &history, text, true)
                .await?;
            return Ok(finalize(&reply));
        }

        let reply = self
            .model
            .generate(&self.system_prompt, &history, text, false)
            .await?;

        match escalation::decide(&reply) {
            Decision::UseAsIs => Ok(finalize(&reply)),
            Decision::Grounded => {
                info!("model signalled lookup intent, retrying grounded");
                let retry = self
                    .model
                    .generate(&self.system_prompt, &history, text, true)
                    .await?;
                Ok(finalize(&retry))
            }
            Decision::HistorySearch(keyword) => {
                info!(%keyword, "model requested history search");
                let rows = match self.store.search(&keyword, 10).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!("history search failed: {e}");
                        Vec::new()
                    }
                };
                if rows.is_empty() {
                    // Nothing remembered; the web may know instead.
                    let retry = self
                        .model
                        .generate(&self.system_prompt, &history, text, true)
                        .await?;
                    return Ok(finalize(&retry));
                }
                let prompt = recall_prompt(&rows, text);
                let retry = self
                    .model
                    .generate(&self.system_prompt, &history, &prompt, false)
                    .await?;
                Ok(finalize(&retry))
            }
        }
    }

    async fn history_snapshot(&self) -> Vec<Turn> {
        // Full history; the model backend trims to its own window.
        self.context.lock().await.turns().to_vec()
    }
}

/// Normalize a raw model reply and scrub any marker syntax the model
/// leaked into the final text.
fn finalize(reply: &str) -> Outcome {
    let outcome = Outcome::from_model_reply(reply);
    Outcome::new(
        escalation::strip_search_markers(&outcome.display),
        escalation::strip_search_markers(&outcome.speak),
    )
}

/// Re-prompt carrying the matched log rows as context.
fn recall_prompt(rows: &[kana_memory::LogRow], message: &str) -> String {
    let lines: Vec<String> = rows
        .iter()
        .map(|r| format!("{}: {}", r.role, r.content))
        .collect();
    format!(
        "【過去の会話】\n{}\n\n【現在の質問】\n{message}\n\n\
         これを踏まえてカナとして応答して。JSON形式で出力して：",
        lines.join("\n")
    )
}
