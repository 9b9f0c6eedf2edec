//! The gateway owns everything a chat turn touches: the model client, the
//! speech synthesizer, the handler registry, the durable log, and the one
//! in-memory conversation.

pub mod escalation;
mod pipeline;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use kana_core::context::ConversationContext;
use kana_core::traits::ModelBackend;
use kana_handlers::HandlerRegistry;
use kana_memory::Store;
use kana_providers::VoicevoxClient;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Final shape of a successful chat turn.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub display: String,
    pub speak: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

pub struct Gateway {
    // The model backend owns history-window trimming.
    model: Arc<dyn ModelBackend>,
    tts: VoicevoxClient,
    registry: HandlerRegistry,
    store: Store,
    // One global conversation; the lock serializes context mutation.
    context: Mutex<ConversationContext>,
    system_prompt: String,
}

impl Gateway {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        tts: VoicevoxClient,
        registry: HandlerRegistry,
        store: Store,
        system_prompt: String,
    ) -> Self {
        Self {
            model,
            tts,
            registry,
            store,
            context: Mutex::new(ConversationContext::new()),
            system_prompt,
        }
    }

    /// Drop the in-memory conversation. The durable log is untouched.
    pub async fn reset(&self) {
        self.context.lock().await.reset();
    }

    /// Best-effort speech synthesis. A dead synthesizer never fails a
    /// turn; the reply just ships without audio.
    pub async fn synthesize_b64(&self, text: &str) -> Option<String> {
        match self.tts.synthesize(text).await {
            Ok(wav) => Some(BASE64.encode(wav)),
            Err(e) => {
                warn!("speech synthesis unavailable: {e}");
                None
            }
        }
    }
}
