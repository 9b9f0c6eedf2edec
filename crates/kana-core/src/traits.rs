//! Seams between the pipeline and its collaborators.

use crate::context::Turn;
use crate::error::KanaError;
use async_trait::async_trait;

/// A text-generation backend the pipeline can call.
///
/// One method, two modes: `grounded` attaches live web-search retrieval.
/// Implementations own history-window trimming.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
        grounded: bool,
    ) -> Result<String, KanaError>;
}
