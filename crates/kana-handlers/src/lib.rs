//! Intent handlers: independent detectors and executors probed by the
//! pipeline in fixed priority order.
//!
//! A handler's `execute` returning `Ok(None)` means "category detected but
//! no specific action found" — the pipeline then falls through to the plain
//! model path, never to an error.

pub mod calendar;
pub mod code_assistant;
pub mod device;
pub mod issue_tracker;
pub mod local_facts;
mod process;
pub mod repo_status;

pub use calendar::CalendarHandler;
pub use code_assistant::CodeAssistantHandler;
pub use device::DeviceControlHandler;
pub use issue_tracker::IssueTrackerHandler;
pub use local_facts::LocalFactsHandler;
pub use repo_status::RepositoryStatusHandler;

use async_trait::async_trait;
use kana_core::{error::KanaError, outcome::Outcome};
use std::sync::Arc;

/// One intent handler: a cheap keyword detector plus an executor.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Keyword-substring detection against this handler's trigger list.
    fn detect(&self, text: &str) -> bool;

    /// Execute against the utterance. `Ok(None)` signals fallthrough to the
    /// model. Integration failures are converted to apologetic Outcomes
    /// inside the handler; only model-backend errors may propagate.
    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError>;
}

/// Ordered set of handlers. Registration order is priority order; trigger
/// sets overlap, so first-match-wins keeps dispatch deterministic.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// First handler whose detector fires, in registration order.
    pub fn find(&self, text: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.iter().find(|h| h.detect(text)).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Substring match against a fixed trigger list.
pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
