//! Remote issue / PR / notification queries through the `gh` CLI, with
//! optional `owner/name` repository extraction from free text.

use crate::{contains_any, process::run_command, Handler};
use async_trait::async_trait;
use kana_core::{error::KanaError, outcome::Outcome};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

// Plain "pr" is deliberately absent: it collides with English words that
// belong to the code-assistant path.
const TRIGGER_KW: &[&str] = &["イシュー", "issue", "プルリク", "pull request", "通知"];

const PR_KW: &[&str] = &["プルリク", "pull request"];
const NOTIFICATION_KW: &[&str] = &["通知"];

fn repo_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9][A-Za-z0-9_.-]*/[A-Za-z0-9][A-Za-z0-9_.-]*)")
            .expect("valid repo pattern")
    })
}

/// Extract an `owner/name` repository reference from free text.
pub fn extract_repo(text: &str) -> Option<String> {
    repo_pattern()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

pub struct IssueTrackerHandler {
    timeout: Duration,
}

impl IssueTrackerHandler {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn gh(&self, args: &[&str]) -> Result<String, KanaError> {
        run_command("gh", args, None, self.timeout, "gh").await
    }
}

#[async_trait]
impl Handler for IssueTrackerHandler {
    fn name(&self) -> &str {
        "issue-tracker"
    }

    fn detect(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), TRIGGER_KW)
    }

    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        let lower = text.to_lowercase();
        let repo = extract_repo(text);

        let result = if contains_any(&lower, NOTIFICATION_KW) {
            self.notifications().await
        } else if contains_any(&lower, PR_KW) {
            self.list("pr", repo.as_deref(), "プルリク").await
        } else {
            self.list("issue", repo.as_deref(), "イシュー").await
        };

        Ok(Some(result.unwrap_or_else(|e| {
            warn!("gh query failed: {e}");
            Outcome::text("イシューの状態が確認できなかったです…")
        })))
    }
}

impl IssueTrackerHandler {
    async fn list(
        &self,
        subcommand: &str,
        repo: Option<&str>,
        label: &str,
    ) -> Result<Outcome, KanaError> {
        let mut args = vec![subcommand, "list", "--state", "open"];
        if let Some(repo) = repo {
            args.push("--repo");
            args.push(repo);
        }
        let stdout = self.gh(&args).await?;
        Ok(list_outcome(&stdout, label))
    }

    async fn notifications(&self) -> Result<Outcome, KanaError> {
        let stdout = self.gh(&["api", "notifications"]).await?;
        let items: Vec<serde_json::Value> = serde_json::from_str(stdout.trim())
            .map_err(|e| KanaError::Integration(format!("gh: bad notifications json: {e}")))?;
        Ok(if items.is_empty() {
            Outcome::text("未読の通知はないですよ！")
        } else {
            Outcome::new(
                format!("未読の通知が{}件あります！", items.len()),
                format!("未読の通知が{}件ありますよ！", items.len()),
            )
        })
    }
}

fn list_outcome(stdout: &str, label: &str) -> Outcome {
    let listing = stdout.trim();
    let count = listing.lines().filter(|l| !l.trim().is_empty()).count();
    if count == 0 {
        Outcome::text(format!("オープンな{label}はないですよ！"))
    } else {
        Outcome::new(listing, format!("オープンな{label}は{count}件ですよ！"))
    }
}
