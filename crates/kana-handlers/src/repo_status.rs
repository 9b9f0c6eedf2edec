//! Local source-control status: git log queries against a configured
//! repository, via structured subprocess calls with a short timeout.

use crate::{contains_any, process::run_command, Handler};
use async_trait::async_trait;
use kana_core::{error::KanaError, outcome::Outcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const TRIGGER_KW: &[&str] = &["コミット", "ギット", "git", "リポジトリ"];

/// Keywords that actually form a log query. Trigger without one of these
/// (or 今日) falls through to the model.
const LOG_KW: &[&str] = &["コミット", "ログ", "log", "履歴"];

pub struct RepositoryStatusHandler {
    repo_path: Option<PathBuf>,
    timeout: Duration,
}

impl RepositoryStatusHandler {
    pub fn new(repo_path: &str, timeout_secs: u64) -> Self {
        let repo_path = if repo_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(kana_core::shellexpand(repo_path)))
        };
        Self {
            repo_path,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Handler for RepositoryStatusHandler {
    fn name(&self) -> &str {
        "repo-status"
    }

    fn detect(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), TRIGGER_KW)
    }

    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        let Some(repo) = &self.repo_path else {
            return Ok(None);
        };

        let lower = text.to_lowercase();
        let today = lower.contains("今日");
        if !today && !contains_any(&lower, LOG_KW) {
            return Ok(None);
        }

        let args: &[&str] = if today {
            &["log", "--oneline", "--since=midnight"]
        } else {
            &["log", "--oneline", "-5"]
        };

        let result = run_command("git", args, Some(repo), self.timeout, "git log").await;

        Ok(Some(match result {
            Ok(stdout) => log_outcome(&stdout, today),
            Err(e) => {
                warn!("git query failed: {e}");
                Outcome::text("リポジトリの状態が確認できなかったです…")
            }
        }))
    }
}

fn log_outcome(stdout: &str, today: bool) -> Outcome {
    let log = stdout.trim();
    let count = log.lines().filter(|l| !l.trim().is_empty()).count();

    if count == 0 {
        return if today {
            Outcome::text("今日はまだコミットがないですね！")
        } else {
            Outcome::text("コミットが見つからなかったです…")
        };
    }

    let speak = if today {
        format!("今日は{count}件コミットしてますよ！")
    } else {
        format!("直近のコミットを{count}件表示しましたよ！")
    };
    Outcome::new(log, speak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> RepositoryStatusHandler {
        RepositoryStatusHandler::new("/tmp/repo", 10)
    }

    #[test]
    fn test_detects_commit_queries() {
        let h = handler();
        assert!(h.detect("今日のコミットは？"));
        assert!(h.detect("Gitのログ見せて"));
        assert!(h.detect("リポジトリどうなってる？"));
        assert!(!h.detect("今日の天気は？"));
    }

    #[tokio::test]
    async fn test_unconfigured_declines() {
        let h = RepositoryStatusHandler::new("", 10);
        assert!(h.execute("今日のコミット").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trigger_without_log_query_declines() {
        let h = handler();
        // "リポジトリ" fired detection but there is no log/commit query.
        assert!(h.execute("リポジトリって何？").await.unwrap().is_none());
    }

    #[test]
    fn test_log_outcome_counts_commits() {
        let outcome = log_outcome("abc123 fix bug\ndef456 add feature\n", true);
        assert!(outcome.display.contains("abc123"));
        assert_eq!(outcome.speak, "今日は2件コミットしてますよ！");
    }

    #[test]
    fn test_empty_log_today() {
        let outcome = log_outcome("", true);
        assert_eq!(outcome.display, "今日はまだコミットがないですね！");
    }

    #[tokio::test]
    async fn test_missing_repo_soft_fails() {
        let h = RepositoryStatusHandler::new("/nonexistent/repo/path", 5);
        let outcome = h.execute("今日のコミット").await.unwrap().unwrap();
        assert_eq!(outcome.display, "リポジトリの状態が確認できなかったです…");
    }
}
