//! Append-only conversation log keyed by session, with substring search.
//!
//! Every successful chat turn lands here; rows are never updated or
//! deleted. Session reset only affects in-memory state — rows from old
//! sessions stay queryable.

use kana_core::{config::MemoryConfig, error::KanaError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// One row from the durable log.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Durable conversation store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, KanaError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KanaError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| KanaError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| KanaError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Conversation store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Throwaway in-memory store. Single connection: every sqlite
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, KanaError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| KanaError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| KanaError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Append one turn to the durable log.
    pub async fn append(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), KanaError> {
        sqlx::query("INSERT INTO conversations (session_id, role, content) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(role)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(|e| KanaError::Memory(format!("insert failed: {e}")))?;
        Ok(())
    }

    /// Substring search over all sessions, newest first, capped at `limit`.
    pub async fn search(&self, keyword: &str, limit: i64) -> Result<Vec<LogRow>, KanaError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT role, content, created_at FROM conversations \
             WHERE content LIKE ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(format!("%{keyword}%"))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KanaError::Memory(format!("search failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(role, content, created_at)| LogRow {
                role,
                content,
                created_at,
            })
            .collect())
    }

    /// Number of turns recorded for a session.
    pub async fn session_turn_count(&self, session_id: &str) -> Result<i64, KanaError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversations WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| KanaError::Memory(format!("count failed: {e}")))?;
        Ok(count)
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), KanaError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| KanaError::Memory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        KanaError::Memory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| KanaError::Memory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    KanaError::Memory(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> Store {
        Store::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_append_and_count() {
        let store = test_store().await;
        store.append("s1", "user", "今日の天気は？").await.unwrap();
        store.append("s1", "assistant", "晴れですよ！").await.unwrap();
        assert_eq!(store.session_turn_count("s1").await.unwrap(), 2);
        assert_eq!(store.session_turn_count("s2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_substring_match() {
        let store = test_store().await;
        store.append("s1", "user", "犬の名前はポチ").await.unwrap();
        store.append("s1", "assistant", "覚えました！").await.unwrap();
        store.append("s2", "user", "猫の話").await.unwrap();

        let rows = store.search("ポチ", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "user");
        assert!(rows[0].content.contains("ポチ"));
    }

    #[tokio::test]
    async fn test_search_is_capped_and_newest_first() {
        let store = test_store().await;
        for i in 0..15 {
            store
                .append("s1", "user", &format!("メモ {i}"))
                .await
                .unwrap();
        }
        let rows = store.search("メモ", 10).await.unwrap();
        assert_eq!(rows.len(), 10);
        // Newest first: the last appended row comes back first.
        assert_eq!(rows[0].content, "メモ 14");
    }

    #[tokio::test]
    async fn test_search_no_match_is_empty() {
        let store = test_store().await;
        store.append("s1", "user", "こんにちは").await.unwrap();
        assert!(store.search("存在しない", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_survive_across_sessions() {
        let store = test_store().await;
        store.append("old", "user", "旅行の計画").await.unwrap();
        // A new session id does not hide old rows from search.
        store.append("new", "user", "別の話題").await.unwrap();
        let rows = store.search("旅行", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = test_store().await;
        Store::run_migrations(&store.pool).await.unwrap();
        store.append("s1", "user", "x").await.unwrap();
        assert_eq!(store.session_turn_count("s1").await.unwrap(), 1);
    }
}
