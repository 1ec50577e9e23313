//! SQLite knowledge base backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use estimator_rag::SqliteKnowledgeBase;
//!
//! let kb = SqliteKnowledgeBase::new("sqlite://estimator.db?mode=rwc").await?;
//! kb.migrate().await?;
//! let hits = kb.search_epics(&query_embedding, 5, 0.4).await?;
//! ```

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, warn};

use crate::error::{RagError, Result};
use crate::knowledge_base::{KnowledgeBase, rank_groups};
use crate::record::{EpicGroup, KnowledgeBaseStats, KnowledgeRecord, ScoredEpic, assemble_epic};

const BACKEND: &str = "sqlite";

/// Rows live in a single `json_embeddings` table; embeddings are stored as
/// JSON text.
pub struct SqliteKnowledgeBase {
    pool: SqlitePool,
}

impl SqliteKnowledgeBase {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Self::map_err(format!("connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_err(message: String) -> RagError {
        RagError::knowledge_base(BACKEND, message)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS json_embeddings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                estimation_id INTEGER NOT NULL,
                estimation_name TEXT NOT NULL,
                epic_id INTEGER NOT NULL,
                epic_name TEXT NOT NULL,
                task_name TEXT NOT NULL,
                platform TEXT NOT NULL,
                estimated_hour REAL NOT NULL,
                content_text TEXT NOT NULL,
                embedding TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (estimation_name, epic_id, task_name, platform)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("migration failed: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_json_embeddings_epic
            ON json_embeddings(estimation_name, epic_id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("migration failed: {}", e)))?;

        Ok(())
    }

    async fn epic_rows(&self, group: &EpicGroup) -> Result<Vec<(String, String, f64)>> {
        let rows = sqlx::query(
            r#"
            SELECT task_name, platform, estimated_hour
            FROM json_embeddings
            WHERE estimation_name = ? AND epic_id = ?
            ORDER BY task_name, platform
            "#,
        )
        .bind(&group.estimation_name)
        .bind(group.epic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("query failed: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("task_name"), row.get("platform"), row.get("estimated_hour")))
            .collect())
    }
}

#[async_trait]
impl KnowledgeBase for SqliteKnowledgeBase {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn upsert(&self, records: &[KnowledgeRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Self::map_err(format!("transaction failed: {}", e)))?;

        for record in records {
            let embedding = serde_json::to_string(&record.embedding)?;
            sqlx::query(
                r#"
                INSERT INTO json_embeddings
                    (estimation_id, estimation_name, epic_id, epic_name, task_name,
                     platform, estimated_hour, content_text, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(estimation_name, epic_id, task_name, platform) DO UPDATE SET
                    estimation_id = excluded.estimation_id,
                    epic_name = excluded.epic_name,
                    estimated_hour = excluded.estimated_hour,
                    content_text = excluded.content_text,
                    embedding = excluded.embedding,
                    created_at = excluded.created_at
                "#,
            )
            .bind(record.estimation_id)
            .bind(&record.estimation_name)
            .bind(record.epic_id)
            .bind(&record.epic_name)
            .bind(&record.task_name)
            .bind(&record.platform)
            .bind(record.estimated_hour)
            .bind(&record.content_text)
            .bind(embedding)
            .bind(record.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::map_err(format!("upsert failed: {}", e)))?;
        }

        tx.commit().await.map_err(|e| Self::map_err(format!("commit failed: {}", e)))?;
        debug!(count = records.len(), "upserted records into sqlite knowledge base");
        Ok(())
    }

    async fn search_epics(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredEpic>> {
        // First-inserted row of each (estimation_name, epic_id) carries the epic embedding.
        let rows = sqlx::query(
            r#"
            SELECT e1.estimation_name, e1.epic_id, e1.epic_name, e1.embedding
            FROM json_embeddings e1
            WHERE e1.id = (
                SELECT MIN(e2.id) FROM json_embeddings e2
                WHERE e2.estimation_name = e1.estimation_name AND e2.epic_id = e1.epic_id
            )
            ORDER BY e1.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("query failed: {}", e)))?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let group = EpicGroup {
                estimation_name: row.get("estimation_name"),
                epic_id: row.get("epic_id"),
                epic_name: row.get("epic_name"),
            };
            let raw: String = row.get("embedding");
            match serde_json::from_str::<Vec<f32>>(&raw) {
                Ok(embedding) => groups.push((group, embedding)),
                Err(e) => {
                    warn!(epic = %group.epic_name, error = %e, "Skipping unreadable embedding")
                }
            }
        }

        let ranked = rank_groups(query, groups, top_k, threshold);
        let mut results = Vec::with_capacity(ranked.len());
        for (group, similarity) in ranked {
            let rows = self.epic_rows(&group).await?;
            let entries = rows.iter().map(|(t, p, h)| (t.as_str(), p.as_str(), *h));
            let epic = assemble_epic(&group, entries);
            results.push(ScoredEpic { epic, similarity });
        }

        debug!(found = results.len(), top_k, threshold, "searched sqlite knowledge base");
        Ok(results)
    }

    async fn stats(&self) -> Result<KnowledgeBaseStats> {
        let counts = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM json_embeddings) AS total_records,
                (SELECT COUNT(*) FROM (
                    SELECT DISTINCT estimation_name, epic_id FROM json_embeddings
                )) AS total_epics
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("query failed: {}", e)))?;

        let templates: Vec<String> = sqlx::query(
            "SELECT DISTINCT estimation_name FROM json_embeddings ORDER BY estimation_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("query failed: {}", e)))?
        .iter()
        .map(|row| row.get("estimation_name"))
        .collect();

        Ok(KnowledgeBaseStats {
            total_records: counts.get::<i64, _>("total_records") as u64,
            total_epics: counts.get::<i64, _>("total_epics") as u64,
            total_templates: templates.len() as u64,
            templates,
        })
    }

    async fn delete_template(&self, estimation_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM json_embeddings WHERE estimation_name = ?")
            .bind(estimation_name)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err(format!("delete failed: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn next_estimation_id(&self) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(estimation_id), 0) + 1 AS next_id FROM json_embeddings",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(format!("query failed: {}", e)))?;
        Ok(row.get("next_id"))
    }
}

