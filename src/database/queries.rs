use sqlx::{Row, SqlitePool};

use crate::database::models::PendingMerge;

pub struct Queries;

impl Queries {
    pub async fn get_pending_merge(
        pool: &SqlitePool,
        head_sha: &str,
    ) -> Result<Option<PendingMerge>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT head_sha, issue_number
            FROM pending_merges
            WHERE head_sha = ?1
            "#,
        )
        .bind(head_sha)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => {
                let issue_number: i64 = row.try_get("issue_number")?;
                Ok(Some(PendingMerge {
                    head_sha: row.try_get("head_sha")?,
                    issue_number: issue_number as u64,
                }))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace; a newer decision for the same sha supersedes the old one.
    pub async fn upsert_pending_merge(
        pool: &SqlitePool,
        pending: &PendingMerge,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pending_merges (head_sha, issue_number, created_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT (head_sha) DO UPDATE SET
                issue_number = excluded.issue_number,
                created_at = excluded.created_at
            "#,
        )
        .bind(&pending.head_sha)
        .bind(pending.issue_number as i64)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete_pending_merge(pool: &SqlitePool, head_sha: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_merges WHERE head_sha = ?1")
            .bind(head_sha)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_pending_merges(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM pending_merges")
            .fetch_one(pool)
            .await?;
        row.try_get("count")
    }
}
