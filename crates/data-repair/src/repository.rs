//! exhibits 表访问

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::Result;

/// 待检查的展品行，`data` 列可能为 SQL NULL
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ExhibitRow {
    pub id: i64,
    pub data: Option<Value>,
}

/// 展品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExhibitRepositoryTrait: Send + Sync {
    /// 按 id 升序读取 `after_id` 之后的一批行
    async fn fetch_batch(&self, after_id: i64, limit: i64) -> Result<Vec<ExhibitRow>>;

    /// 只读取 id，整批解码失败时用于逐行定位坏行
    async fn fetch_ids(&self, after_id: i64, limit: i64) -> Result<Vec<i64>>;

    async fn fetch_row(&self, id: i64) -> Result<Option<ExhibitRow>>;

    /// 写回修复后的数据并刷新 updated_at，返回受影响行数
    async fn update_data(&self, id: i64, data: &Value) -> Result<u64>;
}

/// PostgreSQL 实现
pub struct PgExhibitRepository {
    pool: PgPool,
}

impl PgExhibitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExhibitRepositoryTrait for PgExhibitRepository {
    async fn fetch_batch(&self, after_id: i64, limit: i64) -> Result<Vec<ExhibitRow>> {
        let rows = sqlx::query_as::<_, ExhibitRow>(
            r#"
            SELECT id, data
            FROM exhibits
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_ids(&self, after_id: i64, limit: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM exhibits
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn fetch_row(&self, id: i64) -> Result<Option<ExhibitRow>> {
        let row = sqlx::query_as::<_, ExhibitRow>("SELECT id, data FROM exhibits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn update_data(&self, id: i64, data: &Value) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE exhibits
            SET data = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
