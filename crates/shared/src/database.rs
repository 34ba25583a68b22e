//! PostgreSQL 连接池
//!
//! 批处理脚本只在启动时建立一次连接池，退出前无论成败都要显式关闭。

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 建立连接池并立即验证连通性
    ///
    /// `application_name` 设为服务名，便于在 pg_stat_activity 中定位脚本连接。
    #[instrument(skip(config), fields(target = %redact(&config.url)))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)?.application_name(&config.application_name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ping().await?;
        info!(max_connections = config.max_connections, "数据库连接池已建立");
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        if self.pool.is_closed() {
            warn!("Database pool already closed");
            return;
        }
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}

/// 日志中隐藏连接串里的密码
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
