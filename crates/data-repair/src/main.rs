//! exhibit-repair 入口
//!
//! 退出码：成功 0；配置错误或数据库连接失败 1。

use std::process::ExitCode;

use clap::Parser;
use data_repair::cli::Cli;
use data_repair::{PgExhibitRepository, RepairJob};
use exhibit_shared::config::AppConfig;
use exhibit_shared::database::Database;
use exhibit_shared::observability::{self, ObservabilityConfig};
use tracing::{error, info};

const SERVICE_NAME: &str = "data-repair";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(SERVICE_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut obs_config = ObservabilityConfig::from_logging(SERVICE_NAME, &config.logging);
    if let Some(level) = cli.log_level.clone() {
        obs_config.log_level = level;
    }
    let _guard = match observability::init(&obs_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("日志初始化失败: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return ExitCode::FAILURE;
        }
    };

    let result = match RepairJob::new(PgExhibitRepository::new(db.pool().clone()), cli.dry_run)
        .with_batch_size(cli.batch_size)
    {
        Ok(job) => job.run().await,
        Err(e) => Err(e),
    };
    db.close().await;

    match result {
        Ok(stats) => {
            info!(?stats, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, code = e.code(), "Exhibit data repair aborted");
            ExitCode::FAILURE
        }
    }
}
