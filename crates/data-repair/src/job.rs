//! 修复任务
//!
//! 按 id 键集分页顺序扫描，单行失败只计数不中断。整批读取因坏行解码失败时退化为逐行读取；
//! 只有连接层故障才终止任务。

use exhibit_shared::observability::metrics;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{RepairError, Result};
use crate::repository::{ExhibitRepositoryTrait, ExhibitRow};
use crate::rules;

pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairStats {
    pub scanned: u64,
    pub fixed_description: u64,
    pub fixed_comments: u64,
    pub fixed_specs: u64,
    /// 实际写回的行数，dry-run 下恒为 0
    pub updated: u64,
    pub failed: u64,
}

pub struct RepairJob<R> {
    repo: R,
    dry_run: bool,
    batch_size: i64,
}

impl<R: ExhibitRepositoryTrait> RepairJob<R> {
    pub fn new(repo: R, dry_run: bool) -> Self {
        Self {
            repo,
            dry_run,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Result<Self> {
        if batch_size <= 0 {
            return Err(RepairError::InvalidArgument(format!(
                "batch size must be positive, got {}",
                batch_size
            )));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    #[instrument(skip(self), fields(dry_run = self.dry_run, batch_size = self.batch_size))]
    pub async fn run(&self) -> Result<RepairStats> {
        info!("Starting exhibit data repair");

        let mut stats = RepairStats::default();
        let mut after_id = i64::MIN;

        loop {
            let (rows, last_id, window) = match self.repo.fetch_batch(after_id, self.batch_size).await {
                Ok(rows) => {
                    let last_id = rows.last().map(|row| row.id);
                    let window = rows.len();
                    (rows, last_id, window)
                }
                Err(e) if e.is_connection_failure() => return Err(e),
                Err(e) => {
                    warn!(after_id, error = %e, "Batch fetch failed, falling back to row-by-row");
                    self.fetch_row_by_row(after_id, &mut stats).await?
                }
            };
            let Some(last_id) = last_id else {
                break;
            };
            after_id = last_id;

            for row in rows {
                self.process_row(row, &mut stats).await;
            }
            debug!(scanned = stats.scanned, last_id = after_id, "Batch processed");

            if (window as i64) < self.batch_size {
                break;
            }
        }

        info!(
            scanned = stats.scanned,
            fixed_description = stats.fixed_description,
            fixed_comments = stats.fixed_comments,
            fixed_specs = stats.fixed_specs,
            updated = stats.updated,
            failed = stats.failed,
            dry_run = self.dry_run,
            "Exhibit data repair finished"
        );
        Ok(stats)
    }

    /// 逐行读取同一窗口，解码失败的行计入 failed 后跳过
    ///
    /// 返回可处理的行、窗口内最大 id 与窗口大小。
    async fn fetch_row_by_row(
        &self,
        after_id: i64,
        stats: &mut RepairStats,
    ) -> Result<(Vec<ExhibitRow>, Option<i64>, usize)> {
        let ids = self.repo.fetch_ids(after_id, self.batch_size).await?;

        let mut rows = Vec::with_capacity(ids.len());
        for &id in &ids {
            match self.repo.fetch_row(id).await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => debug!(id, "Exhibit removed during scan"),
                Err(e) if e.is_connection_failure() => return Err(e),
                Err(e) => {
                    stats.scanned += 1;
                    stats.failed += 1;
                    metrics::record_repair_row("failed");
                    error!(id, error = %e, "Failed to load exhibit");
                }
            }
        }

        Ok((rows, ids.last().copied(), ids.len()))
    }

    async fn process_row(&self, row: ExhibitRow, stats: &mut RepairStats) {
        stats.scanned += 1;
        let ExhibitRow { id, data } = row;

        let Some(mut data) = data else {
            stats.failed += 1;
            metrics::record_repair_row("failed");
            warn!(id, "Exhibit data is NULL, skipped");
            return;
        };

        let Some(outcome) = rules::repair(&mut data) else {
            stats.failed += 1;
            metrics::record_repair_row("failed");
            warn!(id, "Exhibit data is not a JSON object, skipped");
            return;
        };

        if outcome.description {
            stats.fixed_description += 1;
            metrics::record_repair_fix("description");
        }
        if outcome.comments {
            stats.fixed_comments += 1;
            metrics::record_repair_fix("comments");
        }
        if outcome.specs {
            stats.fixed_specs += 1;
            metrics::record_repair_fix("specs");
        }

        if !outcome.any() {
            metrics::record_repair_row("clean");
            return;
        }

        if self.dry_run {
            metrics::record_repair_row("dry_run");
            info!(id, ?outcome, "Would repair exhibit");
            return;
        }

        match self.repo.update_data(id, &data).await {
            Ok(_) => {
                stats.updated += 1;
                metrics::record_repair_row("updated");
                debug!(id, ?outcome, "Exhibit repaired");
            }
            Err(e) => {
                stats.failed += 1;
                metrics::record_repair_row("failed");
                error!(id, error = %e, "Failed to update exhibit");
            }
        }
    }
}
