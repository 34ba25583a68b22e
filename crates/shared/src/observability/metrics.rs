//! 指标记录模块
//!
//! 通过 metrics facade 记录业务指标。未安装 recorder 时所有调用均为空操作，
//! 由嵌入方（浏览器宿主、批处理脚本）决定是否导出。

/// 注册指标描述，出现在导出端的 HELP 注释中
pub fn describe_metrics() {
    metrics::describe_counter!(
        "offline_cache_lookups_total",
        "Offline cache lookups by cache name and outcome"
    );
    metrics::describe_counter!(
        "offline_cache_evictions_total",
        "Entries evicted from offline caches by expiration policy"
    );
    metrics::describe_counter!(
        "offline_cache_revalidations_total",
        "Background stale-while-revalidate refreshes"
    );
    metrics::describe_counter!("precache_entries_total", "Precached manifest entries");
    metrics::describe_counter!("local_store_writes_total", "Records written to the local store");
    metrics::describe_counter!("media_uploads_total", "Object storage uploads by status");
    metrics::describe_histogram!(
        "media_upload_duration_seconds",
        "Object storage upload duration in seconds"
    );
    metrics::describe_counter!("data_repair_rows_total", "Rows processed by the repair job");
    metrics::describe_counter!("data_repair_fixes_total", "Field fixes applied by the repair job");
}

/// 记录一次缓存查找（hit / miss / expired）
#[inline]
pub fn record_cache_lookup(cache_name: &str, outcome: &'static str) {
    metrics::counter!(
        "offline_cache_lookups_total",
        "cache" => cache_name.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录缓存淘汰条目数
#[inline]
pub fn record_cache_eviction(cache_name: &str, count: usize) {
    if count == 0 {
        return;
    }
    metrics::counter!("offline_cache_evictions_total", "cache" => cache_name.to_string())
        .increment(count as u64);
}

/// 记录后台刷新结果
#[inline]
pub fn record_revalidation(cache_name: &str, status: &'static str) {
    metrics::counter!(
        "offline_cache_revalidations_total",
        "cache" => cache_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录预缓存条目
#[inline]
pub fn record_precache(count: usize) {
    metrics::counter!("precache_entries_total").increment(count as u64);
}

/// 记录本地存储写入
#[inline]
pub fn record_store_write(store: &'static str, count: usize) {
    metrics::counter!("local_store_writes_total", "store" => store).increment(count as u64);
}

/// 记录对象存储上传
#[inline]
pub fn record_upload(status: &'static str, duration_secs: f64) {
    metrics::counter!("media_uploads_total", "status" => status).increment(1);
    metrics::histogram!("media_upload_duration_seconds", "status" => status).record(duration_secs);
}

/// 记录修复任务处理的一行（updated / unchanged / failed / skipped）
#[inline]
pub fn record_repair_row(status: &'static str) {
    metrics::counter!("data_repair_rows_total", "status" => status).increment(1);
}

/// 记录修复任务对单个字段的修补
#[inline]
pub fn record_repair_fix(field: &'static str) {
    metrics::counter!("data_repair_fixes_total", "field" => field).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_cache_lookup("exhibit-images", "hit");
        record_cache_eviction("exhibit-images", 0);
        record_cache_eviction("exhibit-images", 3);
        record_revalidation("exhibit-api", "ok");
        record_precache(12);
        record_store_write("exhibits", 5);
        record_upload("success", 0.42);
        record_repair_row("updated");
        record_repair_fix("description");
    }
}
