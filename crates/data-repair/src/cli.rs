//! 命令行参数
//!
//! ```bash
//! # 只统计不写回
//! exhibit-repair --dry-run
//!
//! # 每批 500 行
//! exhibit-repair --batch-size 500
//! ```

use clap::Parser;

use crate::job::DEFAULT_BATCH_SIZE;

/// 展品数据修复工具
#[derive(Parser, Debug)]
#[command(name = "exhibit-repair")]
#[command(version, about = "修复 exhibits 表中缺失或类型错误的字段")]
pub struct Cli {
    /// 只检查并输出统计，不写回数据库
    #[arg(long)]
    pub dry_run: bool,

    /// 每批读取的行数
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: i64,

    /// 日志级别，覆盖配置文件 (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["exhibit-repair"]);
        assert!(!cli.dry_run);
        assert_eq!(cli.batch_size, DEFAULT_BATCH_SIZE);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["exhibit-repair", "--dry-run", "--batch-size", "25", "-l", "debug"]);
        assert!(cli.dry_run);
        assert_eq!(cli.batch_size, 25);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
