//! 展品数据修复
//!
//! 扫描 `exhibits` 表，为缺失或类型错误的 JSON 字段补默认值后写回。
//! 可重复执行：已修复的行不会再次写入。

pub mod cli;
pub mod error;
pub mod job;
pub mod repository;
pub mod rules;

pub use error::{RepairError, Result};
pub use job::{RepairJob, RepairStats};
pub use repository::{ExhibitRepositoryTrait, ExhibitRow, PgExhibitRepository};
pub use rules::{RepairOutcome, default_description, repair};
