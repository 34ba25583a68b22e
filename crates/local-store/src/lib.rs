//! 本地持久化对象存储
//!
//! 把服务端实体镜像到本地 redb 文件，供离线浏览使用。
//! 每类实体一张表（对象仓库），以实体 ID 为键，值为 JSON 编码的记录。

pub mod error;
pub mod models;
mod queries;
pub mod schema;
pub mod session;
pub mod store;

pub use error::{Result, StoreError};
pub use models::*;
pub use schema::{ObjectStore, Record, SCHEMA_VERSION};
pub use session::SessionStore;
pub use store::LocalStore;
