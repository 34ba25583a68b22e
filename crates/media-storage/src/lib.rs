//! 媒体对象存储
//!
//! 展品图片等媒体文件上传到 S3 兼容存储，返回可公开访问的 URL。

pub mod error;
pub mod keys;
pub mod s3;

pub use error::{Result, StorageError};
pub use keys::object_key;
pub use s3::{ObjectStorage, ObjectUrls, S3Storage};
