use std::path::Path;

use uuid::Uuid;

/// 生成不冲突的对象键：`{folder}/{uuid}.{ext}`
///
/// 原文件名只用于取扩展名，没有扩展名时省略。
pub fn object_key(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    let id = Uuid::new_v4();
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase);

    let name = match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    };
    if folder.is_empty() {
        name
    } else {
        format!("{folder}/{name}")
    }
}
