//! 单行修复规则
//!
//! 三项检查互相独立，纯函数实现，不涉及数据库。

use serde_json::{Map, Value};

/// 少于该字符数的描述视为缺失
const MIN_DESCRIPTION_CHARS: usize = 5;

const FALLBACK_TITLE: &str = "Артефакт";

/// 单行修复结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub description: bool,
    pub comments: bool,
    pub specs: bool,
}

impl RepairOutcome {
    pub fn any(&self) -> bool {
        self.description || self.comments || self.specs
    }
}

/// 就地修复展品数据
///
/// `data` 不是 JSON 对象时无法修复，返回 None。
pub fn repair(data: &mut Value) -> Option<RepairOutcome> {
    let fields = data.as_object_mut()?;
    let mut outcome = RepairOutcome::default();

    if !has_valid_description(fields) {
        let description = default_description(fields);
        fields.insert("description".to_string(), Value::String(description));
        outcome.description = true;
    }

    if !fields.get("comments").is_some_and(Value::is_array) {
        fields.insert("comments".to_string(), Value::Array(Vec::new()));
        outcome.comments = true;
    }

    if !fields.get("specs").is_some_and(Value::is_object) {
        fields.insert("specs".to_string(), Value::Object(Map::new()));
        outcome.specs = true;
    }

    Some(outcome)
}

fn has_valid_description(fields: &Map<String, Value>) -> bool {
    non_empty_str(fields, "description")
        .is_some_and(|d| d.trim().chars().count() >= MIN_DESCRIPTION_CHARS)
}

/// 由标题与分类拼出默认描述
///
/// 例：`Самовар - уникальный экспонат коллекции. Категория: Быт.`
pub fn default_description(fields: &Map<String, Value>) -> String {
    let title = non_empty_str(fields, "title").unwrap_or(FALLBACK_TITLE);
    let mut description = format!("{title} - уникальный экспонат коллекции.");

    if let Some(category) = non_empty_str(fields, "category") {
        description.push_str(&format!(" Категория: {category}."));
    }
    if let Some(subcategory) = non_empty_str(fields, "subcategory") {
        description.push_str(&format!(" Подкатегория: {subcategory}."));
    }
    description
}

/// 空白串视为缺失，非空时原样返回
fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_shared::test_utils::ExhibitDataBuilder;
    use serde_json::json;

    #[test]
    fn test_valid_record_untouched() {
        let mut data = ExhibitDataBuilder::new().build();
        let before = data.clone();

        let outcome = repair(&mut data).unwrap();
        assert!(!outcome.any());
        assert_eq!(data, before);
    }

    #[test]
    fn test_default_description_format() {
        let mut data = json!({
            "title": "Граммофон",
            "category": "Музыка",
            "subcategory": "Механика",
            "description": "",
            "comments": [],
            "specs": {}
        });

        let outcome = repair(&mut data).unwrap();
        assert_eq!(
            outcome,
            RepairOutcome {
                description: true,
                ..Default::default()
            }
        );
        assert_eq!(
            data["description"],
            "Граммофон - уникальный экспонат коллекции. Категория: Музыка. Подкатегория: Механика."
        );
    }

    #[test]
    fn test_missing_title_uses_fallback() {
        let mut data = json!({"title": "   ", "description": 42});
        repair(&mut data).unwrap();
        assert_eq!(data["description"], "Артефакт - уникальный экспонат коллекции.");
    }

    #[test]
    fn test_title_inserted_verbatim() {
        let mut data = json!({"title": " Самовар ", "category": "Быт "});
        repair(&mut data).unwrap();
        assert_eq!(
            data["description"],
            " Самовар  - уникальный экспонат коллекции. Категория: Быт ."
        );
    }

    #[test]
    fn test_short_description_is_replaced() {
        let mut data = ExhibitDataBuilder::new()
            .with("description", json!("Ваза"))
            .without("subcategory")
            .build();
        assert!(repair(&mut data).unwrap().description);

        // 五个西里尔字符按字符而非字节计数
        let mut data = ExhibitDataBuilder::new().with("description", json!("Ваза!")).build();
        assert!(!repair(&mut data).unwrap().description);
    }

    #[test]
    fn test_wrong_types_are_reset() {
        let mut data = ExhibitDataBuilder::new()
            .with("comments", json!("none"))
            .with("specs", json!([1, 2]))
            .build();

        let outcome = repair(&mut data).unwrap();
        assert!(outcome.comments && outcome.specs && !outcome.description);
        assert_eq!(data["comments"], json!([]));
        assert_eq!(data["specs"], json!({}));
    }

    #[test]
    fn test_null_fields_count_as_missing() {
        let mut data = json!({"title": "Монета", "comments": null, "specs": null});
        let outcome = repair(&mut data).unwrap();
        assert!(outcome.description && outcome.comments && outcome.specs);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut data = json!({"title": "Икона", "specs": "n/a"});
        assert!(repair(&mut data).unwrap().any());

        let repaired = data.clone();
        assert!(!repair(&mut data).unwrap().any());
        assert_eq!(data, repaired);
    }

    #[test]
    fn test_non_object_data_rejected() {
        assert!(repair(&mut json!(null)).is_none());
        assert!(repair(&mut json!([1])).is_none());
    }
}
