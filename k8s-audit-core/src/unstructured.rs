/*
Copyright 2017 The Kubernetes Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! 非结构化 JSON 对象工具
//!
//! 提供按路径删除嵌套字段的能力，用于从请求体中剥离
//! `metadata`、`status` 等子树。

use serde_json::Value;

/// 按路径删除嵌套字段，返回是否确实删除了内容
///
/// 路径中的每一段都必须是对象键；中途遇到非对象即停止。
pub fn remove_nested_field(value: &mut Value, path: &[&str]) -> bool {
    match path {
        [] => false,
        [last] => value
            .as_object_mut()
            .map(|map| map.remove(*last).is_some())
            .unwrap_or(false),
        [head, rest @ ..] => value
            .as_object_mut()
            .and_then(|map| map.get_mut(*head))
            .map(|child| remove_nested_field(child, rest))
            .unwrap_or(false),
    }
}

/// 从一段原始 JSON 中删除嵌套字段
///
/// 未删除任何内容时原样返回输入文本，保证无操作情况下字节不变。
pub fn remove_raw_field(raw: &str, path: &[&str]) -> Result<String, serde_json::Error> {
    let mut value: Value = serde_json::from_str(raw)?;
    if remove_nested_field(&mut value, path) {
        serde_json::to_string(&value)
    } else {
        Ok(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remove_top_level_field() {
        let mut value = json!({"metadata": {"name": "x"}, "data": {"k": "v"}});
        assert!(remove_nested_field(&mut value, &["metadata"]));
        assert_eq!(value, json!({"data": {"k": "v"}}));
    }

    #[test]
    fn test_remove_nested_path() {
        let mut value = json!({"metadata": {"name": "x", "annotations": {"a": "b"}}});
        assert!(remove_nested_field(&mut value, &["metadata", "annotations"]));
        assert_eq!(value, json!({"metadata": {"name": "x"}}));
    }

    #[test]
    fn test_remove_missing_field_reports_nothing_removed() {
        let mut value = json!({"data": {"k": "v"}});
        assert!(!remove_nested_field(&mut value, &["metadata", "annotations"]));
        assert_eq!(value, json!({"data": {"k": "v"}}));
    }

    #[test]
    fn test_remove_through_non_object_stops() {
        let mut value = json!({"metadata": "not-an-object"});
        assert!(!remove_nested_field(&mut value, &["metadata", "annotations"]));
    }

    #[test]
    fn test_raw_removal_is_byte_identical_when_absent() {
        // 注意输入带有刻意的空白，无操作时必须原样返回
        let raw = r#"{ "data" : { "k" : "v" } }"#;
        let out = remove_raw_field(raw, &["metadata", "annotations"]).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn test_raw_removal_rewrites_when_present() {
        let raw = r#"{"metadata":{"annotations":{"a":"b"},"name":"x"},"data":{}}"#;
        let out = remove_raw_field(raw, &["metadata", "annotations"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, json!({"metadata": {"name": "x"}, "data": {}}));
    }

    #[test]
    fn test_raw_removal_invalid_json_errors() {
        assert!(remove_raw_field("not json", &["metadata"]).is_err());
    }
}
