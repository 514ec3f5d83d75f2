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

//! JSON 合并补丁
//!
//! 实现 RFC 7386 风格的三方合并补丁计算：新增与修改相对 `current`
//! 求差，删除（null 标记）相对 `original` 求差，两者合并后的补丁
//! 应用在 `current` 上即得到 `modified`。

use serde_json::{Map, Value};
use thiserror::Error;

/// 合并补丁计算错误
#[derive(Debug, Error)]
pub enum MergePatchError {
    /// 三方合并补丁只对 JSON 对象有定义
    #[error("merge patch requires JSON objects at the document root")]
    NotAnObject,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// 计算三方 JSON 合并补丁
///
/// 返回序列化后的补丁字节。`original`、`modified`、`current`
/// 三者都必须是 JSON 对象。
pub fn create_three_way_merge_patch(
    original: &Value,
    modified: &Value,
    current: &Value,
) -> Result<Vec<u8>, MergePatchError> {
    let (Value::Object(original), Value::Object(modified), Value::Object(current)) =
        (original, modified, current)
    else {
        return Err(MergePatchError::NotAnObject);
    };

    let mut patch = diff_maps(
        current,
        modified,
        &DiffOptions {
            additions: true,
            deletions: false,
        },
    );
    let deletions = diff_maps(
        original,
        modified,
        &DiffOptions {
            additions: false,
            deletions: true,
        },
    );
    merge_into(&mut patch, deletions);

    Ok(serde_json::to_vec(&Value::Object(patch))?)
}

struct DiffOptions {
    /// 记录新增和修改的键
    additions: bool,
    /// 为缺失的键记录 null 删除标记
    deletions: bool,
}

/// 递归比较两个对象，产生从 `base` 到 `target` 的合并补丁片段
fn diff_maps(
    base: &Map<String, Value>,
    target: &Map<String, Value>,
    options: &DiffOptions,
) -> Map<String, Value> {
    let mut patch = Map::new();

    for (key, target_value) in target {
        match base.get(key) {
            None => {
                if options.additions {
                    patch.insert(key.clone(), target_value.clone());
                }
            }
            Some(base_value) => {
                if let (Value::Object(base_map), Value::Object(target_map)) =
                    (base_value, target_value)
                {
                    let sub = diff_maps(base_map, target_map, options);
                    if !sub.is_empty() {
                        patch.insert(key.clone(), Value::Object(sub));
                    }
                } else if base_value != target_value && options.additions {
                    patch.insert(key.clone(), target_value.clone());
                }
            }
        }
    }

    if options.deletions {
        for key in base.keys() {
            if !target.contains_key(key) {
                patch.insert(key.clone(), Value::Null);
            }
        }
    }

    patch
}

/// 将 `other` 合入 `patch`，对象对对象时递归合并
fn merge_into(patch: &mut Map<String, Value>, other: Map<String, Value>) {
    for (key, value) in other {
        match (patch.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, value) => {
                patch.insert(key, value);
            }
        }
    }
}
