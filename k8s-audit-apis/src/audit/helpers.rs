/*
Copyright 2018 The Kubernetes Authors.

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

//! 审计辅助函数
//!
//! 此模块包含审计级别的比较和排序函数。

use crate::audit;

/// 获取审计级别的序号，用于比较和排序
pub fn ord_level(level: &audit::Level) -> u8 {
    match level {
        audit::Level::None => 0,
        audit::Level::Metadata => 1,
        audit::Level::Request => 2,
        audit::Level::RequestResponse => 3,
    }
}

/// Level 类型的扩展方法
pub trait LevelExt {
    /// 检查当前级别是否小于另一个级别
    fn less(&self, other: &Self) -> bool;

    /// 检查当前级别是否大于或等于另一个级别
    fn greater_or_equal(&self, other: &Self) -> bool;
}

impl LevelExt for audit::Level {
    fn less(&self, other: &Self) -> bool {
        ord_level(self) < ord_level(other)
    }

    fn greater_or_equal(&self, other: &Self) -> bool {
        ord_level(self) >= ord_level(other)
    }
}

impl std::cmp::PartialOrd for audit::Level {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for audit::Level {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        ord_level(self).cmp(&ord_level(other))
    }
}
