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

//! 审计类型与辅助函数

pub mod helpers;
mod types;

pub use types::*;

/// 审计 API 的稳定组版本
pub const API_GROUP_VERSION: &str = "audit.k8s.io/v1";

/// 审计事件的 kind
pub const KIND_EVENT: &str = "Event";

/// 审计策略的 kind
pub const KIND_POLICY: &str = "Policy";
