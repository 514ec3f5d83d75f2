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

//! Kubernetes 审计 API 类型
//!
//! 此 crate 定义了 `audit.k8s.io/v1` 稳定版本的审计数据模型：
//! 审计事件、审计级别以及审计策略文档。

pub mod audit;

pub use audit::helpers::LevelExt;
