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

//! 审计核心库
//!
//! 此 crate 提供审计策略的加载与规则匹配、审计事件的授权属性视图，
//! 以及归约步骤所需的非结构化 JSON 工具（嵌套字段删除、三方合并补丁）。

pub mod evaluator;
pub mod mergepatch;
pub mod policy;
pub mod request;
pub mod unstructured;

pub use evaluator::AuthorizerAttributes;
pub use request::EventAttributes;
