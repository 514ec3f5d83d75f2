/*
Copyright 2021 The Kubernetes Authors.

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

//! 审计评估器
//!
//! 此模块定义了策略规则匹配所依赖的授权属性接口。

/// 授权属性 trait
///
/// 对应 Go 接口 authorizer.Attributes 的简化版本，
/// 仅包含审计策略匹配所需的基本属性。
pub trait AuthorizerAttributes {
    /// 获取用户名称
    fn get_user(&self) -> Option<&str>;

    /// 获取用户组列表
    fn get_groups(&self) -> &[String];

    /// 获取请求动词
    fn get_verb(&self) -> &str;

    /// 获取命名空间
    fn get_namespace(&self) -> Option<&str>;

    /// 获取 API 组，核心组为空字符串
    fn get_api_group(&self) -> Option<&str>;

    /// 获取资源
    fn get_resource(&self) -> Option<&str>;

    /// 获取子资源
    fn get_subresource(&self) -> Option<&str>;

    /// 获取资源名称
    fn get_name(&self) -> Option<&str>;

    /// 是否是资源请求
    fn is_resource_request(&self) -> bool;

    /// 获取非资源请求的路径（不含查询串）
    fn get_path(&self) -> Option<&str>;

    /// 请求是否为只读
    ///
    /// 资源请求的只读动词为 get/list/watch/proxy；
    /// 非资源请求的动词是小写 HTTP 方法，head 和 options 也视为只读。
    fn is_read_only(&self) -> bool {
        matches!(
            self.get_verb(),
            "get" | "list" | "watch" | "proxy" | "head" | "options"
        )
    }
}
