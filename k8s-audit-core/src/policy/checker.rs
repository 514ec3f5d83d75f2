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

//! 策略检查器
//!
//! 此模块实现了审计策略规则匹配：按顺序检查规则，第一条匹配的
//! 规则决定事件的审计级别。规则的每个非空字段都必须匹配；空字段
//! 匹配任何请求。

use k8s_audit_apis::audit;

use crate::evaluator::AuthorizerAttributes;

/// 按顺序匹配策略规则，返回第一条匹配规则的级别
///
/// 没有规则匹配时返回 None，调用方自行决定默认行为。
pub fn match_policy_rules(
    policy: &audit::Policy,
    attrs: &dyn AuthorizerAttributes,
) -> Option<audit::Level> {
    policy
        .rules
        .iter()
        .find(|rule| rule_matches(rule, attrs))
        .map(|rule| rule.level.clone())
}

/// 检查规则是否与请求属性匹配
fn rule_matches(rule: &audit::PolicyRule, attrs: &dyn AuthorizerAttributes) -> bool {
    // 检查用户匹配
    if !rule.users.is_empty() {
        let user_name = match attrs.get_user() {
            Some(name) => name,
            None => return false,
        };

        if !has_string(&rule.users, user_name) {
            return false;
        }
    }

    // 检查用户组匹配
    if !rule.user_groups.is_empty() {
        let user_groups = attrs.get_groups();
        if user_groups.is_empty() {
            return false;
        }

        if !user_groups.iter().any(|group| has_string(&rule.user_groups, group)) {
            return false;
        }
    }

    // 检查动词匹配
    if !rule.verbs.is_empty() && !has_string(&rule.verbs, attrs.get_verb()) {
        return false;
    }

    // 检查资源或命名空间匹配
    if !rule.namespaces.is_empty() || !rule.resources.is_empty() {
        return rule_matches_resource(rule, attrs);
    }

    // 检查非资源 URL 匹配
    if !rule.non_resource_urls.is_empty() {
        return rule_matches_non_resource(rule, attrs);
    }

    // 所有条件都为空则匹配所有请求
    true
}

/// 检查规则的非资源 URL 是否与请求属性匹配
fn rule_matches_non_resource(rule: &audit::PolicyRule, attrs: &dyn AuthorizerAttributes) -> bool {
    if attrs.is_resource_request() {
        return false;
    }

    let path = match attrs.get_path() {
        Some(p) => p,
        None => return false,
    };

    rule.non_resource_urls.iter().any(|spec| path_matches(path, spec))
}

/// 检查路径是否与路径规范匹配
fn path_matches(path: &str, spec: &str) -> bool {
    // 通配符匹配
    if spec == "*" {
        return true;
    }

    // 精确匹配
    if spec == path {
        return true;
    }

    // 尾随 * 的子路径匹配
    if spec.ends_with('*') && path.starts_with(spec.trim_end_matches('*')) {
        return true;
    }

    false
}

/// 检查规则的资源字段是否与请求属性匹配
fn rule_matches_resource(rule: &audit::PolicyRule, attrs: &dyn AuthorizerAttributes) -> bool {
    if !attrs.is_resource_request() {
        return false;
    }

    // 检查命名空间匹配，非命名空间资源使用空字符串
    if !rule.namespaces.is_empty() {
        let namespace = attrs.get_namespace().unwrap_or("");
        if !has_string(&rule.namespaces, namespace) {
            return false;
        }
    }

    // 没有指定资源时只检查命名空间
    if rule.resources.is_empty() {
        return true;
    }

    let api_group = attrs.get_api_group().unwrap_or("");
    let resource = attrs.get_resource().unwrap_or("");
    let subresource = attrs.get_subresource().unwrap_or("");

    let combined_resource = if !subresource.is_empty() {
        format!("{}/{}", resource, subresource)
    } else {
        resource.to_string()
    };

    let name = attrs.get_name().unwrap_or("");

    for group_resources in &rule.resources {
        if group_resources.group.as_deref().unwrap_or("") != api_group {
            continue;
        }

        // 资源列表为空则匹配该组下所有资源
        if group_resources.resources.is_empty() {
            return true;
        }

        for res in &group_resources.resources {
            // 指定了资源名称时限定到这些实例
            if !group_resources.resource_names.is_empty()
                && !has_string(&group_resources.resource_names, name)
            {
                continue;
            }

            // "resource" 或 "resource/subresource" 的精确匹配，以及 "*"
            if res == &combined_resource || res == "*" {
                return true;
            }

            // "*/subresource"
            if !subresource.is_empty()
                && res.starts_with("*/")
                && subresource == res.trim_start_matches("*/")
            {
                return true;
            }

            // "resource/*"
            if res.ends_with("/*") && resource == res.trim_end_matches("/*") {
                return true;
            }
        }
    }

    false
}

/// 工具函数：检查字符串切片是否包含特定字符串
fn has_string(slice: &[String], value: &str) -> bool {
    slice.iter().any(|s| s == value)
}
