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

//! 事件的授权属性视图
//!
//! 此模块从一条已解码的审计事件重建策略匹配所需的授权属性。
//! 带有对象引用的事件是资源请求；其余事件按非资源请求处理，
//! 路径取自去掉查询串的 RequestURI。

use k8s_audit_apis::audit;

use crate::evaluator::AuthorizerAttributes;

/// 从审计事件提取的授权属性
#[derive(Debug, Clone, Default)]
pub struct EventAttributes {
    user: Option<String>,
    groups: Vec<String>,
    verb: String,
    namespace: Option<String>,
    api_group: Option<String>,
    resource: Option<String>,
    subresource: Option<String>,
    name: Option<String>,
    resource_request: bool,
    path: Option<String>,
}

impl EventAttributes {
    /// 从审计事件构建属性视图
    pub fn from_event(event: &audit::Event) -> Self {
        let user = event.user.username.clone().filter(|u| !u.is_empty());
        let groups = event.user.groups.clone().unwrap_or_default();

        match &event.object_ref {
            Some(object_ref) => EventAttributes {
                user,
                groups,
                verb: event.verb.clone(),
                namespace: object_ref.namespace.clone(),
                // 核心 API 组在事件中通常缺失，统一为规则里的空字符串
                api_group: Some(object_ref.api_group.clone().unwrap_or_default()),
                resource: object_ref.resource.clone(),
                subresource: object_ref.subresource.clone(),
                name: object_ref.name.clone(),
                resource_request: true,
                path: None,
            },
            None => EventAttributes {
                user,
                groups,
                verb: event.verb.clone(),
                namespace: None,
                api_group: None,
                resource: None,
                subresource: None,
                name: None,
                resource_request: false,
                path: Some(strip_query(&event.request_uri).to_string()),
            },
        }
    }
}

/// 去掉 URI 的查询串
pub fn strip_query(uri: &str) -> &str {
    match uri.split_once('?') {
        Some((path, _)) => path,
        None => uri,
    }
}

impl AuthorizerAttributes for EventAttributes {
    fn get_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn get_groups(&self) -> &[String] {
        &self.groups
    }

    fn get_verb(&self) -> &str {
        &self.verb
    }

    fn get_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn get_api_group(&self) -> Option<&str> {
        self.api_group.as_deref()
    }

    fn get_resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    fn get_subresource(&self) -> Option<&str> {
        self.subresource.as_deref()
    }

    fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn is_resource_request(&self) -> bool {
        self.resource_request
    }

    fn get_path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}
