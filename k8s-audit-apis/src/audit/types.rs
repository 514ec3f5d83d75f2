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

//! 审计 API v1 类型定义
//!
//! 此模块定义了 `audit.k8s.io/v1` 线格式的数据结构。字段名与
//! Kubernetes 的序列化形式逐一对应，事件可以无损地解码再编码。

use k8s_openapi::api::authentication::v1 as authnv1;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// TypeMeta 描述一个对象的类型信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeMeta {
    #[serde(rename = "apiVersion", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// UID 类型别名
pub type UID = String;

/// 已认证的用户信息，复用 k8s-openapi 的认证类型
pub type UserInfo = authnv1::UserInfo;

/// 定义审计期间记录的信息量级别
///
/// 级别是全序的：`None` < `Metadata` < `Request` < `RequestResponse`，
/// 比较操作见 [`helpers`](super::helpers)。
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// LevelNone 禁用审计
    #[default]
    None,
    /// LevelMetadata 提供基本的审计级别
    Metadata,
    /// LevelRequest 提供 Metadata 级别的审计，并额外记录请求对象
    Request,
    /// LevelRequestResponse 提供 Request 级别的审计，并额外记录响应对象
    RequestResponse,
}

impl Level {
    /// 将级别转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::None => "None",
            Level::Metadata => "Metadata",
            Level::Request => "Request",
            Level::RequestResponse => "RequestResponse",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 定义可能生成审计事件的请求处理阶段
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// 审计处理程序接收到请求后立即生成事件的阶段
    #[default]
    RequestReceived,
    /// 响应头已发送但响应体尚未发送时生成事件的阶段，仅针对长时间运行的请求
    ResponseStarted,
    /// 响应体已完成且不会再发送字节时生成事件的阶段
    ResponseComplete,
    /// 发生 panic 时生成事件的阶段
    Panic,
}

impl Stage {
    /// 将阶段转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RequestReceived => "RequestReceived",
            Stage::ResponseStarted => "ResponseStarted",
            Stage::ResponseComplete => "ResponseComplete",
            Stage::Panic => "Panic",
        }
    }
}

/// MicroTime 是微秒精度的时间戳
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroTime(#[serde(with = "micro_time_serde")] chrono::DateTime<chrono::Utc>);

impl Default for MicroTime {
    fn default() -> Self {
        MicroTime(chrono::Utc::now())
    }
}

impl MicroTime {
    /// 获取当前时间
    pub fn now() -> Self {
        MicroTime(chrono::Utc::now())
    }

    /// 获取内部的 DateTime
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

mod micro_time_serde {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // 线格式使用微秒精度，例如 2024-01-01T12:00:00.000000Z
        let s = date.to_rfc3339_opts(SecondsFormat::Micros, true);
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(DateTime::parse_from_rfc3339(&s)
            .map_err(serde::de::Error::custom)?
            .with_timezone(&Utc))
    }
}

/// Unknown 以原始字节形式携带尚未解析的 API 对象
///
/// 请求对象和响应对象只在归约步骤需要时才会被真正解析，
/// 其余时间作为原始 JSON 在管道中透传。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unknown {
    raw: Box<RawValue>,
}

impl Unknown {
    /// 从一段 JSON 文本构造，文本必须是合法 JSON
    pub fn from_json(json: String) -> Result<Self, serde_json::Error> {
        Ok(Unknown {
            raw: RawValue::from_string(json)?,
        })
    }

    /// 原始 JSON 文本
    pub fn raw(&self) -> &str {
        self.raw.get()
    }

    /// 原始字节长度
    pub fn len(&self) -> usize {
        self.raw.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.get().is_empty()
    }
}

/// Status 是返回调用者的响应状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

/// StatusDetails 是 Status 原因的详细信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<UID>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub causes: Vec<StatusCause>,
    #[serde(rename = "retryAfterSeconds", skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i32>,
}

/// StatusCause 提供错误的附加信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCause {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// ObjectReference 包含足够的信息来识别请求针对的对象
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<UID>,

    /// APIGroup 是包含所引用对象的 API 组的名称
    /// 空字符串表示核心 API 组
    #[serde(rename = "apiGroup", skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    #[serde(rename = "apiVersion", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(rename = "resourceVersion", skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,
}

/// 捕获可以包含在 API 审计日志中的所有信息的事件
///
/// 注意：`apiVersion`/`kind` 直接内联而不经过 TypeMeta 展平，
/// 因为原始值透传（RawValue）与 serde 的 flatten 缓冲不兼容。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "apiVersion", skip_serializing_if = "Option::is_none", default)]
    pub api_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<String>,

    /// 生成事件时的审计级别
    pub level: Level,

    /// 唯一的审计 ID，为每个请求生成
    #[serde(rename = "auditID", default)]
    pub audit_id: UID,

    /// 生成此事件实例时的请求处理阶段
    #[serde(default)]
    pub stage: Stage,

    /// RequestURI 是客户端发送给服务器的请求 URI，包含查询串
    #[serde(rename = "requestURI", default)]
    pub request_uri: String,

    /// Verb 是与请求关联的 Kubernetes 操作动词
    /// 对于非资源请求，这是小写的 HTTP 方法
    #[serde(default)]
    pub verb: String,

    /// 已认证的用户信息
    #[serde(default)]
    pub user: UserInfo,

    /// 被模拟的用户信息
    #[serde(rename = "impersonatedUser", skip_serializing_if = "Option::is_none", default)]
    pub impersonated_user: Option<Box<UserInfo>>,

    /// 源 IP 地址，请求来源和中间代理
    #[serde(rename = "sourceIPs", skip_serializing_if = "Vec::is_empty", default)]
    pub source_ips: Vec<String>,

    /// UserAgent 记录客户端报告的用户代理字符串，不可信任
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none", default)]
    pub user_agent: Option<String>,

    /// 此请求针对的对象引用，非资源请求时缺失
    #[serde(rename = "objectRef", skip_serializing_if = "Option::is_none", default)]
    pub object_ref: Option<ObjectReference>,

    /// 响应状态，即使 ResponseObject 不是 Status 类型也会填充
    #[serde(rename = "responseStatus", skip_serializing_if = "Option::is_none", default)]
    pub response_status: Option<Status>,

    /// 请求中的 API 对象，JSON 格式，按请求原样记录。
    /// 仅在 Request 级别及更高级别记录。
    #[serde(rename = "requestObject", skip_serializing_if = "Option::is_none", default)]
    pub request_object: Option<Unknown>,

    /// 响应中返回的 API 对象，JSON 格式。
    /// 仅在 RequestResponse 级别记录。
    #[serde(rename = "responseObject", skip_serializing_if = "Option::is_none", default)]
    pub response_object: Option<Unknown>,

    /// 请求到达 apiserver 的时间
    #[serde(rename = "requestReceivedTimestamp", default)]
    pub request_received_timestamp: MicroTime,

    /// 请求到达当前审计阶段的时间
    #[serde(rename = "stageTimestamp", default)]
    pub stage_timestamp: MicroTime,

    /// Annotations 是与审计事件一起存储的非结构化键值映射，
    /// 由请求服务链中的组件设置，包含在 Metadata 级别中。
    #[serde(skip_serializing_if = "::std::collections::HashMap::is_empty", default)]
    pub annotations: ::std::collections::HashMap<String, String>,
}

impl Default for Event {
    fn default() -> Self {
        Event {
            api_version: Some(super::API_GROUP_VERSION.to_string()),
            kind: Some(super::KIND_EVENT.to_string()),
            level: Level::default(),
            audit_id: UID::default(),
            stage: Stage::default(),
            request_uri: String::new(),
            verb: String::new(),
            user: UserInfo::default(),
            impersonated_user: None,
            source_ips: Vec::new(),
            user_agent: None,
            object_ref: None,
            response_status: None,
            request_object: None,
            response_object: None,
            request_received_timestamp: MicroTime::default(),
            stage_timestamp: MicroTime::default(),
            annotations: ::std::collections::HashMap::new(),
        }
    }
}

/// 定义审计日志的配置，以及不同请求类别如何记录的规则
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(flatten)]
    pub type_meta: TypeMeta,

    /// Rules 指定应记录请求的审计级别
    /// 一个请求可能匹配多个规则，使用第一个匹配的规则
    /// PolicyRules 是严格有序的
    #[serde(default)]
    pub rules: Vec<PolicyRule>,

    /// OmitStages 是不创建事件的阶段列表
    #[serde(rename = "omitStages", skip_serializing_if = "Vec::is_empty", default)]
    pub omit_stages: Vec<Stage>,

    /// OmitManagedFields 指示是否从请求和响应体中省略托管字段
    #[serde(rename = "omitManagedFields", skip_serializing_if = "Option::is_none")]
    pub omit_managed_fields: Option<bool>,
}

/// PolicyRule 根据元数据将请求映射到审计级别
/// 请求必须匹配规则的每个非空字段（字段的交集）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRule {
    /// 与此规则匹配的请求记录的级别
    pub level: Level,

    /// 此规则适用的用户（按已验证的用户名）
    /// 空列表表示每个用户
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub users: Vec<String>,

    /// 此规则适用的用户组，用户是任一组的成员即视为匹配
    /// 空列表表示每个用户组
    #[serde(rename = "userGroups", skip_serializing_if = "Vec::is_empty", default)]
    pub user_groups: Vec<String>,

    /// 与此规则匹配的操作动词
    /// 空列表表示每个动词
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub verbs: Vec<String>,

    /// 此规则匹配的资源，空列表表示所有 API 组中的所有种类
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resources: Vec<GroupResources>,

    /// 此规则匹配的命名空间
    /// 空字符串 "" 匹配非命名空间资源，空列表表示每个命名空间
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub namespaces: Vec<String>,

    /// NonResourceURLs 是应审计的一组 URL 路径
    /// 允许 `*`，但只能作为路径中的完整最后一段
    #[serde(rename = "nonResourceURLs", skip_serializing_if = "Vec::is_empty", default)]
    pub non_resource_urls: Vec<String>,

    /// OmitStages 是不创建事件的阶段列表，与策略级别的列表取并集
    #[serde(rename = "omitStages", skip_serializing_if = "Vec::is_empty", default)]
    pub omit_stages: Vec<Stage>,

    /// OmitManagedFields 覆盖策略级别的全局默认值
    #[serde(rename = "omitManagedFields", skip_serializing_if = "Option::is_none")]
    pub omit_managed_fields: Option<bool>,
}

/// 表示 API 组中的资源种类
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupResources {
    /// Group 是包含资源的 API 组的名称
    /// 空字符串表示核心 API 组
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Resources 是此规则适用的资源列表
    ///
    /// - `pods` 匹配 pods
    /// - `pods/log` 匹配 pods 的 log 子资源
    /// - `*` 匹配所有资源及其子资源
    /// - `pods/*` 匹配 pods 的所有子资源
    /// - `*/scale` 匹配所有 scale 子资源
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resources: Vec<String>,

    /// ResourceNames 是策略匹配的资源实例名称列表
    /// 空列表表示匹配资源的每个实例
    #[serde(rename = "resourceNames", skip_serializing_if = "Vec::is_empty", default)]
    pub resource_names: Vec<String>,
}
