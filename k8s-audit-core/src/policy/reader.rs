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

//! 策略读取器
//!
//! 此模块实现了从文件或字节数据加载审计策略的功能。
//! 先尝试 YAML 解析，失败后回退到 JSON。

use std::fs;
use std::path::Path;

use thiserror::Error;

use k8s_audit_apis::audit;

/// 策略读取器错误类型
#[derive(Debug, Error)]
pub enum PolicyReaderError {
    #[error("file path not specified")]
    FilePathNotSpecified,
    #[error("failed to read file path {0}: {1}")]
    FileReadError(String, #[source] std::io::Error),
    #[error("failed to decode policy: {0}")]
    PolicyDecodeError(String),
    #[error("unknown group version field in policy: {0}")]
    UnknownApiGroupVersion(String),
    #[error("invalid policy data: {0}")]
    InvalidPolicyData(String),
}

/// 从文件加载审计策略
pub fn load_policy_from_file<P: AsRef<Path>>(
    file_path: P,
) -> Result<audit::Policy, PolicyReaderError> {
    let file_path = file_path.as_ref();

    if file_path.as_os_str().is_empty() {
        return Err(PolicyReaderError::FilePathNotSpecified);
    }

    let policy_data = fs::read(file_path).map_err(|err| {
        PolicyReaderError::FileReadError(file_path.to_string_lossy().to_string(), err)
    })?;

    load_policy_from_bytes(&policy_data)
}

/// 从字节数据加载审计策略
///
/// 规则数量为零的策略是合法的：所有事件都将落到策略之外的处理路径。
pub fn load_policy_from_bytes(policy_data: &[u8]) -> Result<audit::Policy, PolicyReaderError> {
    if policy_data.is_empty() {
        return Err(PolicyReaderError::InvalidPolicyData("policy data is empty".to_string()));
    }

    let policy = parse_policy_with_fallback(policy_data)?;
    validate_policy(&policy);

    tracing::debug!(rules = policy.rules.len(), "loaded audit policy");

    Ok(policy)
}

/// 先尝试 YAML 解析，失败则回退到 JSON
fn parse_policy_with_fallback(policy_data: &[u8]) -> Result<audit::Policy, PolicyReaderError> {
    match serde_yaml::from_slice::<audit::Policy>(policy_data) {
        Ok(policy) => {
            check_api_version(&policy)?;
            Ok(policy)
        }
        Err(yaml_err) => match serde_json::from_slice::<audit::Policy>(policy_data) {
            Ok(policy) => {
                check_api_version(&policy)?;
                tracing::warn!(error = %yaml_err, "policy is not valid YAML, parsed as JSON");
                Ok(policy)
            }
            Err(json_err) => Err(PolicyReaderError::PolicyDecodeError(format!(
                "YAML: {yaml_err}, JSON: {json_err}"
            ))),
        },
    }
}

/// 检查 API 版本是否受支持
fn check_api_version(policy: &audit::Policy) -> Result<(), PolicyReaderError> {
    let supported_versions = [audit::API_GROUP_VERSION, "v1"];

    match &policy.type_meta.api_version {
        Some(api_version) => {
            if !supported_versions.contains(&api_version.as_str()) {
                return Err(PolicyReaderError::UnknownApiGroupVersion(api_version.clone()));
            }
            Ok(())
        }
        None => {
            tracing::debug!("policy has no apiVersion field, assuming {}", audit::API_GROUP_VERSION);
            Ok(())
        }
    }
}

/// 对策略做宽松校验，问题只记录日志不拒绝
fn validate_policy(policy: &audit::Policy) {
    if policy.type_meta.kind.as_deref() != Some(audit::KIND_POLICY) {
        tracing::warn!(kind = ?policy.type_meta.kind, "policy kind is not 'Policy'");
    }

    for (index, rule) in policy.rules.iter().enumerate() {
        if rule.users.is_empty()
            && rule.user_groups.is_empty()
            && rule.verbs.is_empty()
            && rule.namespaces.is_empty()
            && rule.resources.is_empty()
            && rule.non_resource_urls.is_empty()
        {
            tracing::debug!(rule = index, "rule has no scoping fields and matches every request");
        }
    }
}
