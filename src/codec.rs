//! 审计事件的行编解码器
//!
//! 解码时校验事件的组版本与 kind（与 apiserver 的版本化编解码一致），
//! 编码时统一盖上稳定的 `audit.k8s.io/v1` 线格式并以换行结尾。

use k8s_audit_apis::audit;
use thiserror::Error;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid audit event JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected apiVersion {0:?}, expected {}", audit::API_GROUP_VERSION)]
    ApiVersion(String),
    #[error("unexpected kind {0:?}, expected {}", audit::KIND_EVENT)]
    Kind(String),
}

/// `audit.k8s.io/v1` 的行编解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl Codec {
    /// 把一行字节解码为审计事件
    ///
    /// 缺失的 apiVersion/kind 按 v1 处理；出现但不匹配则报错。
    pub fn decode(&self, line: &[u8]) -> Result<audit::Event, CodecError> {
        let event: audit::Event = serde_json::from_slice(line)?;

        if let Some(api_version) = &event.api_version {
            if api_version != audit::API_GROUP_VERSION {
                return Err(CodecError::ApiVersion(api_version.clone()));
            }
        }
        if let Some(kind) = &event.kind {
            if kind != audit::KIND_EVENT {
                return Err(CodecError::Kind(kind.clone()));
            }
        }

        Ok(event)
    }

    /// 把审计事件编码为一行字节，含结尾换行
    pub fn encode(&self, event: &mut audit::Event) -> Result<Vec<u8>, CodecError> {
        event.api_version = Some(audit::API_GROUP_VERSION.to_string());
        event.kind = Some(audit::KIND_EVENT.to_string());

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        Ok(line)
    }
}
