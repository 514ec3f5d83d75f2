//! 过滤与归约引擎
//!
//! 对每条已解码的审计事件给出保留或丢弃的裁决，保留时可能就地
//! 改写事件以缩减体积。规则级联按固定顺序执行，第一个终结性
//! 裁决生效：
//!
//! 1. 策略匹配（命中后设置级别，级别为 None 即丢弃）
//! 2. 策略未覆盖事件的启发式规则
//! 3. 响应状态过滤（404/409/422）
//! 4. update → patch 归约（基于上一版本缓存的三方合并补丁）
//! 5. 空补丁丢弃
//! 6. update/patch 的 RequestResponse 级别降为 Request
//! 7. 超限记录先剥离 metadata.annotations，仍超限则降为 Metadata
//!
//! 在固定的策略快照和缓存状态下，裁决是事件的纯函数；缓存是
//! 唯一的跨事件状态，其影响通过 converted-to-patch 注解可观察。

use std::sync::Arc;

use serde_json::Value;

use k8s_audit_apis::audit::{self, Level, Unknown};
use k8s_audit_apis::LevelExt;
use k8s_audit_core::policy::checker;
use k8s_audit_core::request::{strip_query, EventAttributes};
use k8s_audit_core::{mergepatch, unstructured, AuthorizerAttributes};

use crate::cache::PriorVersionCache;
use crate::metrics::ForwarderMetrics;
use crate::watcher::SharedPolicy;

/// 标记事件由 update 归约为 patch 的注解键
pub const CONVERTED_TO_PATCH_ANNOTATION: &str = "converted-to-patch";

/// 编码体积估算中固定信封开销的字节数
const ENVELOPE_SIZE_ESTIMATE: usize = 2000;

/// 过滤裁决
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Drop,
}

/// 过滤与归约引擎
///
/// 依赖全部显式注入；测试按用例构造新实例。
pub struct Filter {
    policy: SharedPolicy,
    cache: Arc<PriorVersionCache>,
    metrics: Arc<ForwarderMetrics>,
    max_line_length: usize,
}

impl Filter {
    pub fn new(
        policy: SharedPolicy,
        cache: Arc<PriorVersionCache>,
        metrics: Arc<ForwarderMetrics>,
        max_line_length: usize,
    ) -> Self {
        Filter {
            policy,
            cache,
            metrics,
            max_line_length,
        }
    }

    /// 对单条事件给出裁决，保留时可能就地改写事件
    pub fn filter_event(&self, event: &mut audit::Event) -> Verdict {
        let attrs = EventAttributes::from_event(event);
        let policy = self.policy.current();

        if let Some(level) = checker::match_policy_rules(&policy, &attrs) {
            event.level = level;
            if event.level.less(&Level::RequestResponse) {
                event.response_object = None;
            }
            if event.level.less(&Level::Request) {
                event.request_object = None;
            }
            if event.level == Level::None {
                return self.dropped(event); // 策略要求丢弃
            }
        } else {
            // 策略未覆盖的事件走启发式规则

            // 丢弃非资源的只读请求（例如 openapi 发现）
            if event.object_ref.is_none() && attrs.is_read_only() {
                return self.dropped(event);
            }

            // 人类用户的事件全部保留
            let username = event.user.username.as_deref().unwrap_or("");
            if !username.is_empty() && !username.starts_with("system:") {
                return self.kept(event);
            }

            // 丢弃系统的只读请求
            if attrs.is_read_only() {
                return self.dropped(event);
            }

            // 丢弃 openshift-* 命名空间里元数据级别的系统事件
            if event.level.less(&Level::Request)
                && event
                    .object_ref
                    .as_ref()
                    .and_then(|object_ref| object_ref.namespace.as_deref())
                    .is_some_and(|namespace| namespace.starts_with("openshift-"))
            {
                return self.dropped(event);
            }

            // 系统 configmap 写入的专项规则
            if matches!(event.verb.as_str(), "update" | "create")
                && event
                    .object_ref
                    .as_ref()
                    .and_then(|object_ref| object_ref.resource.as_deref())
                    == Some("configmaps")
                && event.request_object.is_some()
            {
                let name = event
                    .object_ref
                    .as_ref()
                    .and_then(|object_ref| object_ref.name.as_deref())
                    .unwrap_or("");
                let body = event
                    .request_object
                    .as_ref()
                    .map(|object| object.raw())
                    .unwrap_or("");

                // CA bundle 体积过大
                if name == "kube-root-ca.crt"
                    || name.ends_with("-ca")
                    || name.ends_with("bundle")
                    || body.contains("ca-bundle.crt")
                {
                    return self.dropped(event);
                }

                // leader 租约续期是最频繁的写请求之一
                if name.ends_with("-lock")
                    || name.ends_with("-leader")
                    || body.contains("kubernetes.io/leader")
                {
                    return self.dropped(event);
                }
            }
        }

        // 丢弃冲突与良性错误：
        // 404 删除不存在的资源，409 资源版本过期，422 校验拒绝
        if event
            .response_status
            .as_ref()
            .and_then(|status| status.code)
            .is_some_and(|code| matches!(code, 404 | 409 | 422))
        {
            return self.dropped(event);
        }

        // 基于上一版本把 update 归约为 patch
        if event.verb == "update" && event.request_object.is_some() && self.reduce_to_patch(event) {
            event.annotations.insert(
                CONVERTED_TO_PATCH_ANNOTATION.to_string(),
                "true".to_string(),
            );
        }

        // 补丁体为空（'{}'、'null' 或空串）的事件没有信息量
        if is_empty_patch(event) {
            return self.dropped(event);
        }

        // update/patch 的响应对象诊断价值低且往往最大，级别降为 Request
        if matches!(event.verb.as_str(), "update" | "patch")
            && event.level.greater_or_equal(&Level::RequestResponse)
        {
            event.level = Level::Request;
            event.response_object = None;
        }

        // 超限记录先去掉 last-applied-configuration 所在的注解子树
        if estimate_output_size(event) > self.max_line_length && event.request_object.is_some() {
            self.strip_request_annotations(event);
        }

        // 仍然超限就只保留元数据
        if estimate_output_size(event) > self.max_line_length {
            event.level = Level::Metadata;
            event.request_object = None;
            event.response_object = None;
        }

        self.kept(event)
    }

    /// 尝试把 update 事件的请求体替换为相对上一版本的合并补丁
    ///
    /// 规范化后的新请求体无条件写入缓存；补丁计算失败时事件保持原样。
    fn reduce_to_patch(&self, event: &mut audit::Event) -> bool {
        let Some(request_object) = event.request_object.as_ref() else {
            return false;
        };

        let now = match canonicalize_body(request_object.raw()) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "request body is not a JSON document, skipping reduction");
                return false;
            }
        };
        let now_bytes = match serde_json::to_vec(&now) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let key = strip_query(&event.request_uri);
        let Some(then_bytes) = self.cache.swap(key, now_bytes) else {
            return false;
        };
        let Ok(then) = serde_json::from_slice::<Value>(&then_bytes) else {
            return false;
        };

        let patch = match mergepatch::create_three_way_merge_patch(&then, &now, &then) {
            Ok(patch) => patch,
            Err(_) => return false,
        };
        let Ok(patch) = String::from_utf8(patch) else {
            return false;
        };
        let Ok(patch) = Unknown::from_json(patch) else {
            return false;
        };

        event.verb = "patch".to_string();
        event.request_object = Some(patch);
        true
    }

    /// 从请求体中剥离 metadata.annotations；体内容不变时保持原字节
    fn strip_request_annotations(&self, event: &mut audit::Event) {
        let Some(request_object) = event.request_object.as_ref() else {
            return;
        };
        let Ok(stripped) =
            unstructured::remove_raw_field(request_object.raw(), &["metadata", "annotations"])
        else {
            return;
        };
        if let Ok(unknown) = Unknown::from_json(stripped) {
            event.request_object = Some(unknown);
        }
    }

    fn dropped(&self, event: &audit::Event) -> Verdict {
        self.metrics.observe_drop(event);
        Verdict::Drop
    }

    fn kept(&self, event: &audit::Event) -> Verdict {
        self.metrics.observe_accept(event);
        Verdict::Keep
    }
}

/// 解析请求体并去掉 metadata 与 status 子树，得到差分用的规范形
fn canonicalize_body(raw: &str) -> Result<Value, serde_json::Error> {
    let mut value: Value = serde_json::from_str(raw)?;
    unstructured::remove_nested_field(&mut value, &["metadata"]);
    unstructured::remove_nested_field(&mut value, &["status"]);
    Ok(value)
}

/// 事件是否是无信息量的空补丁
///
/// Request 级别及以上的 patch/update 在请求体缺失或为 '{}'、'null'、
/// 空串时为空；Metadata 以下的级别本身没有可记录的内容。
fn is_empty_patch(event: &audit::Event) -> bool {
    if event.level.greater_or_equal(&Level::Request)
        && matches!(event.verb.as_str(), "patch" | "update")
    {
        match &event.request_object {
            None => true,
            Some(request_object) => matches!(request_object.raw(), "{}" | "null" | ""),
        }
    } else {
        event.level.less(&Level::Metadata)
    }
}

/// 估算编码后的行长度：固定信封开销加上两个对象体
fn estimate_output_size(event: &audit::Event) -> usize {
    let mut size = ENVELOPE_SIZE_ESTIMATE;
    if let Some(request_object) = &event.request_object {
        size += request_object.len();
    }
    if let Some(response_object) = &event.response_object {
        size += response_object.len();
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_audit_apis::audit::{
        Event, ObjectReference, Policy, PolicyRule, Status, UserInfo,
    };

    const MAX_LINE_LENGTH: usize = 1_000_000;

    fn test_filter_with_policy(policy: Policy) -> Filter {
        Filter::new(
            SharedPolicy::new(policy),
            Arc::new(PriorVersionCache::new(16)),
            Arc::new(ForwarderMetrics::new().expect("指标应该可以注册")),
            MAX_LINE_LENGTH,
        )
    }

    fn test_filter() -> Filter {
        test_filter_with_policy(Policy::default())
    }

    fn user(username: &str) -> UserInfo {
        UserInfo {
            username: Some(username.to_string()),
            ..Default::default()
        }
    }

    fn configmap_update(namespace: &str, name: &str, uri: &str, body: &str) -> Event {
        Event {
            level: Level::Request,
            verb: "update".to_string(),
            request_uri: uri.to_string(),
            user: user("system:serviceaccount:kube-system:updater"),
            object_ref: Some(ObjectReference {
                resource: Some("configmaps".to_string()),
                namespace: Some(namespace.to_string()),
                name: Some(name.to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(body.to_string()).expect("测试体应该是合法 JSON")),
            ..Default::default()
        }
    }

    #[test]
    fn test_read_only_discovery_is_dropped() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::Metadata,
            verb: "get".to_string(),
            request_uri: "/openapi/v2".to_string(),
            user: user("system:anonymous"),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
        assert_eq!(
            filter
                .metrics
                .events_dropped
                .with_label_values(&["get", "/openapi/v2"])
                .get() as u64,
            1
        );
    }

    #[test]
    fn test_human_user_is_always_kept() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::Metadata,
            verb: "list".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Metadata);
        assert_eq!(
            filter
                .metrics
                .events_accepted
                .with_label_values(&["list", "pods"])
                .get() as u64,
            1
        );
    }

    #[test]
    fn test_system_read_only_is_dropped() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::Metadata,
            verb: "watch".to_string(),
            user: user("system:kube-scheduler"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_openshift_namespace_metadata_noise_is_dropped() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::Metadata,
            verb: "delete".to_string(),
            user: user("system:serviceaccount:openshift-operators:operator"),
            object_ref: Some(ObjectReference {
                resource: Some("secrets".to_string()),
                namespace: Some("openshift-monitoring".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_ca_bundle_configmaps_are_dropped() {
        let filter = test_filter();

        for name in ["kube-root-ca.crt", "service-ca", "trusted-ca-bundle"] {
            let mut event = configmap_update(
                "kube-system",
                name,
                "/api/v1/namespaces/kube-system/configmaps/x",
                r#"{"kind":"ConfigMap","data":{"k":"v"}}"#,
            );
            assert_eq!(filter.filter_event(&mut event), Verdict::Drop, "{name} 应该被丢弃");
        }

        // 名字无特征但体里带着 CA bundle
        let mut event = configmap_update(
            "kube-system",
            "proxy-config",
            "/api/v1/namespaces/kube-system/configmaps/proxy-config",
            r#"{"kind":"ConfigMap","data":{"ca-bundle.crt":"..."}}"#,
        );
        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_leader_lease_churn_is_dropped() {
        let filter = test_filter();

        for name in ["my-controller-leader", "scheduler-lock"] {
            let mut event = configmap_update(
                "kube-system",
                name,
                "/api/v1/namespaces/kube-system/configmaps/x",
                r#"{"kind":"ConfigMap"}"#,
            );
            assert_eq!(filter.filter_event(&mut event), Verdict::Drop, "{name} 应该被丢弃");
        }

        let mut event = configmap_update(
            "kube-system",
            "plain-name",
            "/api/v1/namespaces/kube-system/configmaps/plain-name",
            r#"{"kind":"ConfigMap","metadata":{"annotations":{"control-plane.alpha.kubernetes.io/leader":"..."}},"note":"kubernetes.io/leader"}"#,
        );
        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_benign_error_statuses_are_dropped() {
        for code in [404, 409, 422] {
            let filter = test_filter();
            let mut event = Event {
                level: Level::Request,
                verb: "delete".to_string(),
                user: user("system:serviceaccount:default:gc"),
                object_ref: Some(ObjectReference {
                    resource: Some("pods".to_string()),
                    ..Default::default()
                }),
                response_status: Some(Status {
                    code: Some(code),
                    ..Default::default()
                }),
                ..Default::default()
            };
            assert_eq!(filter.filter_event(&mut event), Verdict::Drop, "{code} 应该被丢弃");
        }

        // 200 不受影响
        let filter = test_filter();
        let mut event = Event {
            level: Level::Metadata,
            verb: "delete".to_string(),
            user: user("system:serviceaccount:default:gc"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            response_status: Some(Status {
                code: Some(200),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
    }

    #[test]
    fn test_update_collapses_to_patch_on_second_sighting() {
        let filter = test_filter();
        let uri = "/api/v1/namespaces/x/configmaps/c";

        let mut first = configmap_update("x", "c", uri, r#"{"data":{"k":"v1"}}"#);
        assert_eq!(filter.filter_event(&mut first), Verdict::Keep);
        assert_eq!(first.verb, "update", "第一次出现没有差分基线");
        assert!(!first.annotations.contains_key(CONVERTED_TO_PATCH_ANNOTATION));

        let mut second = configmap_update("x", "c", uri, r#"{"data":{"k":"v2"}}"#);
        assert_eq!(filter.filter_event(&mut second), Verdict::Keep);
        assert_eq!(second.verb, "patch");
        assert_eq!(
            second.annotations.get(CONVERTED_TO_PATCH_ANNOTATION),
            Some(&"true".to_string())
        );
        assert_eq!(
            second.request_object.as_ref().map(|o| o.raw()),
            Some(r#"{"data":{"k":"v2"}}"#)
        );
    }

    #[test]
    fn test_query_string_does_not_split_cache_key() {
        let filter = test_filter();

        let mut first = configmap_update(
            "x",
            "c",
            "/api/v1/namespaces/x/configmaps/c?timeout=30s",
            r#"{"data":{"k":"v1"}}"#,
        );
        filter.filter_event(&mut first);

        let mut second = configmap_update(
            "x",
            "c",
            "/api/v1/namespaces/x/configmaps/c?fieldManager=kubectl",
            r#"{"data":{"k":"v2"}}"#,
        );
        assert_eq!(filter.filter_event(&mut second), Verdict::Keep);
        assert_eq!(second.verb, "patch");
    }

    #[test]
    fn test_metadata_changes_do_not_enter_the_diff() {
        let filter = test_filter();
        let uri = "/api/v1/namespaces/x/configmaps/c";

        let mut first = configmap_update(
            "x",
            "c",
            uri,
            r#"{"metadata":{"resourceVersion":"1"},"data":{"k":"v"}}"#,
        );
        filter.filter_event(&mut first);

        // 只有 metadata 变了：规范化后差分为空补丁，整条事件被丢弃
        let mut second = configmap_update(
            "x",
            "c",
            uri,
            r#"{"metadata":{"resourceVersion":"2"},"data":{"k":"v"}}"#,
        );
        assert_eq!(filter.filter_event(&mut second), Verdict::Drop);
        assert_eq!(second.verb, "patch");
    }

    #[test]
    fn test_empty_update_body_is_dropped() {
        for body in ["{}", "null"] {
            let filter = test_filter();
            // 用 patch 绕过归约步骤，验证空体判定本身
            let mut event = configmap_update("x", "plain", "/api/v1/x", body);
            event.verb = "patch".to_string();
            assert_eq!(filter.filter_event(&mut event), Verdict::Drop, "{body} 应该被丢弃");
        }
    }

    #[test]
    fn test_level_none_event_is_dropped() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::None,
            verb: "create".to_string(),
            user: user("system:serviceaccount:default:sa"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_update_level_downgraded_from_request_response() {
        let filter = test_filter();
        let mut event = configmap_update(
            "x",
            "plain",
            "/api/v1/namespaces/x/configmaps/plain",
            r#"{"data":{"k":"v"}}"#,
        );
        event.level = Level::RequestResponse;
        event.response_object = Some(Unknown::from_json(r#"{"kind":"ConfigMap"}"#.to_string()).unwrap());

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Request);
        assert!(event.response_object.is_none());
    }

    #[test]
    fn test_oversized_event_loses_annotations_first() {
        let filter = test_filter();
        let snapshot = "x".repeat(MAX_LINE_LENGTH);
        let body = format!(
            r#"{{"metadata":{{"annotations":{{"kubectl.kubernetes.io/last-applied-configuration":"{snapshot}"}}}},"data":{{"k":"v"}}}}"#
        );
        let mut event = Event {
            level: Level::Request,
            verb: "create".to_string(),
            user: user("system:serviceaccount:x:sa"),
            object_ref: Some(ObjectReference {
                resource: Some("deployments".to_string()),
                namespace: Some("x".to_string()),
                name: Some("app".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(body).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        // 剥离注解后已经够小，级别保持 Request
        assert_eq!(event.level, Level::Request);
        let reduced = event.request_object.as_ref().expect("请求体应该保留");
        assert!(!reduced.raw().contains("last-applied-configuration"));
        assert!(reduced.raw().contains(r#""data""#));
    }

    #[test]
    fn test_oversized_event_falls_back_to_metadata() {
        let filter = test_filter();
        let request = format!(r#"{{"data":{{"blob":"{}"}}}}"#, "r".repeat(2_000_000));
        let response = format!(r#"{{"data":{{"blob":"{}"}}}}"#, "s".repeat(2_000_000));
        let mut event = Event {
            level: Level::RequestResponse,
            verb: "update".to_string(),
            user: user("system:serviceaccount:x:sa"),
            object_ref: Some(ObjectReference {
                resource: Some("configmaps".to_string()),
                namespace: Some("x".to_string()),
                name: Some("big".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(request).unwrap()),
            response_object: Some(Unknown::from_json(response).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Metadata);
        assert!(event.request_object.is_none());
        assert!(event.response_object.is_none());
    }

    #[test]
    fn test_max_line_length_zero_forces_metadata() {
        let mut filter = test_filter();
        filter.max_line_length = 0;

        let mut event = Event {
            level: Level::Request,
            verb: "create".to_string(),
            user: user("system:serviceaccount:x:sa"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(r#"{"k":"v"}"#.to_string()).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Metadata);
        assert!(event.request_object.is_none());
    }

    #[test]
    fn test_human_user_bypasses_size_reduction() {
        // 人类用户的保留是终结性裁决，体积归约不再介入
        let mut filter = test_filter();
        filter.max_line_length = 0;

        let mut event = Event {
            level: Level::Request,
            verb: "create".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(r#"{"k":"v"}"#.to_string()).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Request);
        assert!(event.request_object.is_some());
    }

    #[test]
    fn test_policy_match_sets_level_and_clears_payloads() {
        let policy = Policy {
            rules: vec![PolicyRule {
                level: Level::Metadata,
                verbs: vec!["create".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let filter = test_filter_with_policy(policy);

        let mut event = Event {
            level: Level::RequestResponse,
            verb: "create".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(r#"{"k":"v"}"#.to_string()).unwrap()),
            response_object: Some(Unknown::from_json(r#"{"k":"v"}"#.to_string()).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, Level::Metadata);
        assert!(event.request_object.is_none());
        assert!(event.response_object.is_none());
    }

    #[test]
    fn test_policy_drop_all_rule_drops_everything() {
        let policy = Policy {
            rules: vec![PolicyRule {
                level: Level::None,
                ..Default::default()
            }],
            ..Default::default()
        };
        let filter = test_filter_with_policy(policy);

        // 即使是人类用户也被策略丢弃：策略优先于启发式规则
        let mut event = Event {
            level: Level::Request,
            verb: "create".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(filter.filter_event(&mut event), Verdict::Drop);
    }

    #[test]
    fn test_filtering_is_idempotent_for_survivors() {
        let filter = test_filter();
        let mut event = Event {
            level: Level::Request,
            verb: "create".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            }),
            request_object: Some(Unknown::from_json(r#"{"spec":{"replicas":1}}"#.to_string()).unwrap()),
            ..Default::default()
        };

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        let level_after_first = event.level.clone();
        let body_after_first = event.request_object.as_ref().map(|o| o.raw().to_string());

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert_eq!(event.level, level_after_first, "级别不应该在重复过滤中上升");
        assert_eq!(
            event.request_object.as_ref().map(|o| o.raw().to_string()),
            body_after_first
        );
    }

    #[test]
    fn test_accepted_events_are_internally_consistent() {
        // 保留的事件必须满足级别与负载的约束
        let filter = test_filter();
        let mut event = configmap_update(
            "x",
            "plain",
            "/api/v1/namespaces/x/configmaps/plain",
            r#"{"data":{"k":"v"}}"#,
        );
        event.level = Level::RequestResponse;
        event.response_object = Some(Unknown::from_json(r#"{"x":1}"#.to_string()).unwrap());

        assert_eq!(filter.filter_event(&mut event), Verdict::Keep);
        assert!(event.level.greater_or_equal(&Level::Metadata));
        if event.level.less(&Level::RequestResponse) {
            assert!(event.response_object.is_none());
        }
        if event.level.less(&Level::Request) {
            assert!(event.request_object.is_none());
        }
    }

    #[test]
    fn test_verdict_accounting_matches_processed_totals() {
        let filter = test_filter();

        let mut kept = Event {
            level: Level::Metadata,
            verb: "list".to_string(),
            user: user("alice"),
            object_ref: Some(ObjectReference {
                resource: Some("pods".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut dropped = Event {
            level: Level::Metadata,
            verb: "get".to_string(),
            user: user("system:anonymous"),
            request_uri: "/version".to_string(),
            ..Default::default()
        };

        filter.filter_event(&mut kept);
        filter.filter_event(&mut dropped);

        let accept = filter
            .metrics
            .events_processed
            .with_label_values(&["accept"])
            .get() as u64;
        let drop = filter
            .metrics
            .events_processed
            .with_label_values(&["drop"])
            .get() as u64;
        assert_eq!((accept, drop), (1, 1));
    }
}
