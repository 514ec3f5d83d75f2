//! 转发器指标
//!
//! 在独立的 Registry 上注册事件计数器与队列深度，通过 :9090 的
//! /metrics 端点以 Prometheus 文本格式暴露。

use std::convert::Infallible;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use k8s_audit_apis::audit;

const NAMESPACE: &str = "splunkforwarder";
const SUBSYSTEM: &str = "audit_policy";

/// 指标端点的默认监听地址
pub const DEFAULT_METRICS_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9090);

/// 转发器的全部指标
pub struct ForwarderMetrics {
    registry: Registry,

    /// 成功解析的事件数
    pub events_total: Counter,
    /// 按动词和资源统计的接受事件数
    pub events_accepted: CounterVec,
    /// 按动词和资源统计的丢弃事件数
    pub events_dropped: CounterVec,
    /// 按裁决统计的已处理事件数
    pub events_processed: CounterVec,
    /// 编解码错误数
    pub errors_total: Counter,
    /// 管道中等待处理的事件数
    pub queue_depth: Gauge,
}

impl ForwarderMetrics {
    /// 创建并注册全部指标
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_total = Counter::with_opts(opts("events_total", "count of events parsed"))?;
        registry.register(Box::new(events_total.clone()))?;

        let events_accepted = CounterVec::new(
            opts("events_accepted", "count of accepted events"),
            &["verb", "resource"],
        )?;
        registry.register(Box::new(events_accepted.clone()))?;

        let events_dropped = CounterVec::new(
            opts("events_dropped", "count of dropped events"),
            &["verb", "resource"],
        )?;
        registry.register(Box::new(events_dropped.clone()))?;

        let events_processed = CounterVec::new(
            opts("events_processed_total", "count of processed events"),
            &["verdict"],
        )?;
        registry.register(Box::new(events_processed.clone()))?;

        let errors_total =
            Counter::with_opts(opts("errors_total", "count of encoding or decoding errors"))?;
        registry.register(Box::new(errors_total.clone()))?;

        let queue_depth = Gauge::with_opts(opts(
            "queue_depth",
            "number of events waiting to be processed",
        ))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(ForwarderMetrics {
            registry,
            events_total,
            events_accepted,
            events_dropped,
            events_processed,
            errors_total,
            queue_depth,
        })
    }

    /// 记录一次丢弃裁决
    pub fn observe_drop(&self, event: &audit::Event) {
        let resource = resource_label(event);
        self.events_dropped
            .with_label_values(&[event.verb.as_str(), resource.as_str()])
            .inc();
        self.events_processed.with_label_values(&["drop"]).inc();
    }

    /// 记录一次接受裁决
    pub fn observe_accept(&self, event: &audit::Event) {
        let resource = resource_label(event);
        self.events_accepted
            .with_label_values(&[event.verb.as_str(), resource.as_str()])
            .inc();
        self.events_processed.with_label_values(&["accept"]).inc();
    }

    /// 把当前全部指标族编码到给定的写入器
    pub fn dump<W: Write>(&self, writer: &mut W) -> Result<(), prometheus::Error> {
        let families = self.registry.gather();
        TextEncoder::new().encode(&families, writer)
    }

    /// 在后台启动 /metrics HTTP 端点
    pub fn serve(self: &Arc<Self>, addr: SocketAddr) -> tokio::task::JoinHandle<()> {
        let metrics = Arc::clone(self);

        tokio::spawn(async move {
            let make_svc = make_service_fn(move |_conn| {
                let metrics = Arc::clone(&metrics);
                async move {
                    Ok::<_, Infallible>(service_fn(move |request: Request<Body>| {
                        let metrics = Arc::clone(&metrics);
                        async move { Ok::<_, Infallible>(metrics.handle(request)) }
                    }))
                }
            });

            let server = match Server::try_bind(&addr) {
                Ok(builder) => builder.serve(make_svc),
                Err(err) => {
                    tracing::warn!(error = %err, %addr, "failed to bind metrics endpoint");
                    return;
                }
            };

            if let Err(err) = server.await {
                tracing::warn!(error = %err, "metrics endpoint terminated");
            }
        })
    }

    fn handle(&self, request: Request<Body>) -> Response<Body> {
        if request.uri().path() != "/metrics" {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_FOUND;
            return response;
        }

        let mut buffer = Vec::new();
        if let Err(err) = self.dump(&mut buffer) {
            tracing::warn!(error = %err, "failed to encode metrics");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            return response;
        }

        let mut response = Response::new(Body::from(buffer));
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static(prometheus::TEXT_FORMAT),
        );
        response
    }
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM)
}

/// 计数器的 resource 标签：`resource[/subresource]`，非资源请求用原始 URI
fn resource_label(event: &audit::Event) -> String {
    match &event.object_ref {
        Some(object_ref) => {
            let resource = object_ref.resource.clone().unwrap_or_default();
            match object_ref.subresource.as_deref() {
                Some(subresource) if !subresource.is_empty() => {
                    format!("{}/{}", resource, subresource)
                }
                _ => resource,
            }
        }
        None => event.request_uri.clone(),
    }
}
