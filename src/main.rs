//! 审计日志转发器入口
//!
//! 日志走 stderr，标准输出保留给转发的事件流。

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use audit_forwarder::cache::PriorVersionCache;
use audit_forwarder::metrics::{ForwarderMetrics, DEFAULT_METRICS_ADDR};
use audit_forwarder::option::Options;
use audit_forwarder::pipeline::Pipeline;
use audit_forwarder::watcher::{self, SharedPolicy};
use k8s_audit_core::policy::reader;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    let options = Options::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(options).await {
        tracing::error!(error = %err, "audit-forwarder failed");
        std::process::exit(1);
    }
}

async fn run(options: Options) -> Result<(), BoxError> {
    let metrics = Arc::new(ForwarderMetrics::new()?);
    metrics.serve(DEFAULT_METRICS_ADDR.into());

    // 启动时策略不可读是配置错误，直接终止
    let policy = reader::load_policy_from_file(&options.policy).map_err(|err| {
        format!("error loading policy {}: {err}", options.policy.display())
    })?;
    let shared_policy = SharedPolicy::new(policy);

    if !options.no_follow {
        watcher::spawn_policy_watcher(options.policy.clone(), shared_policy.clone());
    }

    let cache = Arc::new(PriorVersionCache::default());
    let pipeline = Pipeline::new(&options, shared_policy, cache, Arc::clone(&metrics));
    pipeline.run(std::io::stdout()).await?;

    // no-follow 模式干净退出时把指标写到 stderr
    metrics.dump(&mut std::io::stderr())?;

    Ok(())
}
