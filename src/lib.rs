//! 审计日志转发器
//!
//! 跟踪一个或多个 apiserver 审计日志文件（跨越轮转），把每行解码为
//! 审计事件，按策略与启发式规则过滤、归约，把存活的事件以稳定的
//! `audit.k8s.io/v1` 线格式重新写到标准输出，供下游日志采集器摄取。

pub mod cache;
pub mod codec;
pub mod filter;
pub mod metrics;
pub mod option;
pub mod pipeline;
pub mod tailer;
pub mod watcher;

pub use cache::PriorVersionCache;
pub use codec::Codec;
pub use filter::{Filter, Verdict};
pub use metrics::ForwarderMetrics;
pub use option::Options;
pub use pipeline::Pipeline;
pub use tailer::RotatingTailer;
pub use watcher::SharedPolicy;
