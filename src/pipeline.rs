//! 管道编排
//!
//! 把尾随器、解码、过滤、编码四个阶段用有界通道连接起来：
//!
//! ```text
//! [RotatingTailer ×P] → lines → [Decoder ×W] → decoded → [Filter ×W] → filtered → [Encoder ×W] → out
//! ```
//!
//! 每个路径一个尾随线程，行在进入管道时计入 queue_depth，在任一
//! 阶段退场（解码失败、过滤丢弃或编码写出）时恰好递减一次。
//! no-follow 模式下尾随器到达 EOF 后通道关闭逐级级联，进程随编码
//! 器排空而退出；follow 模式下管道一直运行。

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use k8s_audit_apis::audit;

use crate::cache::PriorVersionCache;
use crate::codec::Codec;
use crate::filter::{Filter, Verdict};
use crate::metrics::ForwarderMetrics;
use crate::option::Options;
use crate::tailer::RotatingTailer;
use crate::watcher::SharedPolicy;

/// 管道级错误，任何一个都终止整个进程
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to watch input file: {0}")]
    Watch(#[from] notify::Error),
    #[error("failed to write to output: {0}")]
    Write(#[from] std::io::Error),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 四阶段处理管道
pub struct Pipeline {
    inputs: Vec<PathBuf>,
    workers: usize,
    no_filter: bool,
    follow: bool,
    max_line_length: usize,
    policy: SharedPolicy,
    cache: Arc<PriorVersionCache>,
    metrics: Arc<ForwarderMetrics>,
}

impl Pipeline {
    pub fn new(
        options: &Options,
        policy: SharedPolicy,
        cache: Arc<PriorVersionCache>,
        metrics: Arc<ForwarderMetrics>,
    ) -> Self {
        Pipeline {
            inputs: options.inputs.iter().map(PathBuf::from).collect(),
            workers: options.workers.max(1),
            no_filter: options.no_filter,
            follow: !options.no_follow,
            max_line_length: options.max_line_length,
            policy,
            cache,
            metrics,
        }
    }

    /// 运行管道直到输入耗尽（no-follow）或对端失败
    pub async fn run<W: Write + Send + 'static>(self, out: W) -> Result<(), PipelineError> {
        let channel_capacity = self.workers;
        let (lines_tx, lines_rx) = mpsc::channel::<Vec<u8>>(channel_capacity);
        let (decoded_tx, decoded_rx) = mpsc::channel::<audit::Event>(channel_capacity);
        let (filtered_tx, filtered_rx) = mpsc::channel::<audit::Event>(channel_capacity);

        // 尾随器先于工作池创建，监视失败在启动期就暴露出来
        let mut tailers = Vec::with_capacity(self.inputs.len());
        for path in &self.inputs {
            tailers.push(RotatingTailer::new(path, self.follow)?);
        }
        let mut tailer_threads = Vec::with_capacity(tailers.len());
        for tailer in tailers {
            let lines_tx = lines_tx.clone();
            let metrics = Arc::clone(&self.metrics);
            tailer_threads.push(std::thread::spawn(move || tailer.run(lines_tx, metrics)));
        }
        drop(lines_tx);

        let codec = Codec;
        let filter = Arc::new(Filter::new(
            self.policy.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.metrics),
            self.max_line_length,
        ));
        let out = Arc::new(Mutex::new(out));

        let mut workers: JoinSet<Result<(), PipelineError>> = JoinSet::new();

        // 解码工作池
        let lines_rx = Arc::new(tokio::sync::Mutex::new(lines_rx));
        for _ in 0..self.workers {
            let lines_rx = Arc::clone(&lines_rx);
            let decoded_tx = decoded_tx.clone();
            let metrics = Arc::clone(&self.metrics);
            workers.spawn(async move {
                loop {
                    let line = { lines_rx.lock().await.recv().await };
                    let Some(line) = line else { break };

                    match codec.decode(&line) {
                        Ok(event) => {
                            metrics.events_total.inc();
                            if decoded_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            metrics.errors_total.inc();
                            metrics.queue_depth.dec();
                            tracing::debug!(error = %err, "dropping undecodable record");
                        }
                    }
                }
                Ok(())
            });
        }
        drop(decoded_tx);

        // 过滤工作池
        let decoded_rx = Arc::new(tokio::sync::Mutex::new(decoded_rx));
        for _ in 0..self.workers {
            let decoded_rx = Arc::clone(&decoded_rx);
            let filtered_tx = filtered_tx.clone();
            let filter = Arc::clone(&filter);
            let metrics = Arc::clone(&self.metrics);
            let no_filter = self.no_filter;
            workers.spawn(async move {
                loop {
                    let event = { decoded_rx.lock().await.recv().await };
                    let Some(mut event) = event else { break };

                    if !no_filter {
                        if filter.filter_event(&mut event) == Verdict::Drop {
                            metrics.queue_depth.dec();
                            continue;
                        }
                    }
                    if filtered_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(())
            });
        }
        drop(filtered_tx);

        // 编码工作池：整行写出在锁内完成，并发输出不会交错
        let filtered_rx = Arc::new(tokio::sync::Mutex::new(filtered_rx));
        for _ in 0..self.workers {
            let filtered_rx = Arc::clone(&filtered_rx);
            let out = Arc::clone(&out);
            let metrics = Arc::clone(&self.metrics);
            workers.spawn(async move {
                loop {
                    let event = { filtered_rx.lock().await.recv().await };
                    let Some(mut event) = event else { break };

                    let line = match codec.encode(&mut event) {
                        Ok(line) => line,
                        Err(err) => {
                            metrics.errors_total.inc();
                            metrics.queue_depth.dec();
                            tracing::debug!(error = %err, "dropping unencodable event");
                            continue;
                        }
                    };

                    {
                        let mut writer = match out.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        // 输出就是交付契约，写失败没有继续运行的意义
                        writer.write_all(&line)?;
                        writer.flush()?;
                    }
                    metrics.queue_depth.dec();
                }
                Ok(())
            });
        }

        while let Some(result) = workers.join_next().await {
            result??;
        }

        for thread in tailer_threads {
            let _ = thread.join();
        }

        Ok(())
    }
}
