//! 策略热加载
//!
//! 策略是不可变快照，通过原子替换共享引用发布。后台线程监视策略
//! 文件及其两层父目录（configmap 挂载通过符号链接交换重写文件），
//! 变更时重新读取；解析失败保留旧策略，过滤阶段永远有策略可用。

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;

use notify::{EventKind, RecursiveMode, Watcher};

use k8s_audit_apis::audit;
use k8s_audit_core::policy::reader;

/// 可热替换的策略快照句柄
///
/// `current` 返回的 Arc 是调用时刻的快照；处理中的事件继续使用
/// 各自取到的快照，不受后续替换影响。
#[derive(Clone)]
pub struct SharedPolicy {
    inner: Arc<RwLock<Arc<audit::Policy>>>,
}

impl SharedPolicy {
    /// 用初始策略创建句柄
    pub fn new(policy: audit::Policy) -> Self {
        SharedPolicy {
            inner: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    /// 当前策略快照
    pub fn current(&self) -> Arc<audit::Policy> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// 原子替换为新策略
    pub fn replace(&self, policy: audit::Policy) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(policy);
    }
}

/// 在后台线程监视策略文件并热加载
///
/// 每次成功加载后重建监视器：符号链接交换会使旧的监视失效。
pub fn spawn_policy_watcher(path: PathBuf, shared: SharedPolicy) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let (event_tx, event_rx) = mpsc::channel::<()>();

        let mut watcher = match notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| {
                if let Ok(event) = result {
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        let _ = event_tx.send(());
                    }
                }
            },
        ) {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::error!(error = %err, "failed to create policy watcher");
                return;
            }
        };

        // 文件本身可能暂时不存在，目录监视保证仍能看到重建
        let _ = watcher.watch(&path, RecursiveMode::NonRecursive);
        if let Some(dir) = path.parent() {
            let _ = watcher.watch(dir, RecursiveMode::NonRecursive);
            if let Some(parent) = dir.parent() {
                let _ = watcher.watch(parent, RecursiveMode::NonRecursive);
            }
        }

        loop {
            match event_rx.recv() {
                Ok(()) => match reader::load_policy_from_file(&path) {
                    Ok(policy) => {
                        shared.replace(policy);
                        tracing::info!(path = %path.display(), "policy has been reloaded");
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "policy reload failed, keeping previous policy");
                    }
                },
                Err(_) => return,
            }
        }
    })
}
