//! 轮转安全的文件尾随
//!
//! 跟随一个只追加的日志文件，跨越任意的重命名/轮转/重建周期，
//! 不丢行也不重复读。实现为显式状态机：文件系统事件被归并为
//! 单一通道上的标记事件，状态机决定何时读、何时重开。
//!
//! 轮转的判据是路径上的 inode 与当前持有句柄的 inode 不一致；
//! 检测到轮转后旧句柄仍被读到 EOF，轮转走的尾部字节不会丢失。

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc::Sender;

use crate::metrics::ForwarderMetrics;

/// 从原始文件系统事件派生的标记事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEvent {
    /// 文件内容有新写入
    Modified,
    /// 路径上出现了新文件
    Created,
    /// 路径上的文件被删除
    Removed,
    /// 路径上的文件被改名（典型的轮转动作）
    Rotated,
}

/// 状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailerState {
    /// 路径上还没有可读的文件
    WaitingForFile,
    /// 正在读当前句柄
    Reading,
    /// 已检测到轮转，读完旧句柄的剩余字节
    DrainingRotated,
    /// 尾随结束
    Terminated,
}

/// 跨轮转的文件尾随器
pub struct RotatingTailer {
    path: PathBuf,
    follow: bool,
    events: Option<mpsc::Receiver<TailEvent>>,
    _watcher: Option<notify::RecommendedWatcher>,
    reader: Option<BufReader<File>>,
    inode: u64,
    pending: Vec<u8>,
}

impl RotatingTailer {
    /// 创建尾随器
    ///
    /// follow 模式下同时监视文件路径与其父目录：某些轮转策略先删除
    /// 再创建，仅监视文件会让监视点失效。监视器创建失败是致命错误。
    pub fn new(path: impl Into<PathBuf>, follow: bool) -> notify::Result<Self> {
        let path = path.into();

        let (events, watcher) = if follow {
            let (event_tx, event_rx) = mpsc::channel();
            let watched = path.clone();

            let mut watcher = notify::recommended_watcher(
                move |result: notify::Result<notify::Event>| {
                    let Ok(event) = result else { return };
                    if !event.paths.is_empty() && !event.paths.iter().any(|p| p == &watched) {
                        return;
                    }
                    if let Some(tagged) = classify(&event.kind) {
                        let _ = event_tx.send(tagged);
                    }
                },
            )?;

            // 文件可能尚不存在；目录监视兜底
            let _ = watcher.watch(&path, RecursiveMode::NonRecursive);
            let dir = parent_dir(&path);
            watcher.watch(dir, RecursiveMode::NonRecursive)?;

            (Some(event_rx), Some(watcher))
        } else {
            (None, None)
        };

        Ok(RotatingTailer {
            path,
            follow,
            events,
            _watcher: watcher,
            reader: None,
            inode: 0,
            pending: Vec::new(),
        })
    }

    /// 运行状态机，把完整的行送入 `lines`
    ///
    /// 在专用线程上调用；follow 模式下直到对端关闭才返回。
    /// 每送出一行递增一次 queue_depth。
    pub fn run(mut self, lines: Sender<Vec<u8>>, metrics: Arc<ForwarderMetrics>) {
        let mut state = if self.try_open() {
            TailerState::Reading
        } else if self.follow {
            TailerState::WaitingForFile
        } else {
            tracing::warn!(path = %self.path.display(), "input file missing, nothing to read");
            TailerState::Terminated
        };

        loop {
            state = match state {
                TailerState::WaitingForFile => {
                    if self.try_open() {
                        TailerState::Reading
                    } else {
                        match self.recv_event() {
                            Some(_) => TailerState::WaitingForFile,
                            None => TailerState::Terminated,
                        }
                    }
                }

                TailerState::Reading => {
                    if !self.drain(&lines, &metrics) {
                        TailerState::Terminated
                    } else if !self.follow {
                        self.flush_pending(&lines, &metrics);
                        TailerState::Terminated
                    } else if self.has_rotated() {
                        TailerState::DrainingRotated
                    } else {
                        match self.recv_event() {
                            Some(_) => TailerState::Reading,
                            None => TailerState::Terminated,
                        }
                    }
                }

                TailerState::DrainingRotated => {
                    tracing::debug!(path = %self.path.display(), "file rotated, draining old handle");
                    let delivered = self.drain(&lines, &metrics);
                    // 旧句柄不会再有新字节，残留的半行在此冲出
                    self.flush_pending(&lines, &metrics);
                    self.reader = None;
                    self.inode = 0;
                    if delivered {
                        TailerState::WaitingForFile
                    } else {
                        TailerState::Terminated
                    }
                }

                TailerState::Terminated => break,
            };
        }
    }

    /// 尝试打开路径上的文件，成功后记录其 inode
    fn try_open(&mut self) -> bool {
        match File::open(&self.path) {
            Ok(file) => {
                self.inode = file.metadata().map(|m| m.ino()).unwrap_or(0);
                self.reader = Some(BufReader::new(file));
                true
            }
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "input not yet readable");
                false
            }
        }
    }

    /// 路径上的 inode 是否已不同于当前持有的句柄
    fn has_rotated(&self) -> bool {
        self.inode != inode_at(&self.path)
    }

    /// 把当前句柄读到 EOF，送出每个完整的行
    ///
    /// 返回 false 表示对端已关闭，尾随应当终止。
    fn drain(&mut self, lines: &Sender<Vec<u8>>, metrics: &ForwarderMetrics) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return true;
        };

        loop {
            match reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => return true,
                Ok(_) => {
                    if self.pending.ends_with(b"\n") {
                        let line = std::mem::take(&mut self.pending);
                        metrics.queue_depth.inc();
                        if lines.blocking_send(line).is_err() {
                            return false;
                        }
                    }
                    // 没有换行说明读到了 EOF 处的半行，留待下次事件
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::debug!(path = %self.path.display(), error = %err, "read failed, will retry on next event");
                    return true;
                }
            }
        }
    }

    /// 终止前把残留的半行送出，绝不静默丢弃
    fn flush_pending(&mut self, lines: &Sender<Vec<u8>>, metrics: &ForwarderMetrics) {
        if self.pending.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.pending);
        metrics.queue_depth.inc();
        let _ = lines.blocking_send(line);
    }

    fn recv_event(&self) -> Option<TailEvent> {
        match &self.events {
            Some(event_rx) => event_rx.recv().ok(),
            None => None,
        }
    }
}

/// 把原始 notify 事件归并为标记事件
fn classify(kind: &EventKind) -> Option<TailEvent> {
    match kind {
        EventKind::Create(_) => Some(TailEvent::Created),
        EventKind::Remove(_) => Some(TailEvent::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(TailEvent::Rotated),
        EventKind::Modify(_) => Some(TailEvent::Modified),
        _ => None,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn inode_at(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.ino()).unwrap_or(0)
}
