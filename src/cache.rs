//! 上一版本缓存
//!
//! 进程级的有界 LRU 映射：请求键（去掉查询串的 RequestURI）到最近
//! 一次观察到的规范化请求体。update → patch 归约用它取得差分基线。

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// 缓存容量，超出后按最近最少使用淘汰
pub const PRIOR_VERSION_CAPACITY: usize = 1024;

/// 请求体的上一版本缓存
///
/// 作为显式依赖传入过滤阶段；测试按用例注入新实例。
pub struct PriorVersionCache {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl PriorVersionCache {
    /// 创建给定容量的缓存，容量最小为 1
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PriorVersionCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// 写入键的新版本，返回此前存储的版本
    ///
    /// 无论是否存在旧版本，新版本都无条件成为该键的当前值。
    pub fn swap(&self, key: &str, now: Vec<u8>) -> Option<Vec<u8>> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.put(key.to_string(), now)
    }

    /// 当前缓存的条目数
    pub fn len(&self) -> usize {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PriorVersionCache {
    fn default() -> Self {
        PriorVersionCache::new(PRIOR_VERSION_CAPACITY)
    }
}
