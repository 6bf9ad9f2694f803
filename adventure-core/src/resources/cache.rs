//! # Asset Cache 模块
//!
//! 带引用计数的资源句柄缓存。
//!
//! 每一次成功解析都加一次引用，`release` 减一次，归零时驱逐。

use std::collections::HashMap;

use super::{AssetHandle, AssetKey};

/// 缓存条目
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    handle: AssetHandle,
    /// 引用计数
    ref_count: u32,
}

/// 资源缓存
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: HashMap<AssetKey, CacheEntry>,
    /// 统计：命中次数
    hits: u64,
    /// 统计：未命中次数
    misses: u64,
    /// 统计：挂到已有在途请求上的次数
    coalesced: u64,
    /// 统计：驱逐次数
    evictions: u64,
    /// 统计：拉取失败次数
    failures: u64,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 命中则加一次引用并返回句柄
    pub fn acquire(&mut self, key: &AssetKey) -> Option<AssetHandle> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.ref_count += 1;
                self.hits += 1;
                Some(entry.handle)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// 插入新解析的资源，初始引用数为 `refs`
    pub fn insert(&mut self, key: AssetKey, handle: AssetHandle, refs: u32) {
        if refs == 0 {
            return;
        }
        self.entries
            .entry(key)
            .and_modify(|e| e.ref_count += refs)
            .or_insert(CacheEntry {
                handle,
                ref_count: refs,
            });
    }

    /// 释放一次引用
    ///
    /// 归零时移除条目并返回被驱逐的句柄；未缓存的键什么都不做。
    pub fn release(&mut self, key: &AssetKey) -> Option<AssetHandle> {
        let entry = self.entries.get_mut(key)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return None;
        }
        let handle = entry.handle;
        self.entries.remove(key);
        self.evictions += 1;
        Some(handle)
    }

    /// 只读查询（不计入命中统计）
    pub fn peek(&self, key: &AssetKey) -> Option<AssetHandle> {
        self.entries.get(key).map(|e| e.handle)
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.entries.contains_key(key)
    }

    /// 当前引用数（未缓存为 0）
    pub fn ref_count(&self, key: &AssetKey) -> u32 {
        self.entries.get(key).map(|e| e.ref_count).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(super) fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub(super) fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            coalesced: self.coalesced,
            evictions: self.evictions,
            failures: self.failures,
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 缓存条目数量
    pub entries: usize,
    /// 命中次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 合并到在途请求的次数
    pub coalesced: u64,
    /// 驱逐次数
    pub evictions: u64,
    /// 拉取失败次数
    pub failures: u64,
}

impl CacheStats {
    /// 命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }

    /// 格式化为可读字符串
    pub fn format(&self) -> String {
        format!(
            "Cache: {} entries, hit rate: {:.1}%, coalesced: {}, evictions: {}, failures: {}",
            self.entries,
            self.hit_rate() * 100.0,
            self.coalesced,
            self.evictions,
            self.failures,
        )
    }
}
