//! # Resources 模块
//!
//! 资源加载器：场景内容包、背景图、视频的异步拉取、缓存和释放。
//!
//! ## 设计原则
//!
//! - 核心不做 IO，真正的拉取交给宿主实现的 [`AssetFetcher`]
//! - 宿主拉取完成后通过 `GameInput::AssetFetched` 回传结果
//! - 同一资源同时最多只有一个在途拉取，后来的请求挂到同一个结果上
//! - 资源路径使用**逻辑路径**（`scenes/<id>`、`backgrounds/<path>`、`videos/<id>`）

mod cache;

pub use cache::{AssetCache, CacheStats};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::LoadError;

/// 资源类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// 场景内容包
    Scene,
    /// 背景图
    Background,
    /// 过场视频
    Video,
}

impl AssetKind {
    /// 逻辑路径前缀
    pub fn dir(&self) -> &'static str {
        match self {
            Self::Scene => "scenes",
            Self::Background => "backgrounds",
            Self::Video => "videos",
        }
    }
}

/// 资源键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub id: String,
}

impl AssetKey {
    pub fn new(kind: AssetKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn scene(id: impl Into<String>) -> Self {
        Self::new(AssetKind::Scene, id)
    }

    pub fn background(path: impl Into<String>) -> Self {
        Self::new(AssetKind::Background, path)
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self::new(AssetKind::Video, id)
    }

    /// 逻辑路径
    pub fn path(&self) -> String {
        format!("{}/{}", self.kind.dir(), self.id)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.dir(), self.id)
    }
}

/// 宿主分配的不透明资源句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(pub u64);

/// 一次加载请求的凭据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// `load` 的结果：命中缓存立即可用，否则等待回传
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    Ready(AssetHandle),
    Pending(LoadTicket),
}

/// 一张凭据的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub ticket: LoadTicket,
    pub key: AssetKey,
    pub result: Result<AssetHandle, LoadError>,
}

/// 拉取原语（由宿主实现）
pub trait AssetFetcher {
    /// 开始拉取；完成后宿主以 `GameInput::AssetFetched` 回传
    fn request(&mut self, key: &AssetKey);

    /// 资源已被驱逐，宿主可以释放对应内容
    fn evict(&mut self, _key: &AssetKey, _handle: AssetHandle) {}
}

/// 什么都不拉取的占位实现（所有请求永远挂起）
#[derive(Debug, Default)]
pub struct NullFetcher;

impl AssetFetcher for NullFetcher {
    fn request(&mut self, key: &AssetKey) {
        debug!(asset = %key, "NullFetcher 忽略拉取请求");
    }
}

/// 资源加载器
pub struct ResourceLoader {
    fetcher: Box<dyn AssetFetcher>,
    cache: AssetCache,
    /// 在途请求：资源 -> 等待它的凭据
    in_flight: HashMap<AssetKey, Vec<LoadTicket>>,
    next_ticket: u64,
}

impl fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl ResourceLoader {
    pub fn new(fetcher: Box<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            cache: AssetCache::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// 加载资源
    ///
    /// 已缓存的资源直接返回并加一次引用，不会重新拉取。
    pub fn load(&mut self, key: AssetKey) -> LoadRequest {
        if let Some(handle) = self.cache.acquire(&key) {
            debug!(asset = %key, "资源命中缓存");
            return LoadRequest::Ready(handle);
        }

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        match self.in_flight.get_mut(&key) {
            Some(waiting) => {
                self.cache.record_coalesced();
                waiting.push(ticket);
                debug!(asset = %key, "合并到在途请求");
            }
            None => {
                debug!(asset = %key, "开始拉取");
                self.fetcher.request(&key);
                self.in_flight.insert(key, vec![ticket]);
            }
        }
        LoadRequest::Pending(ticket)
    }

    pub fn load_scene(&mut self, id: &str) -> LoadRequest {
        self.load(AssetKey::scene(id))
    }

    pub fn load_background(&mut self, path: &str) -> LoadRequest {
        self.load(AssetKey::background(path))
    }

    pub fn load_video(&mut self, id: &str) -> LoadRequest {
        self.load(AssetKey::video(id))
    }

    /// 宿主回传拉取结果，解析所有等待该资源的凭据
    ///
    /// 成功时每张凭据各持有一次引用。没有在途请求的回传会被忽略。
    pub fn complete(
        &mut self,
        key: &AssetKey,
        result: Result<AssetHandle, String>,
    ) -> Vec<Resolution> {
        let Some(tickets) = self.in_flight.remove(key) else {
            warn!(asset = %key, "收到未请求的资源回传，已忽略");
            return Vec::new();
        };

        match result {
            Ok(handle) => {
                self.cache.insert(key.clone(), handle, tickets.len() as u32);
                tickets
                    .into_iter()
                    .map(|ticket| Resolution {
                        ticket,
                        key: key.clone(),
                        result: Ok(handle),
                    })
                    .collect()
            }
            Err(cause) => {
                warn!(asset = %key, cause = %cause, "资源拉取失败");
                self.cache.record_failure();
                tickets
                    .into_iter()
                    .map(|ticket| Resolution {
                        ticket,
                        key: key.clone(),
                        result: Err(LoadError::FetchFailed {
                            asset: key.clone(),
                            cause: cause.clone(),
                        }),
                    })
                    .collect()
            }
        }
    }

    /// 释放一次引用，归零时驱逐；重复释放是空操作
    pub fn release(&mut self, key: &AssetKey) {
        if let Some(handle) = self.cache.release(key) {
            debug!(asset = %key, "资源已驱逐");
            self.fetcher.evict(key, handle);
        }
    }

    pub fn release_scene(&mut self, id: &str) {
        self.release(&AssetKey::scene(id));
    }

    pub fn release_video(&mut self, id: &str) {
        self.release(&AssetKey::video(id));
    }

    pub fn is_cached(&self, key: &AssetKey) -> bool {
        self.cache.contains(key)
    }

    pub fn is_in_flight(&self, key: &AssetKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn ref_count(&self, key: &AssetKey) -> u32 {
        self.cache.ref_count(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
