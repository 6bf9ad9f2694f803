//! 单元测试共用的构造工具

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::resources::{AssetFetcher, AssetHandle, AssetKey, NullFetcher, ResourceLoader};
use crate::save_manager::SaveManager;
use crate::services::Services;
use crate::store::MemoryStore;

/// 记录拉取请求，测试中手动回传
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingFetcher {
    requested: Rc<RefCell<Vec<AssetKey>>>,
    pending: Rc<RefCell<VecDeque<AssetKey>>>,
}

impl RecordingFetcher {
    /// 所有拉取过的资源（按请求顺序）
    pub(crate) fn requested(&self) -> Vec<AssetKey> {
        self.requested.borrow().clone()
    }

    /// 取出最早的一个在途请求，并为它分配句柄
    pub(crate) fn take_next(&self) -> Option<(AssetKey, AssetHandle)> {
        let key = self.pending.borrow_mut().pop_front()?;
        let handle = AssetHandle(self.requested.borrow().iter().position(|k| *k == key).unwrap_or(0) as u64 + 1);
        Some((key, handle))
    }

    /// 取出全部在途请求
    pub(crate) fn take_pending(&self) -> Vec<(AssetKey, AssetHandle)> {
        std::iter::from_fn(|| self.take_next()).collect()
    }
}

impl AssetFetcher for RecordingFetcher {
    fn request(&mut self, key: &AssetKey) {
        self.requested.borrow_mut().push(key.clone());
        self.pending.borrow_mut().push_back(key.clone());
    }
}

fn catalog(json: &str) -> Catalog {
    Catalog::from_json(json).expect("测试目录应当合法")
}

fn save_manager() -> SaveManager {
    SaveManager::new(Box::new(MemoryStore::new()), &CoreConfig::default())
}

/// 使用永不回传的拉取器
pub(crate) fn services_with(json: &str) -> Services {
    Services::new(
        catalog(json),
        save_manager(),
        ResourceLoader::new(Box::new(NullFetcher)),
    )
}

pub(crate) fn services_with_fetcher(json: &str, fetcher: RecordingFetcher) -> Services {
    Services::new(catalog(json), save_manager(), ResourceLoader::new(Box::new(fetcher)))
}
