//! # Fetcher 模块
//!
//! 文件系统拉取器：检查资源文件是否存在，并为它分配句柄。
//!
//! 拉取结果先放进共享的完成队列，由驱动循环以
//! `GameInput::AssetFetched` 回传给核心，和真实宿主的异步回调顺序一致。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use adventure_core::{AssetFetcher, AssetHandle, AssetKey, GameInput};
use tracing::{debug, warn};

/// 已完成、尚未回传的拉取
pub type Completions = Rc<RefCell<VecDeque<(AssetKey, Result<AssetHandle, String>)>>>;

/// 文件系统拉取器
#[derive(Debug)]
pub struct FsFetcher {
    root: PathBuf,
    require_files: bool,
    next_handle: u64,
    completions: Completions,
}

impl FsFetcher {
    pub fn new(root: impl AsRef<Path>, require_files: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            require_files,
            next_handle: 0,
            completions: Completions::default(),
        }
    }

    /// 完成队列的共享句柄
    pub fn completions(&self) -> Completions {
        Rc::clone(&self.completions)
    }

    /// 资源文件：`<root>/<kind>/<id>`，不存在时再试 `.json` 后缀
    fn locate(&self, key: &AssetKey) -> Option<PathBuf> {
        let path = self.root.join(key.path());
        if path.exists() {
            return Some(path);
        }
        let with_ext = self.root.join(format!("{}.json", key.path()));
        with_ext.exists().then_some(with_ext)
    }
}

impl AssetFetcher for FsFetcher {
    fn request(&mut self, key: &AssetKey) {
        let result = match self.locate(key) {
            Some(path) => {
                debug!(asset = %key, path = ?path, "资源就绪");
                Ok(())
            }
            None if self.require_files => {
                warn!(asset = %key, "资源文件不存在");
                Err(format!("文件不存在: {}", key.path()))
            }
            None => {
                debug!(asset = %key, "资源文件不存在，使用占位句柄");
                Ok(())
            }
        };
        let result = result.map(|()| {
            self.next_handle += 1;
            AssetHandle(self.next_handle)
        });
        self.completions.borrow_mut().push_back((key.clone(), result));
    }

    fn evict(&mut self, key: &AssetKey, handle: AssetHandle) {
        debug!(asset = %key, handle = handle.0, "释放资源");
    }
}

/// 取出全部完成项，转成输入
pub fn drain_inputs(completions: &Completions) -> Vec<GameInput> {
    completions
        .borrow_mut()
        .drain(..)
        .map(|(asset, result)| GameInput::AssetFetched { asset, result })
        .collect()
}
