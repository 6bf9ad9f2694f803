//! # Store 模块
//!
//! 基于文件目录的键值存储，每个键对应一个文件。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! ├── MyGame_Save_auto.json
//! ├── MyGame_Save_slot_01.json
//! └── ...
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use adventure_core::{KeyValueStore, StoreError};
use tracing::debug;

/// 目录存储
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 确保目录存在
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .map_err(|e| StoreError::new(format!("无法创建存档目录: {}", e)))?;
        }
        Ok(())
    }

    /// 键对应的文件路径
    pub fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_of(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::new(format!("无法读取 {}: {}", key, e))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.path_of(key);
        fs::write(&path, value)
            .map_err(|e| StoreError::new(format!("无法写入 {:?}: {}", path, e)))?;
        debug!(path = ?path, "写入存档文件");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_of(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::new(format!("无法删除 {}: {}", key, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let thread_id = std::thread::current().id();
        env::temp_dir().join(format!("adventure_test_store_{}_{:?}", id, thread_id))
    }

    #[test]
    fn test_set_get_delete() {
        let dir = unique_temp_dir();
        let mut store = DirStore::new(&dir);

        assert_eq!(store.get("Demo_slot_01").unwrap(), None);

        store.set("Demo_slot_01", "{}").unwrap();
        assert_eq!(store.get("Demo_slot_01").unwrap(), Some("{}".to_string()));
        assert!(store.path_of("Demo_slot_01").exists());

        store.set("Demo_slot_01", "{\"a\":1}").unwrap();
        assert_eq!(
            store.get("Demo_slot_01").unwrap(),
            Some("{\"a\":1}".to_string())
        );

        store.delete("Demo_slot_01").unwrap();
        assert_eq!(store.get("Demo_slot_01").unwrap(), None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let dir = unique_temp_dir();
        let mut store = DirStore::new(&dir);
        assert!(store.delete("nothing").is_ok());
    }

    #[test]
    fn test_save_manager_over_dir_store() {
        use adventure_core::{CoreConfig, SaveManager, SlotId};
        use adventure_core::notification::Outbox;

        let dir = unique_temp_dir();
        let mut outbox = Outbox::new();
        let mut manager = SaveManager::new(Box::new(DirStore::new(&dir)), &CoreConfig::default());
        manager.start_new_game("bedroom");
        manager.add_item("key", &mut outbox);
        manager
            .save_game(SlotId::Numbered(1), false, &mut outbox)
            .unwrap();

        // 重新打开同一目录
        let reopened = SaveManager::new(Box::new(DirStore::new(&dir)), &CoreConfig::default());
        let state = reopened.read_slot(SlotId::Numbered(1)).unwrap();
        assert_eq!(state.inventory, vec!["key".to_string()]);
        assert!(dir.join("MyGame_Save_slot_01.json").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
