//! # Store 模块
//!
//! 持久化存储抽象：字符串键值对的读、写、删。
//!
//! 具体后端（文件、浏览器 localStorage 等）由宿主提供。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StoreError;

/// 键值存储 trait
pub trait KeyValueStore {
    /// 读取键值；键不存在时返回 `Ok(None)`
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入键值（覆盖）
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// 删除键；键不存在时不报错
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// 内存存储
///
/// 克隆出的句柄共享同一份数据，可以模拟"重启进程后读档"。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前键数量
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 直接写入原始内容（测试用，例如构造损坏的存档）
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
