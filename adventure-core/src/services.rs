//! # Services 模块
//!
//! 各组件共享的上下文：内容目录、模式状态机、存档、资源加载器、通知发件箱。
//!
//! 由 `GameCore` 构造一次并持有，组件通过 `&mut Services` 访问，没有全局单例。

use crate::catalog::Catalog;
use crate::mode::{GameMode, ModeMachine};
use crate::notification::{Notification, Outbox};
use crate::resources::ResourceLoader;
use crate::save_manager::SaveManager;

/// 共享上下文
#[derive(Debug)]
pub struct Services {
    pub catalog: Catalog,
    pub mode: ModeMachine,
    pub save: SaveManager,
    pub loader: ResourceLoader,
    pub outbox: Outbox,
}

impl Services {
    pub fn new(catalog: Catalog, save: SaveManager, loader: ResourceLoader) -> Self {
        Self {
            catalog,
            mode: ModeMachine::new(),
            save,
            loader,
            outbox: Outbox::new(),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode.current()
    }

    /// 切换模式（见 [`ModeMachine::set_mode`]）
    pub fn set_mode(&mut self, mode: GameMode) -> bool {
        self.mode.set_mode(mode, &mut self.outbox)
    }

    pub fn is_input_allowed(&self) -> bool {
        self.mode.is_input_allowed()
    }

    pub fn emit(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }
}
