//! # Adventure Core
//!
//! 点击式叙事冒险游戏的流程控制核心库。
//!
//! ## 架构概述
//!
//! `adventure-core` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 它通过 **意图 / 通知** 与宿主层（Host）通信：
//!
//! ```text
//! Host                              Core
//!   │                                 │
//!   │──── GameInput ────────────────►│
//!   │                                 │ handle_input()
//!   │◄─── Vec<Notification> ─────────│ drain_notifications()
//!   │                                 │
//!   │◄─── AssetFetcher::request ─────│
//!   │──── GameInput::AssetFetched ──►│
//! ```
//!
//! ## 核心类型
//!
//! - [`GameCore`]：组合根，持有所有组件
//! - [`GameInput`]：宿主向核心传递的输入
//! - [`Notification`]：核心向宿主发出的事件和指令
//! - [`PlayState`]：可序列化的游戏进度
//! - [`Catalog`]：只读的内容目录
//!
//! ## 使用示例
//!
//! ```ignore
//! use adventure_core::{Catalog, CoreConfig, GameCore, GameInput, MemoryStore};
//!
//! let catalog = Catalog::from_json(&text)?;
//! let mut core = GameCore::new(catalog, Box::new(MemoryStore::new()), Box::new(fetcher), &CoreConfig::default());
//! core.boot();
//!
//! core.handle_input(GameInput::NewGame);
//! for notification in core.drain_notifications() {
//!     host.present(notification);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`mode`]：游戏模式状态机
//! - [`save_manager`] / [`save`] / [`state`] / [`store`]：进度与存档
//! - [`resources`]：资源加载与缓存
//! - [`scene_view`]：场景视图控制器
//! - [`dialogue`]：对话解释器
//! - [`story`]：剧情解释器
//! - [`interaction`] / [`inventory`]：交互路由与物品选中
//! - [`catalog`]：内容目录与静态检查
//! - [`game`]：组合根

pub mod catalog;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod game;
pub mod input;
pub mod interaction;
pub mod inventory;
pub mod mode;
pub mod notification;
pub mod resources;
pub mod save;
pub mod save_manager;
pub mod scene_view;
pub mod services;
pub mod state;
pub mod store;
pub mod story;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心类型
pub use catalog::{Catalog, Diagnostic, DiagnosticLevel, DiagnosticResult};
pub use config::CoreConfig;
pub use error::{
    CatalogError, ContentError, CoreError, CoreResult, LoadError, SaveError, StoreError,
};
pub use game::GameCore;
pub use input::GameInput;
pub use interaction::ViewHandle;
pub use mode::GameMode;
pub use notification::{DialogueLineView, Notification, ViewRequest};
pub use resources::{AssetFetcher, AssetHandle, AssetKey, AssetKind, CacheStats, NullFetcher};
pub use save::{SaveSlotInfo, SlotId};
pub use save_manager::SaveManager;
pub use state::{FlagValue, PlayState, SCHEMA_VERSION};
pub use store::{KeyValueStore, MemoryStore};
