//! # Notification 模块
//!
//! 定义核心向表现层（View/Input 边界）发出的所有通知。
//! Notification 是核心与表现层之间的**唯一输出通道**。
//!
//! ## 设计原则
//!
//! - **声明式**：描述"发生了什么 / 需要显示什么"，不描述怎么画
//! - **封闭枚举**：没有字符串事件名的全局总线，宿主按变体匹配
//! - **引擎无关**：内容句柄对核心是不透明的编号

use serde::{Deserialize, Serialize};

use crate::interaction::ViewHandle;
use crate::mode::GameMode;
use crate::resources::{AssetHandle, AssetKey};
use crate::save::SlotId;
use crate::state::FlagValue;

/// 模式钩子发出的界面请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewRequest {
    ShowMainMenu,
    HideMainMenu,
    ShowPauseMenu,
    HidePauseMenu,
    ShowGameOver,
    HideGameOver,
    ShowGameUi,
    HideGameUi,
}

/// 一行对话的显示内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLineView {
    pub text: String,
    /// 说话者（None 表示旁白）
    pub speaker: Option<String>,
    /// 行号（从 0 开始）
    pub index: usize,
    /// 总行数
    pub total: usize,
}

/// 核心发往表现层的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum Notification {
    // ── 模式 ──
    GameStateChanged { new: GameMode, old: GameMode },
    ViewRequest { request: ViewRequest },

    // ── 场景 ──
    SceneLoadComplete { scene_id: String },
    SceneSwitchStart { scene_id: String },
    SceneSwitchComplete { scene_id: String },
    /// 请求表现层播放转出动画，完成后回传 `TransitionOutDone`
    TransitionOut { scene_id: String },
    /// 请求表现层播放转入动画，完成后回传 `TransitionInDone`
    TransitionIn { scene_id: String },
    /// 可见槽位的内容变化
    PresentScene { scene_id: String, handle: AssetHandle },
    SubsceneEnter { subscene_id: String },
    SubsceneExit { subscene_id: String },
    PresentSubscene { subscene_id: String, handle: AssetHandle },

    // ── 对话 ──
    DialogueStart { dialogue_id: String },
    DialogueLine(DialogueLineView),
    DialogueChoices {
        dialogue_id: String,
        options: Vec<String>,
    },
    DialogueEnd { dialogue_id: String },
    DialogueRead { dialogue_id: String },

    // ── 剧情 ──
    ChapterStarted { chapter_id: String },
    ChapterCompleted { chapter_id: String },
    StoryNodeStarted { node_id: String },
    CutsceneStart { video: String },
    CutsceneEnd { video: String },

    // ── 物品 ──
    InventoryUpdate,
    ItemAdded { item_id: String },
    ItemRemoved { item_id: String },
    ItemUsed { item_id: String },
    ItemSelected { item_id: String },
    ItemDeselected,
    ItemUsedOn {
        item_id: String,
        interactable_id: String,
    },

    // ── 状态 ──
    FlagChanged { key: String, value: FlagValue },
    InteractableStateChanged { interactable_id: String },

    // ── 交互 ──
    InteractableClicked { interactable_id: String },
    InteractableVisibility {
        interactable_id: String,
        handle: ViewHandle,
        visible: bool,
    },
    PlayAnimation { animation: String },
    CustomEvent {
        name: String,
        data: serde_json::Value,
    },

    // ── 资源 ──
    BackgroundReady { path: String, handle: AssetHandle },
    LoadFailed { asset: AssetKey, cause: String },

    // ── 存档 ──
    SaveComplete { slot: SlotId },
    LoadComplete { slot: SlotId },
    SaveDeleted { slot: SlotId },
}

/// 通知发件箱
///
/// 组件只负责往里放，宿主在每次输入处理完后统一取走。
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.queue.push(notification);
    }

    /// 取走全部通知
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.queue)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
