//! # State 模块
//!
//! 定义可存档的游戏进度记录 [`PlayState`]。
//!
//! ## 设计原则
//!
//! - 所有字段都可序列化，JSON 字段名与存档格式一一对应（camelCase）
//! - 只由 `SaveManager` 持有和修改，其他组件只读
//! - 集合类字段使用有序容器，保证存档输出稳定

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 存档格式版本
///
/// 与存档中的 `schemaVersion` 不一致时只告警，不拒绝读档。
pub const SCHEMA_VERSION: u32 = 1;

/// 剧情 Flag 的值
///
/// 只允许布尔值或小整数（如任务阶段 1、2、3）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
}

impl FlagValue {
    /// 真值判断：`true` 或非零整数
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
        }
    }
}

impl Default for FlagValue {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

/// 游戏进度记录
///
/// 这是核心中**唯一可存档的可变状态**。
/// 同一时刻最多存在一个激活实例，由 `SaveManager` 持有。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayState {
    /// 存档标识（新游戏时生成）
    pub save_id: String,
    /// 最近一次写入时间（Unix 毫秒）
    pub save_time: i64,
    /// 写入时的存档格式版本
    pub schema_version: u32,

    /// 当前场景
    pub current_scene_id: String,
    /// 是否位于子场景中
    pub is_in_subscene: bool,
    /// 当前子场景（仅 `is_in_subscene` 为真时有值）
    #[serde(default)]
    pub current_subscene_id: Option<String>,

    /// 当前章节（空串表示没有进行中的章节）
    #[serde(default)]
    pub current_chapter_id: String,
    /// 当前剧情节点
    #[serde(default)]
    pub current_story_node_id: String,

    /// 剧情 Flag
    #[serde(default)]
    pub story_flags: BTreeMap<String, FlagValue>,
    /// 物品栏（按获得顺序，无重复）
    #[serde(default)]
    pub inventory: Vec<String>,
    /// 已使用过的物品
    #[serde(default)]
    pub used_items: BTreeSet<String>,
    /// 交互物状态（内容对核心不透明）
    #[serde(default)]
    pub interactable_states: BTreeMap<String, serde_json::Value>,
    /// 已读对话
    #[serde(default)]
    pub read_dialogues: BTreeSet<String>,
}

impl PlayState {
    /// 以给定的起始场景创建新进度
    pub fn new(save_id: impl Into<String>, start_scene: impl Into<String>) -> Self {
        Self {
            save_id: save_id.into(),
            save_time: 0,
            schema_version: SCHEMA_VERSION,
            current_scene_id: start_scene.into(),
            is_in_subscene: false,
            current_subscene_id: None,
            current_chapter_id: String::new(),
            current_story_node_id: String::new(),
            story_flags: BTreeMap::new(),
            inventory: Vec::new(),
            used_items: BTreeSet::new(),
            interactable_states: BTreeMap::new(),
            read_dialogues: BTreeSet::new(),
        }
    }

    /// 物品栏中是否有该物品
    pub fn has_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|i| i == item_id)
    }

    /// 进入子场景（不改变当前场景）
    pub fn enter_subscene(&mut self, subscene_id: impl Into<String>) {
        self.is_in_subscene = true;
        self.current_subscene_id = Some(subscene_id.into());
    }

    /// 退出子场景
    pub fn exit_subscene(&mut self) {
        self.is_in_subscene = false;
        self.current_subscene_id = None;
    }
}
