//! # Save 模块
//!
//! 存档槽位与存档记录的序列化格式。
//!
//! ## 存储键
//!
//! ```text
//! <namespace>_auto
//! <namespace>_slot_01
//! ...
//! <namespace>_slot_06
//! ```
//!
//! 存档内容是 [`PlayState`] 的 JSON 序列化结果，字段与 `PlayState` 一一对应。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SaveError;
use crate::state::{PlayState, SCHEMA_VERSION};

/// 自动存档槽位名
pub const AUTO_SLOT_NAME: &str = "auto";

/// 默认的手动存档槽位数
pub const DEFAULT_SLOT_COUNT: u8 = 6;

/// 存档槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotId {
    /// 自动存档
    Auto,
    /// 手动存档（从 1 开始）
    Numbered(u8),
}

impl SlotId {
    /// 创建手动槽位
    pub fn numbered(n: u8) -> Self {
        Self::Numbered(n)
    }

    /// 槽位号是否在 `1..=slot_count` 范围内
    pub fn is_valid(&self, slot_count: u8) -> bool {
        match self {
            Self::Auto => true,
            Self::Numbered(n) => (1..=slot_count).contains(n),
        }
    }

    /// 在指定命名空间下的存储键
    pub fn storage_key(&self, namespace: &str) -> String {
        format!("{}_{}", namespace, self)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "{}", AUTO_SLOT_NAME),
            Self::Numbered(n) => write!(f, "slot_{:02}", n),
        }
    }
}

impl FromStr for SlotId {
    type Err = SaveError;

    /// 接受 `auto`、`slot_03` 以及裸数字 `3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == AUTO_SLOT_NAME {
            return Ok(Self::Auto);
        }
        let digits = s.strip_prefix("slot_").unwrap_or(s);
        digits
            .parse::<u8>()
            .ok()
            .filter(|n| *n > 0)
            .map(Self::Numbered)
            .ok_or_else(|| SaveError::InvalidSlot(s.to_string()))
    }
}

impl Serialize for SlotId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 存档槽位信息（用于 UI 显示）
///
/// 每次都从存储中现算，不做缓存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlotInfo {
    pub slot_id: SlotId,
    /// 存档时间（Unix 毫秒）
    pub save_time: Option<i64>,
    pub chapter_id: Option<String>,
    pub scene_id: Option<String>,
    /// 存储中是否有该槽位
    pub present: bool,
}

impl SaveSlotInfo {
    /// 空槽位
    pub fn empty(slot_id: SlotId) -> Self {
        Self {
            slot_id,
            save_time: None,
            chapter_id: None,
            scene_id: None,
            present: false,
        }
    }

    /// 从已解析的存档生成
    pub fn from_state(slot_id: SlotId, state: &PlayState) -> Self {
        Self {
            slot_id,
            save_time: Some(state.save_time),
            chapter_id: Some(state.current_chapter_id.clone()).filter(|c| !c.is_empty()),
            scene_id: Some(state.current_scene_id.clone()),
            present: true,
        }
    }
}

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSave {
    pub state: PlayState,
    /// 存档版本与当前版本不一致
    pub version_skew: bool,
}

/// 序列化存档记录
pub fn encode_record(state: &PlayState) -> Result<String, SaveError> {
    serde_json::to_string(state).map_err(|e| SaveError::Serialization(e.to_string()))
}

/// 反序列化存档记录
///
/// 版本不一致不算失败，只在结果中标记，由调用方告警。
pub fn decode_record(key: &str, json: &str) -> Result<DecodedSave, SaveError> {
    let state: PlayState = serde_json::from_str(json).map_err(|e| SaveError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    let version_skew = state.schema_version != SCHEMA_VERSION;
    Ok(DecodedSave {
        state,
        version_skew,
    })
}
