//! # Config 模块
//!
//! 核心运行参数。所有字段都有默认值，宿主配置文件中缺省的字段保持默认。

use serde::{Deserialize, Serialize};

use crate::save::DEFAULT_SLOT_COUNT;

/// 手动存档槽位数上限（槽位名固定两位数字）
pub const MAX_SLOT_COUNT: u8 = 99;

/// 核心配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// 存储键前缀
    pub save_namespace: String,
    /// 每次修改进度后自动写入 auto 槽位
    pub auto_save: bool,
    /// 手动存档槽位数
    pub slot_count: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            save_namespace: "MyGame_Save".to_string(),
            auto_save: true,
            slot_count: DEFAULT_SLOT_COUNT,
        }
    }
}

impl CoreConfig {
    /// 槽位数限制在 `1..=MAX_SLOT_COUNT`
    pub fn effective_slot_count(&self) -> u8 {
        self.slot_count.clamp(1, MAX_SLOT_COUNT)
    }
}
