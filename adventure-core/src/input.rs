//! # Input 模块
//!
//! 定义宿主向核心传递的输入意图。
//!
//! ## 设计说明
//!
//! - `GameInput` 是宿主采集用户操作（或表现层回调）后传给 `GameCore` 的语义化输入
//! - 核心不处理鼠标 / 键盘事件，也不做命中测试，只接收"点击了交互物 X"这类意图
//! - 转场、过场视频、资源拉取的完成也以输入的形式回到核心

use serde::{Deserialize, Serialize};

use crate::resources::{AssetHandle, AssetKey};
use crate::save::SlotId;
use crate::state::FlagValue;

/// 宿主向核心传递的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameInput {
    // ── 玩家意图 ──
    /// 点击了交互物
    InteractableClicked { interactable_id: String },

    /// 推进对话
    AdvanceDialogue,

    /// 选择对话分支
    SelectChoice { index: usize },

    /// 选中物品；None 取消选中
    SelectItem { item_id: Option<String> },

    /// 对交互物使用当前选中的物品
    UseSelectedItem { interactable_id: String },

    Pause,
    Resume,
    QuitToMenu,
    NewGame,
    LoadGame { slot: SlotId },
    SaveGame { slot: SlotId },
    DeleteSave { slot: SlotId },

    /// 结束开场交互
    FinishIntro,

    // ── 宿主驱动 ──
    /// 推进剧情（等待节点的外部触发）
    AdvanceStory,

    /// 跳到当前章节的指定节点
    JumpToNode { node_id: String },

    /// 宿主写入 Flag（如谜题解开）
    SetFlag { key: String, value: FlagValue },

    /// 打开宿主自己的嵌套界面（密码锁等），期间不接受游戏输入
    OpenOverlay,

    /// 关闭嵌套界面
    CloseOverlay,

    // ── 表现层回调 ──
    /// 转出动画完成
    TransitionOutDone,

    /// 转入动画完成
    TransitionInDone,

    /// 过场视频播放完毕（或被跳过）
    CutsceneFinished,

    /// 资源拉取完成
    AssetFetched {
        asset: AssetKey,
        result: Result<AssetHandle, String>,
    },
}

impl GameInput {
    /// 创建点击输入
    pub fn click(interactable_id: impl Into<String>) -> Self {
        Self::InteractableClicked {
            interactable_id: interactable_id.into(),
        }
    }

    /// 创建选择输入
    pub fn choice(index: usize) -> Self {
        Self::SelectChoice { index }
    }

    /// 拉取成功
    pub fn fetched(asset: AssetKey, handle: AssetHandle) -> Self {
        Self::AssetFetched {
            asset,
            result: Ok(handle),
        }
    }

    /// 拉取失败
    pub fn fetch_failed(asset: AssetKey, cause: impl Into<String>) -> Self {
        Self::AssetFetched {
            asset,
            result: Err(cause.into()),
        }
    }

    /// 是否来自玩家（而不是表现层回调）
    pub fn is_player_intent(&self) -> bool {
        matches!(
            self,
            Self::InteractableClicked { .. }
                | Self::AdvanceDialogue
                | Self::SelectChoice { .. }
                | Self::SelectItem { .. }
                | Self::UseSelectedItem { .. }
                | Self::Pause
                | Self::Resume
                | Self::QuitToMenu
                | Self::NewGame
                | Self::LoadGame { .. }
                | Self::SaveGame { .. }
                | Self::DeleteSave { .. }
                | Self::FinishIntro
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_creation() {
        assert_eq!(
            GameInput::click("desk"),
            GameInput::InteractableClicked {
                interactable_id: "desk".to_string()
            }
        );
        assert_eq!(GameInput::choice(2), GameInput::SelectChoice { index: 2 });
        assert_eq!(
            GameInput::fetch_failed(AssetKey::video("intro"), "404"),
            GameInput::AssetFetched {
                asset: AssetKey::video("intro"),
                result: Err("404".to_string()),
            }
        );
    }

    #[test]
    fn test_player_intent() {
        assert!(GameInput::AdvanceDialogue.is_player_intent());
        assert!(!GameInput::TransitionOutDone.is_player_intent());
        assert!(!GameInput::fetched(AssetKey::scene("hall"), AssetHandle(1)).is_player_intent());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&GameInput::LoadGame {
            slot: SlotId::Numbered(1),
        })
        .unwrap();
        let back: GameInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GameInput::LoadGame { slot: SlotId::Numbered(1) });
    }
}
