//! # 游戏模式状态机
//!
//! 全局唯一的"当前允许做什么"的判定来源。
//! 其他组件可以读取和切换模式，但不能绕过 [`ModeMachine::set_mode`]。

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::notification::{Notification, Outbox, ViewRequest};

/// 游戏模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// 初始化（加载配置）
    Init,
    /// 主菜单
    Menu,
    /// 开场交互（可点击，但不显示完整 HUD 流程）
    IntroInteract,
    /// 过场动画中（不可操作）
    Cutscene,
    /// 正常解谜
    Gameplay,
    /// 暂停
    Paused,
    /// 对话中（点击仅用于推进文字）
    Dialogue,
    /// 宿主驱动的嵌套界面（不接受游戏输入）
    Subscene,
    /// 结局
    GameOver,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::Init
    }
}

impl GameMode {
    /// 该模式下是否接受游戏输入
    pub fn allows_input(&self) -> bool {
        matches!(
            self,
            GameMode::Gameplay | GameMode::Dialogue | GameMode::IntroInteract
        )
    }

    /// 是否可以从该模式进入暂停
    pub fn can_pause(&self) -> bool {
        matches!(
            self,
            GameMode::Gameplay
                | GameMode::Dialogue
                | GameMode::IntroInteract
                | GameMode::Cutscene
                | GameMode::Subscene
        )
    }

    /// 是否处于一局游戏中
    pub fn is_in_game(&self) -> bool {
        !matches!(self, GameMode::Init | GameMode::Menu)
    }
}

/// 进入某模式时的界面请求
fn enter_hook(mode: GameMode) -> Option<ViewRequest> {
    match mode {
        GameMode::Menu => Some(ViewRequest::ShowMainMenu),
        GameMode::Gameplay | GameMode::IntroInteract => Some(ViewRequest::ShowGameUi),
        GameMode::Cutscene => Some(ViewRequest::HideGameUi),
        GameMode::Paused => Some(ViewRequest::ShowPauseMenu),
        GameMode::GameOver => Some(ViewRequest::ShowGameOver),
        GameMode::Init | GameMode::Dialogue | GameMode::Subscene => None,
    }
}

/// 离开某模式时的界面请求
fn exit_hook(mode: GameMode) -> Option<ViewRequest> {
    match mode {
        GameMode::Menu => Some(ViewRequest::HideMainMenu),
        GameMode::Paused => Some(ViewRequest::HidePauseMenu),
        GameMode::GameOver => Some(ViewRequest::HideGameOver),
        _ => None,
    }
}

/// 模式状态机
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    current: GameMode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前模式
    pub fn current(&self) -> GameMode {
        self.current
    }

    /// 切换模式的唯一入口
    ///
    /// 目标与当前相同时不做任何事；否则依次：退出钩子、更新、
    /// `GAME_STATE_CHANGED`、进入钩子。返回是否发生了切换。
    pub fn set_mode(&mut self, new: GameMode, outbox: &mut Outbox) -> bool {
        if self.current == new {
            return false;
        }

        let old = self.current;
        if let Some(request) = exit_hook(old) {
            outbox.push(Notification::ViewRequest { request });
        }

        self.current = new;
        info!(from = ?old, to = ?new, "模式切换");
        outbox.push(Notification::GameStateChanged { new, old });

        if let Some(request) = enter_hook(new) {
            outbox.push(Notification::ViewRequest { request });
        }
        true
    }

    /// 当前是否接受游戏输入
    pub fn is_input_allowed(&self) -> bool {
        self.current.allows_input()
    }
}
