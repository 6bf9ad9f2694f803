//! # Dialogue 模块
//!
//! 对话解释器：逐行播放一段对话，可选地以分支选项收尾。
//!
//! ## 状态
//!
//! ```text
//! Idle ──show_dialogue──▶ Active ──最后一行之后 / 选择选项──▶ Idle
//! ```
//!
//! 进入对话时记住被打断的模式，结束时恢复。

use tracing::{debug, info, warn};

use crate::catalog::DialogueAction;
use crate::error::ContentError;
use crate::mode::GameMode;
use crate::notification::{DialogueLineView, Notification};
use crate::services::Services;

/// 正在进行的对话
#[derive(Debug, Clone)]
struct ActiveDialogue {
    dialogue_id: String,
    /// 行游标
    cursor: usize,
    /// 结束后恢复的模式
    resume_mode: GameMode,
    /// 台词已播完，等待选择
    awaiting_choice: bool,
}

/// 对话结束的结果
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueFinished {
    pub dialogue_id: String,
    /// 结束动作写入的 Flag
    pub flags_written: Vec<String>,
}

enum Step {
    Line(DialogueLineView),
    Choices(Vec<String>),
    Finish,
}

/// 对话解释器
#[derive(Debug, Default)]
pub struct DialogueRunner {
    active: Option<ActiveDialogue>,
}

impl DialogueRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_dialogue(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.dialogue_id.as_str())
    }

    /// 当前行号
    pub fn cursor(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.cursor)
    }

    pub fn is_awaiting_choice(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.awaiting_choice)
    }

    /// 开始对话
    ///
    /// 对话不存在时告警并返回错误，不改变任何状态；否则切换到 `Dialogue` 模式并播放第一行。
    /// 没有任何台词的对话会直接进入选项或结束，此时返回 `Some(finished)`。
    /// 已有对话进行中时忽略请求，当前对话不受影响。
    pub fn show_dialogue(
        &mut self,
        dialogue_id: &str,
        sv: &mut Services,
    ) -> Result<Option<DialogueFinished>, ContentError> {
        if let Err(e) = sv.catalog.require_dialogue(dialogue_id) {
            warn!(dialogue_id, "对话不存在");
            return Err(e);
        }

        if let Some(current) = &self.active {
            debug!(current = %current.dialogue_id, ignored = dialogue_id, "对话进行中，忽略");
            return Ok(None);
        }
        let resume_mode = match sv.mode() {
            GameMode::Dialogue => GameMode::Gameplay,
            other => other,
        };

        self.active = Some(ActiveDialogue {
            dialogue_id: dialogue_id.to_string(),
            cursor: 0,
            resume_mode,
            awaiting_choice: false,
        });
        sv.set_mode(GameMode::Dialogue);
        info!(dialogue_id, "对话开始");
        sv.emit(Notification::DialogueStart {
            dialogue_id: dialogue_id.to_string(),
        });
        Ok(self.present(sv))
    }

    /// 推进到下一行
    ///
    /// 空闲、等待选择、或当前模式不接受输入时什么都不做。
    pub fn next_line(&mut self, sv: &mut Services) -> Option<DialogueFinished> {
        if !sv.is_input_allowed() {
            return None;
        }
        let active = self.active.as_mut()?;
        if active.awaiting_choice {
            return None;
        }
        active.cursor += 1;
        self.present(sv)
    }

    /// 选择分支选项；越界的下标被忽略
    pub fn select_choice(&mut self, index: usize, sv: &mut Services) -> Option<DialogueFinished> {
        if !sv.is_input_allowed() {
            return None;
        }
        let active = self.active.as_ref()?;
        if !active.awaiting_choice {
            return None;
        }
        let config = sv.catalog.dialogue(&active.dialogue_id)?;
        let Some(choice) = config.choices.get(index) else {
            debug!(index, "选项下标越界");
            return None;
        };
        let action = choice.action.clone();
        self.finish(action, sv)
    }

    /// 清空状态，不发出任何通知
    pub fn reset(&mut self) {
        self.active = None;
    }

    fn present(&mut self, sv: &mut Services) -> Option<DialogueFinished> {
        let active = self.active.as_mut()?;
        let Some(config) = sv.catalog.dialogue(&active.dialogue_id) else {
            warn!(dialogue_id = %active.dialogue_id, "对话配置丢失");
            self.active = None;
            return None;
        };

        let total = config.lines.len();
        let step = if active.cursor < total {
            Step::Line(DialogueLineView {
                text: config.lines[active.cursor].text.clone(),
                speaker: config.speaker_of(active.cursor).map(str::to_string),
                index: active.cursor,
                total,
            })
        } else if config.has_choices() {
            active.awaiting_choice = true;
            Step::Choices(config.choices.iter().map(|c| c.text.clone()).collect())
        } else {
            Step::Finish
        };

        match step {
            Step::Line(line) => {
                sv.emit(Notification::DialogueLine(line));
                None
            }
            Step::Choices(options) => {
                sv.emit(Notification::DialogueChoices {
                    dialogue_id: active.dialogue_id.clone(),
                    options,
                });
                None
            }
            Step::Finish => self.finish(None, sv),
        }
    }

    /// 结束对话：执行选项动作和结束动作，标记已读，恢复模式，最后发出 `DIALOGUE_END`
    fn finish(
        &mut self,
        choice_action: Option<DialogueAction>,
        sv: &mut Services,
    ) -> Option<DialogueFinished> {
        let active = self.active.take()?;
        let on_complete = sv
            .catalog
            .dialogue(&active.dialogue_id)
            .and_then(|c| c.on_complete.clone());

        let mut flags_written = Vec::new();
        for action in choice_action.into_iter().chain(on_complete) {
            match action {
                DialogueAction::SetFlag { flag, value } => {
                    sv.save.set_flag(&flag, value, &mut sv.outbox);
                    flags_written.push(flag);
                }
            }
        }

        sv.save.mark_dialogue_read(&active.dialogue_id, &mut sv.outbox);
        if sv.mode() == GameMode::Dialogue {
            sv.set_mode(active.resume_mode);
        }
        info!(dialogue_id = %active.dialogue_id, "对话结束");
        sv.emit(Notification::DialogueEnd {
            dialogue_id: active.dialogue_id.clone(),
        });

        Some(DialogueFinished {
            dialogue_id: active.dialogue_id,
            flags_written,
        })
    }
}
