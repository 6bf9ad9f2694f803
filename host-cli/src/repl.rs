//! # Repl 模块
//!
//! 文本命令解析与驱动循环。
//!
//! 每行一条命令，`#` 开头的行是注释。核心发出的通知以 JSON 行输出，
//! 便于脚本回放后用 diff 对比。
//!
//! ## 命令
//!
//! ```text
//! new | load <slot> | save <slot> | delete <slot> | menu
//! click <id> | next | choose <n> | select <item>|- | use <id>
//! pause | resume | intro-done | overlay open|close
//! advance | jump <node> | flag <key> <true|false|int>
//! out-done | in-done | cutscene-done
//! bg <path> | bg-release <path>
//! register <id> <kind> <handle> | unregister <id> | show <id> | hide <id>
//! state | slots | stats | help | quit
//! ```

use std::io::Write;

use adventure_core::interaction::ViewHandle;
use adventure_core::{FlagValue, GameCore, GameInput, Notification, SlotId};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fetcher::{self, Completions};

/// 单行命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 直接交给核心的输入
    Input(GameInput),
    Background(String),
    ReleaseBackground(String),
    Register {
        interactable_id: String,
        kind: String,
        handle: ViewHandle,
    },
    Unregister(String),
    Show(String),
    Hide(String),
    State,
    Slots,
    Stats,
    Help,
    Quit,
}

/// 命令解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("未知命令: {0}")]
    Unknown(String),

    #[error("{command} 缺少参数 <{arg}>")]
    MissingArg {
        command: &'static str,
        arg: &'static str,
    },

    #[error("无效的 {arg}: {value}")]
    Invalid { arg: &'static str, value: String },
}

/// 解析一行；空行和注释返回 `Ok(None)`
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let arg = |index: usize, command: &'static str, name: &'static str| {
        args.get(index)
            .copied()
            .ok_or(ParseError::MissingArg { command, arg: name })
    };

    let command = match head {
        "new" => Command::Input(GameInput::NewGame),
        "load" => Command::Input(GameInput::LoadGame {
            slot: parse_slot(arg(0, "load", "slot")?)?,
        }),
        "save" => Command::Input(GameInput::SaveGame {
            slot: parse_slot(arg(0, "save", "slot")?)?,
        }),
        "delete" => Command::Input(GameInput::DeleteSave {
            slot: parse_slot(arg(0, "delete", "slot")?)?,
        }),
        "menu" => Command::Input(GameInput::QuitToMenu),
        "click" => Command::Input(GameInput::click(arg(0, "click", "id")?)),
        "next" => Command::Input(GameInput::AdvanceDialogue),
        "choose" => {
            let raw = arg(0, "choose", "n")?;
            let index = raw.parse::<usize>().map_err(|_| ParseError::Invalid {
                arg: "n",
                value: raw.to_string(),
            })?;
            Command::Input(GameInput::choice(index))
        }
        "select" => {
            let item = arg(0, "select", "item")?;
            Command::Input(GameInput::SelectItem {
                item_id: (item != "-").then(|| item.to_string()),
            })
        }
        "use" => Command::Input(GameInput::UseSelectedItem {
            interactable_id: arg(0, "use", "id")?.to_string(),
        }),
        "pause" => Command::Input(GameInput::Pause),
        "resume" => Command::Input(GameInput::Resume),
        "intro-done" => Command::Input(GameInput::FinishIntro),
        "overlay" => match arg(0, "overlay", "open|close")? {
            "open" => Command::Input(GameInput::OpenOverlay),
            "close" => Command::Input(GameInput::CloseOverlay),
            other => {
                return Err(ParseError::Invalid {
                    arg: "open|close",
                    value: other.to_string(),
                });
            }
        },
        "advance" => Command::Input(GameInput::AdvanceStory),
        "jump" => Command::Input(GameInput::JumpToNode {
            node_id: arg(0, "jump", "node")?.to_string(),
        }),
        "flag" => Command::Input(GameInput::SetFlag {
            key: arg(0, "flag", "key")?.to_string(),
            value: parse_flag(arg(1, "flag", "value")?)?,
        }),
        "out-done" => Command::Input(GameInput::TransitionOutDone),
        "in-done" => Command::Input(GameInput::TransitionInDone),
        "cutscene-done" => Command::Input(GameInput::CutsceneFinished),
        "bg" => Command::Background(arg(0, "bg", "path")?.to_string()),
        "bg-release" => Command::ReleaseBackground(arg(0, "bg-release", "path")?.to_string()),
        "register" => {
            let raw = arg(2, "register", "handle")?;
            let handle = raw.parse::<u64>().map_err(|_| ParseError::Invalid {
                arg: "handle",
                value: raw.to_string(),
            })?;
            Command::Register {
                interactable_id: arg(0, "register", "id")?.to_string(),
                kind: arg(1, "register", "kind")?.to_string(),
                handle: ViewHandle(handle),
            }
        }
        "unregister" => Command::Unregister(arg(0, "unregister", "id")?.to_string()),
        "show" => Command::Show(arg(0, "show", "id")?.to_string()),
        "hide" => Command::Hide(arg(0, "hide", "id")?.to_string()),
        "state" => Command::State,
        "slots" => Command::Slots,
        "stats" => Command::Stats,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_slot(raw: &str) -> Result<SlotId, ParseError> {
    raw.parse().map_err(|_| ParseError::Invalid {
        arg: "slot",
        value: raw.to_string(),
    })
}

/// `true` / `false` / 整数
fn parse_flag(raw: &str) -> Result<FlagValue, ParseError> {
    match raw {
        "true" => Ok(FlagValue::Bool(true)),
        "false" => Ok(FlagValue::Bool(false)),
        _ => raw.parse::<i64>().map(FlagValue::Int).map_err(|_| ParseError::Invalid {
            arg: "value",
            value: raw.to_string(),
        }),
    }
}

/// 执行命令后是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 驱动循环：执行命令，输出通知，回传拉取结果和转场完成
pub struct Driver<W: Write> {
    core: GameCore,
    completions: Completions,
    auto_transitions: bool,
    out: W,
}

impl<W: Write> Driver<W> {
    pub fn new(core: GameCore, completions: Completions, auto_transitions: bool, out: W) -> Self {
        Self {
            core,
            completions,
            auto_transitions,
            out,
        }
    }

    pub fn core(&self) -> &GameCore {
        &self.core
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// 启动核心并输出启动期间的通知
    pub fn boot(&mut self) -> std::io::Result<()> {
        self.core.boot();
        self.pump()
    }

    /// 解析并执行一行
    pub fn run_line(&mut self, line: &str) -> std::io::Result<Flow> {
        match parse_line(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                warn!(line, error = %e, "无法解析命令");
                writeln!(self.out, "{}", json!({ "error": e.to_string() }))?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> std::io::Result<Flow> {
        match command {
            Command::Input(input) => self.core.handle_input(input),
            Command::Background(path) => self.core.request_background(&path),
            Command::ReleaseBackground(path) => self.core.release_background(&path),
            Command::Register {
                interactable_id,
                kind,
                handle,
            } => self.core.register_interactable(interactable_id, kind, handle),
            Command::Unregister(id) => self.core.unregister_interactable(&id),
            Command::Show(id) => self.core.show_interactable(&id),
            Command::Hide(id) => self.core.hide_interactable(&id),
            Command::State => self.print_state()?,
            Command::Slots => {
                let slots = self.core.save().list_slots();
                writeln!(self.out, "{}", json!({ "slots": slots }))?;
            }
            Command::Stats => {
                writeln!(self.out, "{}", json!({ "stats": self.core.cache_stats().format() }))?;
            }
            Command::Help => writeln!(self.out, "{}", json!({ "help": HELP }))?,
            Command::Quit => return Ok(Flow::Quit),
        }
        self.pump()?;
        Ok(Flow::Continue)
    }

    /// 输出通知，直到核心不再产生新的回传
    fn pump(&mut self) -> std::io::Result<()> {
        loop {
            let notifications = self.core.drain_notifications();
            let mut replies = Vec::new();
            for notification in &notifications {
                writeln!(self.out, "{}", serde_json::to_string(notification)?)?;
                if self.auto_transitions {
                    match notification {
                        Notification::TransitionOut { .. } => {
                            replies.push(GameInput::TransitionOutDone)
                        }
                        Notification::TransitionIn { .. } => {
                            replies.push(GameInput::TransitionInDone)
                        }
                        _ => {}
                    }
                }
            }
            replies.extend(fetcher::drain_inputs(&self.completions));

            if replies.is_empty() {
                return Ok(());
            }
            for input in replies {
                debug!(input = ?input, "回传");
                self.core.handle_input(input);
            }
        }
    }

    fn print_state(&mut self) -> std::io::Result<()> {
        let scene = self.core.scene_view();
        let summary = json!({
            "mode": self.core.mode(),
            "scene": scene.current_scene(),
            "subscene": scene.current_subscene(),
            "chapter": self.core.story().current_chapter(),
            "node": self.core.story().current_node(),
            "selected_item": self.core.selected_item(),
            "cutscene": self.core.cutscene_video(),
            "progress": self.core.save().state(),
        });
        writeln!(self.out, "{}", json!({ "state": summary }))
    }
}

const HELP: &str = "new | load <slot> | save <slot> | delete <slot> | menu | click <id> | next | \
choose <n> | select <item>|- | use <id> | pause | resume | intro-done | overlay open|close | \
advance | jump <node> | flag <key> <value> | out-done | in-done | cutscene-done | bg <path> | \
bg-release <path> | register <id> <kind> <handle> | unregister <id> | show <id> | hide <id> | \
state | slots | stats | help | quit";
