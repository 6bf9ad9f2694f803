//! # Story 模块
//!
//! 剧情解释器：按章节的节点图推进，每次恰好有一个当前节点。
//!
//! 解释器只负责"走到哪个节点"，节点动作（载入场景、播放对话、过场等）
//! 以 [`StoryStep::Execute`] 交给 `GameCore` 分发。动作完成后 `GameCore`
//! 通过 [`StoryRunner::notify`] 告知，解释器据此决定是否自动推进。
//!
//! 未知节点、结构错误的章节只记录错误并停止推进，不会 panic。

use tracing::{error, info, warn};

use crate::catalog::{ChapterConfig, NodeAction, StoryNode, Successor};
use crate::error::ContentError;
use crate::notification::Notification;
use crate::services::Services;

/// 当前节点在等待的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    /// 场景已可见
    SceneVisible(String),
    /// 对话已结束
    DialogueEnded(String),
    /// 过场已结束
    CutsceneEnded(String),
    /// Flag 发生变化（等待节点只在其变为真时继续）
    FlagChanged(String),
    /// Flag 写入节点的动作已完成
    FlagWritten(String),
}

/// 节点动作完成时对应的事件
fn awaited_event(action: &NodeAction) -> Option<StoryEvent> {
    match action {
        NodeAction::SceneLoad { scene, .. } => Some(StoryEvent::SceneVisible(scene.clone())),
        NodeAction::Cutscene { video } => Some(StoryEvent::CutsceneEnded(video.clone())),
        NodeAction::Dialogue { dialogue } => Some(StoryEvent::DialogueEnded(dialogue.clone())),
        NodeAction::FlagSet { flag, .. } => Some(StoryEvent::FlagWritten(flag.clone())),
        NodeAction::Wait { flag } => flag.clone().map(StoryEvent::FlagChanged),
    }
}

/// 推进一步的结果
#[derive(Debug, Clone, PartialEq)]
pub enum StoryStep {
    /// 进入了新节点，需要执行其动作
    Execute { node_id: String, action: NodeAction },
    /// 章节结束
    ChapterCompleted {
        chapter_id: String,
        next_chapter: Option<String>,
        ending: bool,
    },
    /// 没有可推进的内容
    Halted,
}

/// 剧情解释器
#[derive(Debug, Default)]
pub struct StoryRunner {
    chapter_id: Option<String>,
    node_id: Option<String>,
    awaiting: Option<StoryEvent>,
}

impl StoryRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_chapter(&self) -> Option<&str> {
        self.chapter_id.as_deref()
    }

    pub fn current_node(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// 当前节点在等待的事件
    pub fn awaiting(&self) -> Option<&StoryEvent> {
        self.awaiting.as_ref()
    }

    fn chapter<'c>(&self, sv: &'c Services) -> Option<&'c ChapterConfig> {
        sv.catalog.chapter(self.chapter_id.as_deref()?)
    }

    fn current<'c>(&self, sv: &'c Services) -> Option<&'c StoryNode> {
        self.chapter(sv)?.node(self.node_id.as_deref()?)
    }

    /// 开始章节：选中第一个节点（不执行），记录进度，发出 `CHAPTER_STARTED`
    ///
    /// 第一个节点描述开局状态，它等待的事件照常挂上。
    pub fn start_chapter(&mut self, chapter_id: &str, sv: &mut Services) -> Result<(), ContentError> {
        let chapter = sv.catalog.require_chapter(chapter_id).inspect_err(|e| {
            error!(error = %e, "无法开始章节");
        })?;
        let Some(first) = chapter.first_node() else {
            let e = ContentError::MalformedChapter {
                chapter_id: chapter_id.to_string(),
                message: "章节没有任何节点".to_string(),
            };
            error!(error = %e, "无法开始章节");
            return Err(e);
        };
        let first_id = first.id.clone();
        let awaiting = awaited_event(&first.action);

        self.chapter_id = Some(chapter_id.to_string());
        self.node_id = Some(first_id.clone());
        self.awaiting = awaiting;
        sv.save.set_story_position(chapter_id, &first_id);
        info!(chapter_id, first_node = %first_id, "章节开始");
        sv.emit(Notification::ChapterStarted {
            chapter_id: chapter_id.to_string(),
        });
        Ok(())
    }

    /// 读档后重新挂到存档位置，不执行任何节点
    ///
    /// 存档停在已执行的对话或过场节点上时，返回需要重新播放的动作；
    /// 章节的第一个节点从未执行过，不会返回。
    pub fn restore(
        &mut self,
        chapter_id: &str,
        node_id: &str,
        sv: &Services,
    ) -> Result<Option<NodeAction>, ContentError> {
        let chapter = sv.catalog.require_chapter(chapter_id)?;
        let Some(node) = chapter.node(node_id) else {
            return Err(ContentError::NodeMissing {
                chapter_id: chapter_id.to_string(),
                node_id: node_id.to_string(),
            });
        };
        self.chapter_id = Some(chapter_id.to_string());
        self.node_id = Some(node_id.to_string());
        // 重新挂上等待，读档后 Flag 变化仍能推进等待节点
        self.awaiting = awaited_event(&node.action);
        info!(chapter_id, node_id, "剧情位置已恢复");

        let is_first = chapter.first_node().is_some_and(|n| n.id == node_id);
        let replay = match &node.action {
            NodeAction::Dialogue { .. } | NodeAction::Cutscene { .. } if !is_first => {
                Some(node.action.clone())
            }
            _ => None,
        };
        Ok(replay)
    }

    /// 推进到当前节点的后继
    pub fn advance(&mut self, sv: &mut Services) -> StoryStep {
        let Some(node) = self.current(sv) else {
            if self.chapter_id.is_some() {
                error!(
                    chapter_id = ?self.chapter_id,
                    node_id = ?self.node_id,
                    "当前节点不存在，停止推进"
                );
            }
            return StoryStep::Halted;
        };

        match node.on_complete.clone() {
            None => {
                warn!(node_id = %node.id, "节点没有后继，停止推进");
                StoryStep::Halted
            }
            Some(Successor::ChapterComplete) => self.complete_chapter(sv),
            Some(Successor::Node(next)) => self.enter_node(&next, sv),
        }
    }

    /// 直接跳到指定节点（绕过 on_complete）
    pub fn jump_to_node(&mut self, node_id: &str, sv: &mut Services) -> StoryStep {
        if self.chapter_id.is_none() {
            warn!(node_id, "没有进行中的章节，无法跳转");
            return StoryStep::Halted;
        }
        self.enter_node(node_id, sv)
    }

    fn enter_node(&mut self, node_id: &str, sv: &mut Services) -> StoryStep {
        let Some(chapter_id) = self.chapter_id.clone() else {
            return StoryStep::Halted;
        };
        let Some(node) = self.chapter(sv).and_then(|c| c.node(node_id)) else {
            let e = ContentError::NodeMissing {
                chapter_id,
                node_id: node_id.to_string(),
            };
            error!(error = %e, "停止推进");
            return StoryStep::Halted;
        };
        let action = node.action.clone();

        self.node_id = Some(node_id.to_string());
        self.awaiting = awaited_event(&action);
        sv.save.set_story_position(&chapter_id, node_id);
        info!(node_id, "剧情节点开始");
        sv.emit(Notification::StoryNodeStarted {
            node_id: node_id.to_string(),
        });

        StoryStep::Execute {
            node_id: node_id.to_string(),
            action,
        }
    }

    fn complete_chapter(&mut self, sv: &mut Services) -> StoryStep {
        let Some(chapter_id) = self.chapter_id.take() else {
            return StoryStep::Halted;
        };
        let (next_chapter, ending) = sv
            .catalog
            .chapter(&chapter_id)
            .map(|c| (c.next_chapter.clone(), c.ending))
            .unwrap_or_default();

        self.node_id = None;
        self.awaiting = None;
        sv.save.set_story_position("", "");
        info!(chapter_id = %chapter_id, "章节完成");
        sv.emit(Notification::ChapterCompleted {
            chapter_id: chapter_id.clone(),
        });

        StoryStep::ChapterCompleted {
            chapter_id,
            next_chapter,
            ending,
        }
    }

    /// 告知一个事件；返回是否应当推进
    ///
    /// 只有与当前等待匹配的事件才有效。等待节点在 Flag 为真时总是推进，
    /// 其他节点在动作完成后按 `auto_advance` 决定。
    pub fn notify(&mut self, event: &StoryEvent, sv: &Services) -> bool {
        if self.awaiting.as_ref() != Some(event) {
            return false;
        }
        if let StoryEvent::FlagChanged(flag) = event {
            if !sv.save.get_bool(flag) {
                return false;
            }
            self.awaiting = None;
            return true;
        }

        self.awaiting = None;
        self.current(sv).is_some_and(|n| n.auto_advance)
    }

    /// 清空状态（回到主菜单时调用）
    pub fn reset(&mut self) {
        self.chapter_id = None;
        self.node_id = None;
        self.awaiting = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FlagValue;
    use crate::test_support::services_with;

    const CATALOG: &str = r#"{
        "new_game": { "start_scene": "bedroom" },
        "scenes": [ { "id": "bedroom" } ],
        "chapters": [
            { "id": "ch1", "next_chapter": "ch2", "nodes": [
                { "id": "A", "type": "wait", "on_complete": "B" },
                { "id": "B", "type": "flag_set", "flag": "lit", "on_complete": "chapter_complete" }
            ] },
            { "id": "ch2", "ending": true, "nodes": [
                { "id": "start", "type": "wait", "on_complete": "gate" },
                { "id": "gate", "type": "wait", "flag": "door_open", "on_complete": "talk" },
                { "id": "talk", "type": "dialogue", "dialogue": "bye", "auto_advance": true, "on_complete": "chapter_complete" },
                { "id": "broken", "type": "wait", "on_complete": "nowhere" }
            ] },
            { "id": "empty", "nodes": [] }
        ]
    }"#;

    fn setup() -> (Services, StoryRunner) {
        let mut sv = services_with(CATALOG);
        sv.save.start_new_game("bedroom");
        (sv, StoryRunner::new())
    }

    #[test]
    fn test_two_node_traversal() {
        let (mut sv, mut story) = setup();
        story.start_chapter("ch1", &mut sv).unwrap();
        assert_eq!(story.current_node(), Some("A"));
        assert_eq!(sv.save.current_chapter_id(), Some("ch1"));

        let step = story.advance(&mut sv);
        assert!(matches!(step, StoryStep::Execute { ref node_id, .. } if node_id == "B"));
        let step = story.advance(&mut sv);
        assert_eq!(
            step,
            StoryStep::ChapterCompleted {
                chapter_id: "ch1".to_string(),
                next_chapter: Some("ch2".to_string()),
                ending: false,
            }
        );

        let events: Vec<&Notification> = sv
            .outbox
            .iter()
            .filter(|n| {
                matches!(
                    n,
                    Notification::StoryNodeStarted { .. } | Notification::ChapterCompleted { .. }
                )
            })
            .collect();
        assert_eq!(
            events,
            vec![
                &Notification::StoryNodeStarted {
                    node_id: "B".to_string()
                },
                &Notification::ChapterCompleted {
                    chapter_id: "ch1".to_string()
                },
            ]
        );
        assert_eq!(story.current_chapter(), None);
        assert_eq!(sv.save.current_chapter_id(), None);
    }

    #[test]
    fn test_missing_and_malformed_chapters() {
        let (mut sv, mut story) = setup();
        assert!(matches!(
            story.start_chapter("nope", &mut sv),
            Err(ContentError::ChapterMissing { .. })
        ));
        assert!(matches!(
            story.start_chapter("empty", &mut sv),
            Err(ContentError::MalformedChapter { .. })
        ));
        assert_eq!(story.current_chapter(), None);
        assert_eq!(story.advance(&mut sv), StoryStep::Halted);
    }

    #[test]
    fn test_dangling_successor_halts() {
        let (mut sv, mut story) = setup();
        story.start_chapter("ch2", &mut sv).unwrap();
        assert!(matches!(story.jump_to_node("broken", &mut sv), StoryStep::Execute { .. }));
        assert_eq!(story.advance(&mut sv), StoryStep::Halted);
        // 停在原节点
        assert_eq!(story.current_node(), Some("broken"));
    }

    #[test]
    fn test_wait_on_flag() {
        let (mut sv, mut story) = setup();
        story.start_chapter("ch2", &mut sv).unwrap();
        story.advance(&mut sv);
        assert_eq!(
            story.awaiting(),
            Some(&StoryEvent::FlagChanged("door_open".to_string()))
        );

        // 无关的 Flag、以及仍为假的 Flag 都不推进
        assert!(!story.notify(&StoryEvent::FlagChanged("other".to_string()), &sv));
        sv.save.set_flag("door_open", FlagValue::Bool(false), &mut sv.outbox);
        assert!(!story.notify(&StoryEvent::FlagChanged("door_open".to_string()), &sv));

        sv.save.set_flag("door_open", FlagValue::Bool(true), &mut sv.outbox);
        assert!(story.notify(&StoryEvent::FlagChanged("door_open".to_string()), &sv));
        assert_eq!(story.awaiting(), None);
    }

    #[test]
    fn test_auto_advance_only_when_declared() {
        let (mut sv, mut story) = setup();
        story.start_chapter("ch2", &mut sv).unwrap();
        story.jump_to_node("talk", &mut sv);
        assert!(!story.notify(&StoryEvent::DialogueEnded("other".to_string()), &sv));
        assert!(story.notify(&StoryEvent::DialogueEnded("bye".to_string()), &sv));

        story.start_chapter("ch1", &mut sv).unwrap();
        story.advance(&mut sv);
        // B 没有声明 auto_advance
        assert!(!story.notify(&StoryEvent::FlagWritten("lit".to_string()), &sv));
    }

    #[test]
    fn test_restore_does_not_execute() {
        let (mut sv, mut story) = setup();
        sv.outbox.drain();
        let replay = story.restore("ch2", "talk", &sv).unwrap();
        assert_eq!(story.current_node(), Some("talk"));
        assert!(sv.outbox.is_empty());
        assert_eq!(
            replay,
            Some(NodeAction::Dialogue {
                dialogue: "bye".to_string()
            })
        );
        assert_eq!(
            story.awaiting(),
            Some(&StoryEvent::DialogueEnded("bye".to_string()))
        );
        assert!(story.restore("ch2", "ghost", &sv).is_err());
    }

    #[test]
    fn test_restore_wait_node_has_nothing_to_replay() {
        let (mut sv, mut story) = setup();
        sv.outbox.drain();
        assert_eq!(story.restore("ch2", "gate", &sv).unwrap(), None);
        assert_eq!(story.restore("ch1", "A", &sv).unwrap(), None);
    }
}
