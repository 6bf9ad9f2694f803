//! 内容定义：物品、场景、对话、章节。
//!
//! 这些结构一次性从 JSON 加载进 [`Catalog`](super::Catalog)，之后只读。
//! 动作类字段都是按 `type` 打标签的封闭枚举，未知类型在解析阶段就会报错。

use serde::{Deserialize, Serialize};

use crate::state::FlagValue;

/// 章节结束的保留后继名
pub const CHAPTER_COMPLETE: &str = "chapter_complete";

/// 新游戏的起始设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGameConfig {
    /// 起始场景
    pub start_scene: String,
    /// 起始章节
    #[serde(default)]
    pub start_chapter: Option<String>,
    /// 是否以开场交互模式开始
    #[serde(default)]
    pub intro: bool,
}

/// 物品定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    pub id: String,
    /// 显示名
    #[serde(default)]
    pub name: String,
    /// 对交互物使用后是否从选中状态移除
    #[serde(default)]
    pub consumable: bool,
}

/// 交互物动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionAction {
    /// 开始对话
    Dialogue { dialogue: String },
    /// 拾取物品
    PickItem { item: String },
    /// 带转场切换场景
    SceneSwitch { scene: String },
    /// 进入子场景
    Subscene { subscene: String },
    /// 退出当前子场景
    ExitSubscene,
    /// 请求表现层播放动画
    Animation { animation: String },
    /// 自定义事件（原样转发给表现层）
    Custom {
        name: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// 交互物定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractableConfig {
    pub id: String,
    #[serde(flatten)]
    pub action: InteractionAction,
    /// 可以对它使用的物品（空表示任何物品）
    #[serde(default)]
    pub compatible_items: Vec<String>,
}

/// 子场景定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsceneConfig {
    pub id: String,
    /// 内容包 id（缺省为子场景 id）
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub interactables: Vec<InteractableConfig>,
}

impl SubsceneConfig {
    pub fn content_id(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.id)
    }
}

/// 场景定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub id: String,
    /// 内容包 id（缺省为场景 id）
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub interactables: Vec<InteractableConfig>,
    #[serde(default)]
    pub subscenes: Vec<SubsceneConfig>,
    /// 进入后预加载的场景
    #[serde(default)]
    pub preload_next: Vec<String>,
}

impl SceneConfig {
    pub fn content_id(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.id)
    }

    pub fn subscene(&self, subscene_id: &str) -> Option<&SubsceneConfig> {
        self.subscenes.iter().find(|s| s.id == subscene_id)
    }

    /// 查找交互物；`subscene_id` 有值时只在该子场景的列表中查找
    pub fn interactable(
        &self,
        subscene_id: Option<&str>,
        interactable_id: &str,
    ) -> Option<&InteractableConfig> {
        let list = match subscene_id {
            Some(sub) => &self.subscene(sub)?.interactables,
            None => &self.interactables,
        };
        list.iter().find(|i| i.id == interactable_id)
    }
}

/// 对话中的动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueAction {
    SetFlag {
        flag: String,
        #[serde(default = "default_flag_value")]
        value: FlagValue,
    },
}

/// 对话行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLineConfig {
    pub text: String,
    /// 覆盖对话级别的说话者
    #[serde(default)]
    pub speaker: Option<String>,
}

/// 对话选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub text: String,
    #[serde(default)]
    pub action: Option<DialogueAction>,
}

/// 对话定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueConfig {
    pub id: String,
    /// 默认说话者
    #[serde(default)]
    pub speaker: Option<String>,
    pub lines: Vec<DialogueLineConfig>,
    #[serde(default)]
    pub choices: Vec<ChoiceConfig>,
    #[serde(default)]
    pub on_complete: Option<DialogueAction>,
}

impl DialogueConfig {
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// 第 `index` 行的说话者
    pub fn speaker_of(&self, index: usize) -> Option<&str> {
        self.lines
            .get(index)
            .and_then(|l| l.speaker.as_deref())
            .or(self.speaker.as_deref())
    }
}

/// 剧情节点动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeAction {
    /// 载入场景；`transition` 为真时走带转场的切换
    SceneLoad {
        scene: String,
        #[serde(default)]
        transition: bool,
    },
    /// 播放过场视频
    Cutscene { video: String },
    /// 开始对话
    Dialogue { dialogue: String },
    /// 写入 Flag
    FlagSet {
        flag: String,
        #[serde(default = "default_flag_value")]
        value: FlagValue,
    },
    /// 等待 Flag 变为真；没有 flag 时立即继续
    Wait {
        #[serde(default)]
        flag: Option<String>,
    },
}

/// 节点后继
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Successor {
    Node(String),
    ChapterComplete,
}

impl From<String> for Successor {
    fn from(value: String) -> Self {
        if value == CHAPTER_COMPLETE {
            Self::ChapterComplete
        } else {
            Self::Node(value)
        }
    }
}

impl From<Successor> for String {
    fn from(value: Successor) -> Self {
        match value {
            Successor::Node(id) => id,
            Successor::ChapterComplete => CHAPTER_COMPLETE.to_string(),
        }
    }
}

/// 剧情节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: String,
    #[serde(flatten)]
    pub action: NodeAction,
    #[serde(default)]
    pub on_complete: Option<Successor>,
    /// 节点自身动作完成后自动推进
    #[serde(default)]
    pub auto_advance: bool,
}

/// 章节定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterConfig {
    pub id: String,
    pub nodes: Vec<StoryNode>,
    /// 完成后自动开始的章节
    #[serde(default)]
    pub next_chapter: Option<String>,
    /// 完成即结局
    #[serde(default)]
    pub ending: bool,
}

impl ChapterConfig {
    pub fn first_node(&self) -> Option<&StoryNode> {
        self.nodes.first()
    }

    pub fn node(&self, node_id: &str) -> Option<&StoryNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

fn default_flag_value() -> FlagValue {
    FlagValue::Bool(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_node_shape() {
        let node: StoryNode = serde_json::from_str(
            r#"{"id": "n1", "type": "scene_load", "scene": "bedroom", "on_complete": "n2"}"#,
        )
        .unwrap();
        assert_eq!(
            node.action,
            NodeAction::SceneLoad {
                scene: "bedroom".to_string(),
                transition: false
            }
        );
        assert_eq!(node.on_complete, Some(Successor::Node("n2".to_string())));
        assert!(!node.auto_advance);
    }

    #[test]
    fn test_chapter_complete_successor() {
        let node: StoryNode = serde_json::from_str(
            r#"{"id": "end", "type": "wait", "on_complete": "chapter_complete"}"#,
        )
        .unwrap();
        assert_eq!(node.on_complete, Some(Successor::ChapterComplete));
        assert_eq!(node.action, NodeAction::Wait { flag: None });
    }

    #[test]
    fn test_unknown_node_type_rejected() {
        let result: Result<StoryNode, _> =
            serde_json::from_str(r#"{"id": "x", "type": "teleport"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_flag_set_defaults_to_true() {
        let node: StoryNode =
            serde_json::from_str(r#"{"id": "f", "type": "flag_set", "flag": "door_open"}"#)
                .unwrap();
        assert_eq!(
            node.action,
            NodeAction::FlagSet {
                flag: "door_open".to_string(),
                value: FlagValue::Bool(true)
            }
        );
    }

    #[test]
    fn test_interactable_lookup_prefers_subscene_list() {
        let scene: SceneConfig = serde_json::from_str(
            r#"{
                "id": "bedroom",
                "interactables": [{"id": "desk", "type": "subscene", "subscene": "desk_close"}],
                "subscenes": [{
                    "id": "desk_close",
                    "interactables": [{"id": "note", "type": "pick_item", "item": "note"}]
                }]
            }"#,
        )
        .unwrap();

        assert!(scene.interactable(None, "desk").is_some());
        assert!(scene.interactable(None, "note").is_none());
        assert!(scene.interactable(Some("desk_close"), "note").is_some());
        assert!(scene.interactable(Some("desk_close"), "desk").is_none());
        assert!(scene.interactable(Some("missing"), "note").is_none());
        assert_eq!(scene.content_id(), "bedroom");
    }

    #[test]
    fn test_dialogue_speaker_fallback() {
        let dialogue: DialogueConfig = serde_json::from_str(
            r#"{
                "id": "d",
                "speaker": "Mia",
                "lines": [{"text": "a"}, {"text": "b", "speaker": "Tom"}]
            }"#,
        )
        .unwrap();
        assert_eq!(dialogue.speaker_of(0), Some("Mia"));
        assert_eq!(dialogue.speaker_of(1), Some("Tom"));
        assert!(!dialogue.has_choices());
    }
}
