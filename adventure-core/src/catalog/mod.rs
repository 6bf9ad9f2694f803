//! # Catalog 模块
//!
//! 只读的内容目录：物品、场景、对话、章节，启动时从一份 JSON 文档加载一次。
//!
//! ## 文档格式
//!
//! ```json
//! {
//!   "new_game": { "start_scene": "bedroom", "start_chapter": "ch1", "intro": true },
//!   "items": [ ... ],
//!   "scenes": [ ... ],
//!   "dialogues": [ ... ],
//!   "chapters": [ ... ]
//! }
//! ```
//!
//! 同类条目 id 重复会被拒绝。解释器只持有 id，通过目录引用定义，不复制。

mod config;
pub mod validate;

pub use config::{
    CHAPTER_COMPLETE, ChapterConfig, ChoiceConfig, DialogueAction, DialogueConfig,
    DialogueLineConfig, InteractableConfig, InteractionAction, ItemConfig, NewGameConfig,
    NodeAction, SceneConfig, StoryNode, SubsceneConfig, Successor,
};
pub use validate::{Diagnostic, DiagnosticLevel, DiagnosticResult};

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{CatalogError, ContentError};

#[derive(Deserialize)]
struct CatalogDocument {
    new_game: NewGameConfig,
    #[serde(default)]
    items: Vec<ItemConfig>,
    #[serde(default)]
    scenes: Vec<SceneConfig>,
    #[serde(default)]
    dialogues: Vec<DialogueConfig>,
    #[serde(default)]
    chapters: Vec<ChapterConfig>,
}

/// 内容目录
#[derive(Debug, Clone)]
pub struct Catalog {
    new_game: NewGameConfig,
    items: BTreeMap<String, ItemConfig>,
    scenes: BTreeMap<String, SceneConfig>,
    dialogues: BTreeMap<String, DialogueConfig>,
    chapters: BTreeMap<String, ChapterConfig>,
}

fn index_by_id<T>(
    kind: &'static str,
    entries: Vec<T>,
    id_of: impl Fn(&T) -> &str,
) -> Result<BTreeMap<String, T>, CatalogError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let id = id_of(&entry).to_string();
        if map.contains_key(&id) {
            return Err(CatalogError::DuplicateId { kind, id });
        }
        map.insert(id, entry);
    }
    Ok(map)
}

impl Catalog {
    /// 从 JSON 文档加载
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(Self {
            new_game: doc.new_game,
            items: index_by_id("item", doc.items, |i| &i.id)?,
            scenes: index_by_id("scene", doc.scenes, |s| &s.id)?,
            dialogues: index_by_id("dialogue", doc.dialogues, |d| &d.id)?,
            chapters: index_by_id("chapter", doc.chapters, |c| &c.id)?,
        })
    }

    pub fn new_game(&self) -> &NewGameConfig {
        &self.new_game
    }

    pub fn item(&self, id: &str) -> Option<&ItemConfig> {
        self.items.get(id)
    }

    pub fn scene(&self, id: &str) -> Option<&SceneConfig> {
        self.scenes.get(id)
    }

    pub fn dialogue(&self, id: &str) -> Option<&DialogueConfig> {
        self.dialogues.get(id)
    }

    pub fn chapter(&self, id: &str) -> Option<&ChapterConfig> {
        self.chapters.get(id)
    }

    pub fn require_scene(&self, id: &str) -> Result<&SceneConfig, ContentError> {
        self.scene(id).ok_or_else(|| ContentError::SceneMissing {
            scene_id: id.to_string(),
        })
    }

    pub fn require_dialogue(&self, id: &str) -> Result<&DialogueConfig, ContentError> {
        self.dialogue(id).ok_or_else(|| ContentError::DialogueMissing {
            dialogue_id: id.to_string(),
        })
    }

    pub fn require_chapter(&self, id: &str) -> Result<&ChapterConfig, ContentError> {
        self.chapter(id).ok_or_else(|| ContentError::ChapterMissing {
            chapter_id: id.to_string(),
        })
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemConfig> {
        self.items.values()
    }

    pub fn scenes(&self) -> impl Iterator<Item = &SceneConfig> {
        self.scenes.values()
    }

    pub fn dialogues(&self) -> impl Iterator<Item = &DialogueConfig> {
        self.dialogues.values()
    }

    pub fn chapters(&self) -> impl Iterator<Item = &ChapterConfig> {
        self.chapters.values()
    }

    /// 静态检查
    pub fn validate(&self) -> DiagnosticResult {
        validate::validate_catalog(self)
    }
}
