//! # 诊断模块
//!
//! 内容目录的静态检查，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 只报告问题，不修改目录

use std::collections::HashSet;

use super::{
    Catalog, ChapterConfig, InteractableConfig, InteractionAction, NodeAction, SceneConfig, Successor,
};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 出问题的条目，如 `chapter:ch1`、`scene:bedroom`
    pub source: String,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            source: source.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, source, message)
    }

    /// 创建警告诊断
    pub fn warn(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, source, message)
    }

    /// 创建信息诊断
    pub fn info(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, source, message)
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.source, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

/// 检查整个目录
///
/// 执行以下检查：
/// - 新游戏的起始场景 / 起始章节是否存在
/// - 章节：空章节、重复节点、悬空后继、未知引用、不可达节点
/// - 场景：交互物的未知引用、同一作用域内重复的交互物、未知的预加载目标
/// - 对话：空对话
pub fn validate_catalog(catalog: &Catalog) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    let new_game = catalog.new_game();
    if catalog.scene(&new_game.start_scene).is_none() {
        result.push(Diagnostic::error(
            "new_game",
            format!("起始场景不存在: {}", new_game.start_scene),
        ));
    }
    if let Some(chapter) = &new_game.start_chapter
        && catalog.chapter(chapter).is_none()
    {
        result.push(Diagnostic::error(
            "new_game",
            format!("起始章节不存在: {}", chapter),
        ));
    }

    for chapter in catalog.chapters() {
        check_chapter(catalog, chapter, &mut result);
    }
    for scene in catalog.scenes() {
        check_scene(catalog, scene, &mut result);
    }
    for dialogue in catalog.dialogues() {
        if dialogue.lines.is_empty() {
            result.push(Diagnostic::warn(
                format!("dialogue:{}", dialogue.id),
                "对话没有任何台词",
            ));
        }
    }

    result
}

fn check_chapter(catalog: &Catalog, chapter: &ChapterConfig, result: &mut DiagnosticResult) {
    let source = format!("chapter:{}", chapter.id);

    if chapter.nodes.is_empty() {
        result.push(Diagnostic::error(&source, "章节没有任何节点"));
        return;
    }

    let mut seen = HashSet::new();
    for node in &chapter.nodes {
        if !seen.insert(node.id.as_str()) {
            result.push(Diagnostic::error(
                &source,
                format!("节点 id 重复: {}", node.id),
            ));
        }
    }

    for node in &chapter.nodes {
        match &node.on_complete {
            Some(Successor::Node(next)) if !seen.contains(next.as_str()) => {
                result.push(
                    Diagnostic::error(&source, format!("未定义的后继节点: {}", next))
                        .with_detail(format!("节点 '{}' 的 on_complete 引用了不存在的节点", node.id)),
                );
            }
            None => {
                result.push(Diagnostic::warn(
                    &source,
                    format!("节点 '{}' 没有后继，推进会停在这里", node.id),
                ));
            }
            _ => {}
        }

        match &node.action {
            NodeAction::SceneLoad { scene, .. } if catalog.scene(scene).is_none() => {
                result.push(Diagnostic::error(
                    &source,
                    format!("节点 '{}' 引用了不存在的场景: {}", node.id, scene),
                ));
            }
            NodeAction::Dialogue { dialogue } if catalog.dialogue(dialogue).is_none() => {
                result.push(Diagnostic::error(
                    &source,
                    format!("节点 '{}' 引用了不存在的对话: {}", node.id, dialogue),
                ));
            }
            _ => {}
        }
    }

    if let Some(next) = &chapter.next_chapter
        && catalog.chapter(next).is_none()
    {
        result.push(Diagnostic::error(
            &source,
            format!("后续章节不存在: {}", next),
        ));
    }

    // 从首节点沿 on_complete 走一遍，找出不可达节点
    let mut reachable = HashSet::new();
    let mut cursor = chapter.first_node();
    while let Some(node) = cursor {
        if !reachable.insert(node.id.as_str()) {
            break;
        }
        cursor = match &node.on_complete {
            Some(Successor::Node(next)) => chapter.node(next),
            _ => None,
        };
    }
    for node in &chapter.nodes {
        if !reachable.contains(node.id.as_str()) {
            result.push(
                Diagnostic::info(&source, format!("节点不可达: {}", node.id))
                    .with_detail("只能通过 jump_to_node 到达"),
            );
        }
    }
}

fn check_scene(catalog: &Catalog, scene: &SceneConfig, result: &mut DiagnosticResult) {
    let source = format!("scene:{}", scene.id);

    let mut subscene_ids = HashSet::new();
    for sub in &scene.subscenes {
        if !subscene_ids.insert(sub.id.as_str()) {
            result.push(Diagnostic::error(
                &source,
                format!("子场景 id 重复: {}", sub.id),
            ));
        }
    }

    check_interactables(catalog, scene, &source, &scene.interactables, result);
    for sub in &scene.subscenes {
        let sub_source = format!("{}/{}", source, sub.id);
        check_interactables(catalog, scene, &sub_source, &sub.interactables, result);
    }

    for target in &scene.preload_next {
        if catalog.scene(target).is_none() {
            result.push(Diagnostic::warn(
                &source,
                format!("预加载目标不存在: {}", target),
            ));
        }
    }
}

fn check_interactables(
    catalog: &Catalog,
    scene: &SceneConfig,
    source: &str,
    interactables: &[InteractableConfig],
    result: &mut DiagnosticResult,
) {
    let mut seen = HashSet::new();
    for interactable in interactables {
        if !seen.insert(interactable.id.as_str()) {
            result.push(
                Diagnostic::warn(source, format!("交互物 id 重复: {}", interactable.id))
                    .with_detail("点击时只会命中第一个"),
            );
        }

        let missing = match &interactable.action {
            InteractionAction::Dialogue { dialogue } if catalog.dialogue(dialogue).is_none() => {
                Some(format!("对话 {}", dialogue))
            }
            InteractionAction::PickItem { item } if catalog.item(item).is_none() => {
                Some(format!("物品 {}", item))
            }
            InteractionAction::SceneSwitch { scene: target } if catalog.scene(target).is_none() => {
                Some(format!("场景 {}", target))
            }
            InteractionAction::Subscene { subscene } if scene.subscene(subscene).is_none() => {
                Some(format!("子场景 {}", subscene))
            }
            _ => None,
        };
        if let Some(what) = missing {
            result.push(Diagnostic::error(
                source,
                format!("交互物 '{}' 引用了不存在的{}", interactable.id, what),
            ));
        }

        for item in &interactable.compatible_items {
            if catalog.item(item).is_none() {
                result.push(Diagnostic::warn(
                    source,
                    format!("交互物 '{}' 的可用物品不存在: {}", interactable.id, item),
                ));
            }
        }
    }
}
