//! # Error 模块
//!
//! 定义 adventure-core 中使用的错误类型。
//!
//! 核心中没有任何错误会终止进程：`GameCore` 在分发输入时记录日志并退回稳定状态，
//! 这里的类型化错误只由底层组件 API 返回，供宿主和测试观察。

use thiserror::Error;

use crate::resources::AssetKey;

/// 内容缺失 / 内容配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    /// 场景不存在
    #[error("场景 '{scene_id}' 不存在")]
    SceneMissing { scene_id: String },

    /// 子场景不存在
    #[error("场景 '{scene_id}' 中不存在子场景 '{subscene_id}'")]
    SubsceneMissing {
        scene_id: String,
        subscene_id: String,
    },

    /// 对话不存在
    #[error("对话 '{dialogue_id}' 不存在")]
    DialogueMissing { dialogue_id: String },

    /// 物品不存在
    #[error("物品 '{item_id}' 不存在")]
    ItemMissing { item_id: String },

    /// 章节不存在
    #[error("章节 '{chapter_id}' 不存在")]
    ChapterMissing { chapter_id: String },

    /// 章节中的节点不存在
    #[error("章节 '{chapter_id}' 中不存在节点 '{node_id}'")]
    NodeMissing { chapter_id: String, node_id: String },

    /// 章节图结构错误（如没有任何节点）
    #[error("章节 '{chapter_id}' 结构错误: {message}")]
    MalformedChapter { chapter_id: String, message: String },
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    /// 存档不存在
    #[error("存档不存在: {key}")]
    NotFound { key: String },

    /// 存档内容损坏（JSON 无法解析）
    #[error("存档损坏: {key} - {message}")]
    Corrupt { key: String, message: String },

    /// 序列化失败
    #[error("存档序列化失败: {0}")]
    Serialization(String),

    /// 没有激活的游戏进度
    #[error("当前没有激活的游戏进度")]
    NoActiveState,

    /// 无效的槽位标识
    #[error("无效的存档槽位: {0}")]
    InvalidSlot(String),

    /// 存储后端失败
    #[error("存储后端错误: {0}")]
    Store(#[from] StoreError),
}

/// 键值存储后端错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 资源加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// 拉取失败（由宿主的拉取原语报告）
    #[error("加载 {asset} 失败: {cause}")]
    FetchFailed { asset: AssetKey, cause: String },
}

/// 内容目录解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// JSON 解析失败
    #[error("内容配置解析失败: {0}")]
    Parse(String),

    /// 同类条目 id 重复
    #[error("{kind} id 重复: '{id}'")]
    DuplicateId { kind: &'static str, id: String },
}

/// adventure-core 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("内容错误: {0}")]
    Content(#[from] ContentError),

    #[error("存档错误: {0}")]
    Save(#[from] SaveError),

    #[error("资源错误: {0}")]
    Load(#[from] LoadError),

    #[error("目录错误: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result 类型别名
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ContentError::NodeMissing {
            chapter_id: "ch1".to_string(),
            node_id: "n9".to_string(),
        };
        assert_eq!(err.to_string(), "章节 'ch1' 中不存在节点 'n9'");

        let err: CoreError = SaveError::NoActiveState.into();
        assert!(matches!(err, CoreError::Save(SaveError::NoActiveState)));
    }

    #[test]
    fn test_store_error_converts() {
        let err: SaveError = StoreError::new("disk full").into();
        assert_eq!(err.to_string(), "存储后端错误: disk full");
    }
}
