//! # Config 模块
//!
//! 宿主运行时配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use adventure_core::CoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 内容目录 JSON 路径
    #[serde(default = "default_content_path")]
    pub content_path: PathBuf,

    /// 资源根目录
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// 存档目录
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 资源文件缺失时是否按加载失败处理
    ///
    /// 关闭时缺失的文件也会分配句柄，便于只有内容 JSON 时调试流程。
    #[serde(default)]
    pub require_asset_files: bool,

    /// 自动回传转场完成
    #[serde(default = "default_auto_transitions")]
    pub auto_transitions: bool,

    /// 核心配置
    #[serde(default)]
    pub core: CoreConfig,
}

fn default_content_path() -> PathBuf {
    PathBuf::from("content/game.json")
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_transitions() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_path: default_content_path(),
            assets_root: default_assets_root(),
            saves_dir: default_saves_dir(),
            log_level: default_log_level(),
            require_asset_files: false,
            auto_transitions: default_auto_transitions(),
            core: CoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并打印警告。
    /// 日志尚未初始化，所以这里直接写到终端。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            eprintln!("⚠️ 配置文件不存在: {:?}，使用默认配置", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("⚠️ 配置文件解析失败: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("⚠️ 配置文件读取失败: {}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core.save_namespace.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "save_namespace 不能为空".to_string(),
            ));
        }

        if self.core.slot_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "slot_count 至少为 1".to_string(),
            ));
        }

        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// 解析日志级别
pub fn parse_level(level: &str) -> Option<tracing::Level> {
    level.trim().parse().ok()
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
