//! # Adventure CLI
//!
//! 无界面宿主：从标准输入或脚本文件读取文本命令驱动 adventure-core，
//! 把核心发出的通知逐行输出为 JSON。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p host-cli
//! cargo run -p host-cli -- run demos/walkthrough.txt
//! cargo run -p host-cli -- --config config.json check
//! cargo run -p host-cli -- slots
//! ```

mod config;
mod fetcher;
mod repl;
mod store;

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use adventure_core::{Catalog, DiagnosticLevel, GameCore, SaveManager};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{AppConfig, parse_level};
use crate::fetcher::FsFetcher;
use crate::repl::{Driver, Flow};
use crate::store::DirStore;

#[derive(Parser)]
#[command(name = "adventure")]
#[command(about = "文本命令驱动的冒险游戏宿主")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 配置文件路径
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 覆盖配置中的日志级别
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行游戏（默认）
    Run {
        /// 命令脚本；缺省时从标准输入读取
        script: Option<PathBuf>,
    },

    /// 检查内容配置
    Check,

    /// 列出存档槽位
    Slots,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config);
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    let level = parse_level(&config.log_level).unwrap_or(tracing::Level::INFO);
    // 标准输出留给通知，日志写到 stderr
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Run { script: None }) {
        Commands::Run { script } => run(&config, script),
        Commands::Check => check(&config),
        Commands::Slots => slots(&config),
    }
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    let text = fs::read_to_string(&config.content_path)
        .with_context(|| format!("无法读取内容配置: {:?}", config.content_path))?;
    let catalog = Catalog::from_json(&text)?;
    info!(path = ?config.content_path, "内容配置加载完成");
    Ok(catalog)
}

fn run(config: &AppConfig, script: Option<PathBuf>) -> Result<()> {
    let catalog = load_catalog(config)?;

    let fetcher = FsFetcher::new(&config.assets_root, config.require_asset_files);
    let completions = fetcher.completions();
    let core = GameCore::new(
        catalog,
        Box::new(DirStore::new(&config.saves_dir)),
        Box::new(fetcher),
        &config.core,
    );

    let mut driver = Driver::new(core, completions, config.auto_transitions, io::stdout());
    driver.boot()?;

    let reader: Box<dyn BufRead> = match &script {
        Some(path) => Box::new(BufReader::new(
            fs::File::open(path).with_context(|| format!("无法打开脚本: {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for line in reader.lines() {
        if driver.run_line(&line?)? == Flow::Quit {
            break;
        }
    }

    info!(stats = %driver.core().cache_stats().format(), "退出");
    Ok(())
}

fn check(config: &AppConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    let result = catalog.validate();

    for diagnostic in result.filter_by_level(DiagnosticLevel::Info) {
        println!("{}", diagnostic);
    }
    println!(
        "{} 个错误, {} 个警告",
        result.error_count(),
        result.warn_count()
    );

    if result.has_errors() {
        bail!("内容配置检查未通过");
    }
    Ok(())
}

fn slots(config: &AppConfig) -> Result<()> {
    let manager = SaveManager::new(Box::new(DirStore::new(&config.saves_dir)), &config.core);
    for slot in manager.list_slots() {
        println!("{}", serde_json::to_string(&slot)?);
    }
    Ok(())
}
