//! 应用程序核心逻辑
//!
//! 包含主函数、命令执行和应用程序生命周期管理

use crate::cli::args::{Args, Commands};
use crate::cli::commands::{
    Command, InitCommand, OnceCommand, StartCommand, ValidateCommand, VersionCommand,
};
use crate::config::{ConfigLoader, LoggingConfig, TomlConfigLoader};
use crate::logging::{LogConfig, LoggingSystem};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

/// 应用程序主函数
pub async fn run() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let logging = preload_logging_config(&args).await;
    let level_override = args.log_level.as_ref().map(|level| level.to_string());
    let log_config = LogConfig::from_config(&logging, level_override.as_deref());

    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!(
        "Kuma Probe v{} 启动，日志级别: {}",
        crate::VERSION,
        logging_system.config().level
    );

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 运行探针的命令先读取配置文件中的日志段
///
/// 读取失败时使用默认日志配置，真正的错误由命令本身报告
async fn preload_logging_config(args: &Args) -> LoggingConfig {
    match &args.command {
        Commands::Start | Commands::Once { .. } => TomlConfigLoader::new(true)
            .load_from_file(args.get_config_path())
            .await
            .map(|config| config.logging)
            .unwrap_or_default(),
        _ => LoggingConfig::default(),
    }
}

/// 执行CLI命令
pub async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Start => Box::new(StartCommand),
        Commands::Once { .. } => Box::new(OnceCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(anyhow::Error::from)
}
