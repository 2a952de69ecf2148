//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::core::service::ServiceLauncher;
use crate::error::Result;
use crate::probe::CycleReport;
use async_trait::async_trait;
use std::path::Path;

/// `init` 命令写出的配置模板
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../../config.example.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 写出默认配置文件，已存在且未指定 force 时不覆盖
    ///
    /// # 返回
    /// * `Ok(true)` - 已写出
    /// * `Ok(false)` - 文件已存在，未覆盖
    pub async fn write_template(config_path: &Path, force: bool) -> Result<bool> {
        if config_path.exists() && !force {
            return Ok(false);
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).await?;
        Ok(true)
    }

    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if Self::write_template(config_path, force).await? {
            println!("配置文件已创建: {}", config_path.display());
            println!("请修改探针名称、Uptime Kuma 地址和监控项来源后再启动");
        } else {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let config = ServiceLauncher::load_and_validate_config(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("探针配置:");
            println!("  名称: {}", config.probe.name);
            println!("  依赖主机: {}", config.probe.up_dependency);
            println!("  轮询间隔: {}ms", config.probe.delay_ms);
            println!("  超时时间: {}ms", config.probe.timeout_ms);
            println!("  Uptime Kuma: {}", config.probe.url);
            println!(
                "  数据库连接串模板: {}",
                if config.probe.connection_strings.is_empty() {
                    "未配置"
                } else {
                    "已配置"
                }
            );
            println!("监控项来源:");
            println!("  地址: {}", config.monitor_source.url);
            println!(
                "  认证方式: {}",
                if config.monitor_source.token.is_some() {
                    "令牌"
                } else if config.monitor_source.username.is_some() {
                    "用户名密码"
                } else {
                    "无"
                }
            );
            println!("日志配置:");
            println!("  级别: {}", config.logging.level);
            println!("  JSON格式: {}", config.logging.json_format);
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 探针名称: {}", config.probe.name);
        }

        if config.probe.up_dependency.trim().is_empty() {
            println!("⚠ 未配置 probe.up_dependency，探针将无法启动");
        }

        Ok(())
    }
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config = ServiceLauncher::load_and_validate_config(&args.get_config_path()).await?;
        let runner = ServiceLauncher::build_runner(&config, false)?;
        ServiceLauncher::run_foreground(runner).await
    }
}

/// 单轮检测命令
pub struct OnceCommand;

#[async_trait]
impl Command for OnceCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Once { format, dry_run } = &args.command {
            let config =
                ServiceLauncher::load_and_validate_config(&args.get_config_path()).await?;
            let mut runner = ServiceLauncher::build_runner(&config, *dry_run)?;
            let report = runner.run_cycle().await;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_report(&report),
            }
        }
        Ok(())
    }
}

/// 打印文本格式的单轮结果
fn print_report(report: &CycleReport) {
    match report {
        CycleReport::DependencyUnreachable { host, error } => {
            println!("✗ 依赖主机 {host} 不可达");
            if let Some(error) = error {
                println!("  错误: {error}");
            }
        }
        CycleReport::FetchFailed { error } => {
            println!("✗ 拉取监控项失败: {error}");
        }
        CycleReport::NoMonitors => {
            println!("- 监控源未返回任何监控项");
        }
        CycleReport::ResolveFailed { error } => {
            println!("✗ 解析监控项失败: {error}");
        }
        CycleReport::Dispatched {
            endpoints,
            interval_warnings,
            summary,
        } => {
            println!("✓ 本探针负责 {endpoints} 个端点");
            println!(
                "  执行: {}  成功: {}  失败: {}  门控跳过: {}  忽略: {}",
                summary.dispatched,
                summary.succeeded,
                summary.failed,
                summary.gated,
                summary.ignored
            );
            if *interval_warnings > 0 {
                println!("  ⚠ {interval_warnings} 个监控项的间隔小于探针轮询间隔");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLoader, TomlConfigLoader};
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn test_default_template_loads_with_env_substitution() {
        std::env::remove_var("VAR");
        std::env::remove_var("KUMA_PROBE_TOKEN");

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        assert!(InitCommand::write_template(&path, false).await.unwrap());

        let config = TomlConfigLoader::new(true)
            .load_from_file(&path)
            .await
            .unwrap();

        assert_eq!(config.probe.name, "probe-01");
        assert_eq!(config.probe.delay_ms, 60_000);
        assert!(config.probe.url.ends_with('/'));
        assert!(config.monitor_source.token.is_none());
    }

    #[tokio::test]
    async fn test_write_template_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(InitCommand::write_template(&path, false).await.unwrap());
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );

        tokio::fs::write(&path, "custom").await.unwrap();
        assert!(!InitCommand::write_template(&path, false).await.unwrap());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "custom");

        assert!(InitCommand::write_template(&path, true).await.unwrap());
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );
    }
}
