//! 服务管理模块
//!
//! 负责加载配置、组装探针组件并在前台运行主循环

use crate::config::{self, ConfigLoader, TomlConfigLoader};
use crate::error::Result;
use crate::health::{IcmpDependencyProbe, StrategySet};
use crate::monitor::HttpMonitorSource;
use crate::probe::{Dispatcher, ProbeRunner};
use crate::push::{HttpPushReporter, NoOpReporter, PushReporter};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// 服务启动器
pub struct ServiceLauncher;

impl ServiceLauncher {
    /// 加载和验证配置
    pub async fn load_and_validate_config(config_path: &Path) -> Result<config::Config> {
        info!("加载配置文件: {}", config_path.display());

        let config_loader = TomlConfigLoader::new(true);
        let config = config_loader.load_from_file(config_path).await?;

        info!(
            "配置加载成功，探针名称: {}，Uptime Kuma: {}",
            config.probe.name, config.probe.url
        );
        Ok(config)
    }

    /// 组装探针主循环
    ///
    /// # 参数
    /// * `config` - 已验证的配置
    /// * `dry_run` - 为 true 时不推送检测结果
    pub fn build_runner(config: &config::Config, dry_run: bool) -> Result<ProbeRunner> {
        info!("初始化探针组件...");

        let reporter: Arc<dyn PushReporter> = if dry_run {
            info!("试运行模式，检测结果不会推送");
            Arc::new(NoOpReporter)
        } else {
            Arc::new(HttpPushReporter::new(config.monitor_source.timeout())?)
        };

        let strategies = StrategySet::standard(reporter)?;
        let dispatcher = Dispatcher::new(strategies, config.probe.connection_strings.clone());
        let source = Arc::new(HttpMonitorSource::new(&config.monitor_source)?);

        ProbeRunner::new(
            config.probe.clone(),
            source,
            Arc::new(IcmpDependencyProbe),
            dispatcher,
        )
    }

    /// 在前台运行主循环，直到收到 Ctrl+C
    pub async fn run_foreground(runner: ProbeRunner) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("收到中断信号，正在停止探针...");
                    let _ = shutdown_tx_clone.send(());
                }
                Err(err) => {
                    error!("监听中断信号失败: {}", err);
                }
            }
        });

        let result = runner.run(shutdown_rx).await;
        drop(shutdown_tx);
        result
    }
}
