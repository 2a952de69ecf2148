//! 探针主循环
//!
//! 依赖门控 → 拉取监控项 → 解析端点 → 分发检测 → 休眠，直到收到关闭信号

use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::health::DependencyProbe;
use crate::monitor::MonitorSource;
use crate::probe::dispatcher::{DispatchSummary, Dispatcher};
use crate::probe::resolver::EndpointResolver;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 单轮执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleReport {
    /// 依赖主机不可达，跳过本轮
    DependencyUnreachable { host: String, error: Option<String> },
    /// 拉取监控项失败，跳过本轮
    FetchFailed { error: String },
    /// 监控源没有返回数据
    NoMonitors,
    /// 解析端点失败，跳过本轮
    ResolveFailed { error: String },
    /// 已完成分发
    Dispatched {
        endpoints: usize,
        interval_warnings: usize,
        summary: DispatchSummary,
    },
}

/// 探针主循环
pub struct ProbeRunner {
    config: ProbeConfig,
    source: Arc<dyn MonitorSource>,
    dependency: Arc<dyn DependencyProbe>,
    dispatcher: Dispatcher,
}

impl ProbeRunner {
    /// 创建主循环
    ///
    /// 未配置依赖主机时返回 `ProbeError::MissingUpDependency`
    pub fn new(
        config: ProbeConfig,
        source: Arc<dyn MonitorSource>,
        dependency: Arc<dyn DependencyProbe>,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        if config.up_dependency.trim().is_empty() {
            return Err(ProbeError::MissingUpDependency);
        }

        Ok(Self {
            config,
            source,
            dependency,
            dispatcher,
        })
    }

    /// 执行一轮检测
    pub async fn run_cycle(&mut self) -> CycleReport {
        let host = self.config.up_dependency.trim().to_string();

        match self.dependency.is_reachable(&host, self.config.timeout()).await {
            Ok(true) => debug!("依赖主机 {} 可达", host),
            Ok(false) => {
                warn!("依赖主机 {} 不可达，跳过本轮检测", host);
                return CycleReport::DependencyUnreachable { host, error: None };
            }
            Err(e) => {
                error!("检测依赖主机 {} 失败，跳过本轮检测: {}", host, e);
                return CycleReport::DependencyUnreachable {
                    host,
                    error: Some(e.to_string()),
                };
            }
        }

        let monitors = match self.source.fetch_monitors().await {
            Ok(Some(monitors)) => monitors,
            Ok(None) => {
                warn!("监控源未返回任何监控项，跳过本轮检测");
                return CycleReport::NoMonitors;
            }
            Err(e) => {
                error!("拉取监控项失败，跳过本轮检测: {}", e);
                return CycleReport::FetchFailed {
                    error: e.to_string(),
                };
            }
        };

        let resolution = match EndpointResolver::new(&self.config).resolve(&monitors) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("解析监控项失败，跳过本轮检测: {}", e);
                return CycleReport::ResolveFailed {
                    error: e.to_string(),
                };
            }
        };

        let endpoints = resolution.endpoints.len();
        let summary = self.dispatcher.dispatch(resolution.endpoints).await;

        CycleReport::Dispatched {
            endpoints,
            interval_warnings: resolution.warnings.len(),
            summary,
        }
    }

    /// 运行主循环直到收到关闭信号
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            "探针 {} 启动，轮询间隔 {}ms，依赖主机 {}",
            self.config.name, self.config.delay_ms, self.config.up_dependency
        );

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            let span = info_span!("probe_cycle", cycle_id = %Uuid::new_v4());
            let report = self.run_cycle().instrument(span).await;
            debug!("本轮结果: {:?}", report);

            tokio::select! {
                _ = tokio::time::sleep(self.config.delay()) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!("探针 {} 已停止", self.config.name);
        Ok(())
    }
}
