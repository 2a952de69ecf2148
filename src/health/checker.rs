//! 检测策略
//!
//! 定义检测器接口，以及“检测 + 推送”组合而成的检测策略

use crate::error::Result;
use crate::health::{
    CertificateChecker, CheckOutcome, DatabaseChecker, DomainChecker, HttpChecker, PingChecker,
    TcpChecker,
};
use crate::probe::endpoint::{CheckKind, Endpoint};
use crate::push::PushReporter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 健康检测器trait，定义检测接口
///
/// 实现者不应返回错误：所有失败都应转换为 `success == false` 的结果
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// 检测器处理的类型
    fn kind(&self) -> CheckKind;

    /// 执行检测
    ///
    /// # 参数
    /// * `endpoint` - 检测端点
    ///
    /// # 返回
    /// * `CheckOutcome` - 检测结果
    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome;
}

/// 检测策略：执行检测并将结果推送到对应地址
#[derive(Clone)]
pub struct CheckStrategy {
    checker: Arc<dyn HealthChecker>,
    reporter: Arc<dyn PushReporter>,
}

impl CheckStrategy {
    pub fn new(checker: Arc<dyn HealthChecker>, reporter: Arc<dyn PushReporter>) -> Self {
        Self { checker, reporter }
    }

    /// 策略对应的检测类型
    pub fn kind(&self) -> CheckKind {
        self.checker.kind()
    }

    /// 执行检测并推送
    ///
    /// 推送失败只记录日志，不影响检测结果
    pub async fn execute(&self, endpoint: &Endpoint) -> CheckOutcome {
        let outcome = self.checker.check(endpoint).await;

        debug!(
            "{} [{}] {} -> {} ({}ms) {}",
            outcome.monitor_name,
            outcome.kind,
            outcome.destination,
            if outcome.success { "UP" } else { "DOWN" },
            outcome.elapsed_ms(),
            outcome.detail
        );

        let pushed = if outcome.success {
            self.reporter
                .push_success(&endpoint.push_up_uri, outcome.elapsed_ms())
                .await
        } else {
            self.reporter
                .push_failure(&endpoint.push_down_uri, outcome.elapsed_ms(), &outcome.detail)
                .await
        };

        if let Err(e) = pushed {
            warn!("监控项 {} 推送结果失败: {}", endpoint.monitor_name, e);
        }

        outcome
    }
}

/// 按检测类型索引的策略集合
#[derive(Clone, Default)]
pub struct StrategySet {
    strategies: HashMap<CheckKind, CheckStrategy>,
}

impl StrategySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册检测器，同类型的旧策略会被替换
    pub fn register(&mut self, checker: Arc<dyn HealthChecker>, reporter: Arc<dyn PushReporter>) {
        let strategy = CheckStrategy::new(checker, reporter);
        self.strategies.insert(strategy.kind(), strategy);
    }

    /// 查找检测类型对应的策略
    pub fn get(&self, kind: &CheckKind) -> Option<&CheckStrategy> {
        self.strategies.get(kind)
    }

    /// 已注册的策略数量
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// 注册全部内置检测器
    pub fn standard(reporter: Arc<dyn PushReporter>) -> Result<Self> {
        let mut set = Self::new();
        set.register(Arc::new(PingChecker::new()), reporter.clone());
        set.register(Arc::new(HttpChecker::new()?), reporter.clone());
        set.register(Arc::new(TcpChecker::new()), reporter.clone());
        set.register(Arc::new(CertificateChecker::new()?), reporter.clone());
        set.register(Arc::new(DatabaseChecker::new()), reporter.clone());
        set.register(Arc::new(DomainChecker::new()?), reporter);
        Ok(set)
    }
}
