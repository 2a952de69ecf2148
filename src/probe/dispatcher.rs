//! 检测分发器
//!
//! 按端点类型选择检测策略并依次执行

use crate::health::{CheckOutcome, StrategySet};
use crate::probe::daily_gate::{DailyGate, GateDecision};
use crate::probe::endpoint::{CheckKind, Endpoint};
use serde::Serialize;
use tracing::{debug, info, warn};

/// 一轮分发的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// 实际执行检测的端点数
    pub dispatched: usize,
    /// 成功
    pub succeeded: usize,
    /// 失败
    pub failed: usize,
    /// 被每日门控跳过的域名检测
    pub gated: usize,
    /// 没有对应策略而被忽略的端点
    pub ignored: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &CheckOutcome) {
        self.dispatched += 1;
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// 检测分发器
///
/// 持有检测策略、每日门控和数据库连接串模板，跨轮次复用
pub struct Dispatcher {
    strategies: StrategySet,
    gate: DailyGate,
    connection_string_template: String,
}

impl Dispatcher {
    /// 创建新的分发器
    ///
    /// # 参数
    /// * `strategies` - 检测策略集合
    /// * `connection_string_template` - 数据库连接串模板
    pub fn new(strategies: StrategySet, connection_string_template: impl Into<String>) -> Self {
        Self {
            strategies,
            gate: DailyGate::new(),
            connection_string_template: connection_string_template.into(),
        }
    }

    /// 按顺序分发端点，每个端点只执行一次
    pub async fn dispatch(&mut self, endpoints: Vec<Endpoint>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for mut endpoint in endpoints {
            let Some(strategy) = self.strategies.get(&endpoint.kind) else {
                debug!(
                    "监控项 {} 的类型 {} 没有对应的检测策略，已忽略",
                    endpoint.monitor_name, endpoint.kind
                );
                summary.ignored += 1;
                continue;
            };

            match endpoint.kind {
                CheckKind::Database => {
                    endpoint.connection_string = Some(format!(
                        "{}.{}",
                        self.connection_string_template, endpoint.brand
                    ));
                }
                CheckKind::Domain => {
                    if self.gate.should_run_and_mark() == GateDecision::Skip {
                        debug!("今日已执行过域名检测，跳过 {}", endpoint.monitor_name);
                        summary.gated += 1;
                        continue;
                    }
                }
                _ => {}
            }

            let outcome = strategy.execute(&endpoint).await;
            if !outcome.success {
                warn!(
                    "检测失败: {} [{}] {} - {}",
                    outcome.monitor_name, outcome.kind, outcome.destination, outcome.detail
                );
            }
            summary.record(&outcome);
        }

        info!(
            "本轮分发完成: 执行 {}，成功 {}，失败 {}，门控跳过 {}，忽略 {}",
            summary.dispatched, summary.succeeded, summary.failed, summary.gated, summary.ignored
        );

        summary
    }
}
