//! 探针模块
//!
//! 端点解析、每日门控、检测分发与主循环

pub mod daily_gate;
pub mod dispatcher;
pub mod endpoint;
pub mod resolver;
pub mod runner;

// 重新导出主要类型
pub use daily_gate::{DailyGate, GateDecision};
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use endpoint::{CheckKind, Endpoint};
pub use resolver::{EndpointResolver, IntervalWarning, Resolution};
pub use runner::{CycleReport, ProbeRunner};
