//! Kuma Probe - Uptime Kuma 远程推送探针
//!
//! 从 REST 接口拉取 Uptime Kuma 监控项，挑选分配给本探针的推送型监控项，
//! 在本地执行检测并把结果推送回 Uptime Kuma：
//! - Ping / HTTP / TCP 检测
//! - TLS 证书与域名注册到期检测
//! - 数据库连通性检测
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod logging;
pub mod monitor;
pub mod probe;
pub mod push;

// 重新导出主要类型
pub use config::{Config, ProbeConfig};
pub use error::{ProbeError, Result};
pub use health::{CheckOutcome, HealthChecker};
pub use probe::{CycleReport, Endpoint, ProbeRunner};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
