//! 健康检测模块
//!
//! 提供各类检测器、检测结果以及“检测 + 推送”的检测策略

pub mod certificate;
pub mod checker;
pub mod database;
pub mod domain;
pub mod http;
pub mod ping;
pub mod result;
pub mod tcp;

// 重新导出主要类型
pub use certificate::CertificateChecker;
pub use checker::{CheckStrategy, HealthChecker, StrategySet};
pub use database::DatabaseChecker;
pub use domain::{DomainChecker, WhoisClient};
pub use http::HttpChecker;
pub use ping::{DependencyProbe, IcmpDependencyProbe, PingChecker};
pub use result::CheckOutcome;
pub use tcp::TcpChecker;
