//! 推送模块
//!
//! 将检测结果上报到 Uptime Kuma

pub mod reporter;

// 重新导出主要类型
pub use reporter::{HttpPushReporter, NoOpReporter, PushReporter};
