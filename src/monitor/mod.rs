//! 监控项模块
//!
//! 提供监控项数据结构和拉取接口

pub mod source;
pub mod types;

// 重新导出主要类型
pub use source::{HttpMonitorSource, MonitorSource};
pub use types::{MonitorDefinition, Tag};
