//! 检测结果数据结构
//!
//! 定义单次检测的结果类型

use crate::probe::endpoint::{CheckKind, Endpoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单次检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// 来源监控项名称
    pub monitor_name: String,
    /// 检测类型
    pub kind: CheckKind,
    /// 目标地址
    pub destination: String,
    /// 检测时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否成功
    pub success: bool,
    /// 耗时
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// 状态或错误描述，会随失败推送上报
    pub detail: String,
    /// HTTP状态码（如果适用）
    pub status_code: Option<u16>,
}

impl CheckOutcome {
    /// 创建新的检测结果
    ///
    /// # 参数
    /// * `endpoint` - 被检测的端点
    /// * `success` - 是否成功
    /// * `elapsed` - 耗时
    /// * `detail` - 状态或错误描述
    pub fn new(
        endpoint: &Endpoint,
        success: bool,
        elapsed: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            monitor_name: endpoint.monitor_name.clone(),
            kind: endpoint.kind.clone(),
            destination: endpoint.destination.clone(),
            timestamp: Utc::now(),
            success,
            elapsed,
            detail: detail.into(),
            status_code: None,
        }
    }

    /// 成功结果
    pub fn up(endpoint: &Endpoint, elapsed: Duration, detail: impl Into<String>) -> Self {
        Self::new(endpoint, true, elapsed, detail)
    }

    /// 失败结果
    pub fn down(endpoint: &Endpoint, elapsed: Duration, detail: impl Into<String>) -> Self {
        Self::new(endpoint, false, elapsed, detail)
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Duration 以毫秒序列化
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new(
            "api",
            CheckKind::Http,
            "https://example.com",
            Duration::from_secs(1),
            "up",
            "down",
        )
    }

    #[test]
    fn test_outcome_builders() {
        let outcome = CheckOutcome::up(&endpoint(), Duration::from_millis(42), "HTTP 200 OK")
            .with_status_code(200);

        assert!(outcome.success);
        assert_eq!(outcome.elapsed_ms(), 42);
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.monitor_name, "api");

        let failed = CheckOutcome::down(&endpoint(), Duration::ZERO, "Request timeout");
        assert!(!failed.success);
        assert_eq!(failed.detail, "Request timeout");
    }

    #[test]
    fn test_elapsed_serialized_as_millis() {
        let outcome = CheckOutcome::up(&endpoint(), Duration::from_millis(1500), "ok");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["elapsed"], 1500);
        assert_eq!(json["kind"], "Http");
    }
}
