//! ICMP Ping 检测器实现
//!
//! 同时提供探针启动门控使用的上游依赖连通性检测

use crate::error::{CheckError, Result};
use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use rand::random;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};
use tracing::debug;

/// 回显请求负载
const PING_PAYLOAD: [u8; 32] = [0; 32];

/// 解析主机名为IP地址，IP字面量直接返回
pub async fn resolve_host(host: &str) -> std::result::Result<IpAddr, CheckError> {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(CheckError::InvalidDestination("empty host".to_string()));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| CheckError::Resolve(format!("{host}: {e}")))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| CheckError::Resolve(format!("{host}: no addresses")))
}

/// 对主机发送一次 ICMP 回显请求，返回往返时间
pub async fn ping_host(host: &str, timeout: Duration) -> std::result::Result<Duration, CheckError> {
    let ip = resolve_host(host).await?;

    let config = match ip {
        IpAddr::V4(_) => Config::default(),
        IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
    };
    let client = Client::new(&config)
        .map_err(|e| CheckError::InvalidDestination(format!("ICMP socket: {e}")))?;

    let mut pinger = client.pinger(ip, PingIdentifier(random())).await;
    pinger.timeout(timeout);

    match pinger.ping(PingSequence(0), &PING_PAYLOAD).await {
        Ok((_reply, rtt)) => Ok(rtt),
        Err(surge_ping::SurgeError::Timeout { .. }) => Err(CheckError::Timeout),
        Err(e) => Err(CheckError::InvalidDestination(format!("{ip}: {e}"))),
    }
}

/// Ping 检测器
#[derive(Debug, Default)]
pub struct PingChecker;

impl PingChecker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HealthChecker for PingChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Ping
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        let start_time = Instant::now();
        match ping_host(endpoint.host(), endpoint.timeout).await {
            Ok(rtt) => CheckOutcome::up(
                endpoint,
                start_time.elapsed(),
                format!("Reply in {}ms", rtt.as_millis()),
            ),
            Err(CheckError::Timeout) => {
                CheckOutcome::down(endpoint, start_time.elapsed(), "Ping timeout")
            }
            Err(e) => CheckOutcome::down(endpoint, start_time.elapsed(), e.to_string()),
        }
    }
}

/// 上游依赖连通性检测
///
/// 每轮开始前调用，不可达时跳过整轮
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// 检测主机是否可达
    ///
    /// # 返回
    /// * `Ok(true)` - 可达
    /// * `Ok(false)` - 超时未响应
    /// * `Err` - 无法发起检测（名称解析失败、无法创建套接字等）
    async fn is_reachable(&self, host: &str, timeout: Duration) -> Result<bool>;
}

/// 基于 ICMP 的依赖检测
#[derive(Debug, Default)]
pub struct IcmpDependencyProbe;

#[async_trait]
impl DependencyProbe for IcmpDependencyProbe {
    async fn is_reachable(&self, host: &str, timeout: Duration) -> Result<bool> {
        match ping_host(host, timeout).await {
            Ok(rtt) => {
                debug!("依赖主机 {} 可达，往返 {}ms", host, rtt.as_millis());
                Ok(true)
            }
            Err(CheckError::Timeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ip_literals() {
        assert_eq!(
            resolve_host("127.0.0.1").await.unwrap(),
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            resolve_host("[::1]").await.unwrap(),
            "::1".parse::<IpAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let ip = resolve_host("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_resolve_empty_host() {
        assert!(matches!(
            resolve_host("  ").await,
            Err(CheckError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_destination_is_down() {
        let endpoint = Endpoint::new(
            "gw",
            CheckKind::Ping,
            "",
            Duration::from_millis(200),
            "up",
            "down",
        );

        let outcome = PingChecker::new().check(&endpoint).await;
        assert!(!outcome.success);
        assert!(outcome.detail.contains("empty host"));
    }

    #[tokio::test]
    async fn test_unresolvable_dependency_is_error() {
        let probe = IcmpDependencyProbe;
        let result = probe
            .is_reachable("no-such-host.invalid", Duration::from_millis(200))
            .await;
        assert!(result.is_err());
    }
}
