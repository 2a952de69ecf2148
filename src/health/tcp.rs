//! TCP 端口检测器实现

use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// TCP 检测器：能在超时内建立连接即视为成功
#[derive(Debug, Default)]
pub struct TcpChecker;

impl TcpChecker {
    pub fn new() -> Self {
        Self
    }

    /// 连接目标：设置了端口时使用 `host:port`，否则目标本身须带端口
    pub fn target(endpoint: &Endpoint) -> Option<String> {
        let destination = endpoint.destination.trim();
        if destination.is_empty() {
            return None;
        }

        if endpoint.port == 0 {
            return Some(destination.to_string());
        }

        let host = endpoint.host();
        Some(if host.contains(':') {
            format!("[{host}]:{}", endpoint.port)
        } else {
            format!("{host}:{}", endpoint.port)
        })
    }
}

#[async_trait]
impl HealthChecker for TcpChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Tcp
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        let Some(target) = Self::target(endpoint) else {
            return CheckOutcome::down(endpoint, Duration::ZERO, "Empty destination");
        };

        let start_time = Instant::now();
        let result = timeout(endpoint.timeout, TcpStream::connect(target.as_str())).await;
        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_stream)) => CheckOutcome::up(endpoint, elapsed, "Connected"),
            Ok(Err(e)) => CheckOutcome::down(endpoint, elapsed, format!("Connection failed: {e}")),
            Err(_) => CheckOutcome::down(endpoint, elapsed, "Connection timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn endpoint(destination: &str, port: u16) -> Endpoint {
        let mut ep = Endpoint::new(
            "tcp",
            CheckKind::Tcp,
            destination,
            Duration::from_secs(2),
            "up",
            "down",
        );
        ep.port = port;
        ep
    }

    #[test]
    fn test_target() {
        assert_eq!(
            TcpChecker::target(&endpoint("db.internal", 5432)).as_deref(),
            Some("db.internal:5432")
        );
        assert_eq!(
            TcpChecker::target(&endpoint("db.internal:6379", 0)).as_deref(),
            Some("db.internal:6379")
        );
        assert_eq!(
            TcpChecker::target(&endpoint("::1", 22)).as_deref(),
            Some("[::1]:22")
        );
        assert!(TcpChecker::target(&endpoint(" ", 80)).is_none());
    }

    #[tokio::test]
    async fn test_open_port_is_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let outcome = TcpChecker::new().check(&endpoint("127.0.0.1", port)).await;
        assert!(outcome.success);
        assert_eq!(outcome.detail, "Connected");
    }

    #[tokio::test]
    async fn test_closed_port_is_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = TcpChecker::new().check(&endpoint("127.0.0.1", port)).await;
        assert!(!outcome.success);
        assert!(outcome.detail.starts_with("Connection failed"));
    }

    #[tokio::test]
    async fn test_missing_port_is_down() {
        let outcome = TcpChecker::new().check(&endpoint("127.0.0.1", 0)).await;
        assert!(!outcome.success);
    }
}
