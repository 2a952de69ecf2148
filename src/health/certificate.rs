//! TLS 证书到期检测器实现
//!
//! 与目标完成 TLS 握手，读取叶子证书的 notAfter 并与告警阈值比较

use crate::error::{CheckError, Result};
use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// 未设置 Port 标签时使用的端口
const DEFAULT_TLS_PORT: u16 = 443;

const SECONDS_PER_DAY: i64 = 86_400;

/// 证书检测器
pub struct CertificateChecker {
    connector: TlsConnector,
}

impl CertificateChecker {
    /// 使用系统根证书创建检测器
    pub fn new() -> Result<Self> {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            warn!("加载系统根证书出错: {}", e);
        }

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!("已加载 {} 个系统根证书，忽略 {} 个", added, ignored);

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| CheckError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// 握手并返回叶子证书的 DER 编码
    async fn fetch_leaf_certificate(
        &self,
        host: &str,
        port: u16,
    ) -> std::result::Result<Vec<u8>, CheckError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| CheckError::InvalidDestination(format!("{host}: {e}")))?;

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CheckError::Tls(format!("connect {host}:{port}: {e}")))?;
        let tls = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(|e| CheckError::Tls(e.to_string()))?;

        tls.get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|leaf| leaf.as_ref().to_vec())
            .ok_or_else(|| CheckError::Tls("no peer certificate".to_string()))
    }

    /// 解析证书的到期时间（Unix 秒）
    pub fn not_after(der: &[u8]) -> std::result::Result<i64, CheckError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| CheckError::Tls(format!("invalid certificate: {e}")))?;
        Ok(cert.validity().not_after.timestamp())
    }

    /// 距到期的整天数，已过期为负数
    pub fn days_left(not_after: i64, now: DateTime<Utc>) -> i64 {
        (not_after - now.timestamp()).div_euclid(SECONDS_PER_DAY)
    }

    /// 按剩余天数与阈值判定
    fn judge(endpoint: &Endpoint, elapsed: Duration, days_left: i64) -> CheckOutcome {
        let threshold = endpoint.certificate_expiration_days;
        if days_left < 0 {
            CheckOutcome::down(endpoint, elapsed, "Certificate expired")
        } else if days_left < threshold {
            CheckOutcome::down(
                endpoint,
                elapsed,
                format!("Certificate expires in {days_left} days (threshold {threshold})"),
            )
        } else {
            CheckOutcome::up(
                endpoint,
                elapsed,
                format!("Certificate valid for {days_left} days"),
            )
        }
    }
}

#[async_trait]
impl HealthChecker for CertificateChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Certificate
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        let host = endpoint.host();
        if host.is_empty() {
            return CheckOutcome::down(endpoint, Duration::ZERO, "Empty destination");
        }
        let port = if endpoint.port == 0 {
            DEFAULT_TLS_PORT
        } else {
            endpoint.port
        };

        let start_time = Instant::now();
        let result = timeout(endpoint.timeout, self.fetch_leaf_certificate(host, port)).await;
        let elapsed = start_time.elapsed();

        let der = match result {
            Ok(Ok(der)) => der,
            Ok(Err(e)) => return CheckOutcome::down(endpoint, elapsed, e.to_string()),
            Err(_) => return CheckOutcome::down(endpoint, elapsed, "TLS handshake timeout"),
        };

        match Self::not_after(&der) {
            Ok(not_after) => {
                Self::judge(endpoint, elapsed, Self::days_left(not_after, Utc::now()))
            }
            Err(e) => CheckOutcome::down(endpoint, elapsed, e.to_string()),
        }
    }
}
