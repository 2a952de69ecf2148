//! 域名到期检测器实现
//!
//! 通过 WHOIS（TCP 43）查询域名到期时间：先向根服务器查询顶级域的
//! WHOIS 服务器，再向该服务器查询域名本身

use crate::error::CheckError;
use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// IANA 根 WHOIS 服务器
pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org";

/// WHOIS 端口
pub const WHOIS_PORT: u16 = 43;

/// 响应大小上限
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

const SECONDS_PER_DAY: i64 = 86_400;

const REFERRAL_PATTERN: &str =
    r"(?im)^\s*(?:refer|whois|registrar whois server)\s*:\s*(\S+)\s*$";

const EXPIRY_PATTERN: &str = r"(?im)^\s*(?:registry expiry date|registrar registration expiration date|expiration date|expiry date|expiration time|expire date|expires on|expires|paid-till|renewal date)\s*:\s*(.+?)\s*$";

/// 编译 WHOIS 解析用的正则表达式
fn compile_pattern(pattern: &str) -> Result<Regex, CheckError> {
    Regex::new(pattern).map_err(|e| CheckError::Whois(format!("正则表达式错误: {e}")))
}

/// WHOIS 响应解析器
#[derive(Debug, Clone)]
pub struct WhoisParser {
    referral: Regex,
    expiry: Regex,
}

impl WhoisParser {
    pub fn new() -> Result<Self, CheckError> {
        Ok(Self {
            referral: compile_pattern(REFERRAL_PATTERN)?,
            expiry: compile_pattern(EXPIRY_PATTERN)?,
        })
    }

    /// 从根服务器响应中提取下一跳 WHOIS 服务器
    pub fn referral(&self, response: &str) -> Option<String> {
        self.referral
            .captures(response)
            .map(|caps| caps[1].trim_end_matches('/').to_ascii_lowercase())
    }

    /// 从 WHOIS 响应中提取到期时间
    pub fn expiry(&self, response: &str) -> Option<DateTime<Utc>> {
        self.expiry
            .captures_iter(response)
            .find_map(|caps| parse_whois_date(&caps[1]))
    }
}

/// 解析 WHOIS 中常见的日期格式
fn parse_whois_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    // 只取第一个字段，兼容 "2027-03-15 (YYYY-MM-DD)" 之类的写法
    let first = value.split_whitespace().next()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(first) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d", "%Y%m%d",
    ];
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(first, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// WHOIS 客户端
#[derive(Debug, Clone)]
pub struct WhoisClient {
    root_server: String,
    port: u16,
    parser: WhoisParser,
}

impl WhoisClient {
    pub fn new(root_server: impl Into<String>, port: u16) -> Result<Self, CheckError> {
        Ok(Self {
            root_server: root_server.into(),
            port,
            parser: WhoisParser::new()?,
        })
    }

    /// 向指定服务器发送一次查询
    async fn query(&self, server: &str, query: &str) -> Result<String, CheckError> {
        let mut stream = TcpStream::connect((server, self.port))
            .await
            .map_err(|e| CheckError::Whois(format!("connect {server}: {e}")))?;

        stream
            .write_all(format!("{query}\r\n").as_bytes())
            .await
            .map_err(|e| CheckError::Whois(format!("{server}: {e}")))?;

        let mut buf = Vec::new();
        stream
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CheckError::Whois(format!("{server}: {e}")))?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// 查询域名到期时间
    pub async fn lookup_expiry(&self, domain: &str) -> Result<DateTime<Utc>, CheckError> {
        let root_response = self.query(&self.root_server, domain).await?;

        let response = match self.parser.referral(&root_response) {
            Some(server) if server != self.root_server => {
                debug!("域名 {} 的 WHOIS 服务器: {}", domain, server);
                self.query(&server, domain).await?
            }
            _ => root_response,
        };

        self.parser
            .expiry(&response)
            .ok_or_else(|| CheckError::Whois(format!("no expiry date for {domain}")))
    }
}

/// 域名检测器
#[derive(Debug)]
pub struct DomainChecker {
    whois: WhoisClient,
}

impl DomainChecker {
    /// 使用 IANA 根服务器创建检测器
    pub fn new() -> crate::error::Result<Self> {
        Ok(Self::with_client(WhoisClient::new(
            DEFAULT_WHOIS_SERVER,
            WHOIS_PORT,
        )?))
    }

    /// 使用自定义 WHOIS 客户端
    pub fn with_client(whois: WhoisClient) -> Self {
        Self { whois }
    }

    /// 待查询的域名：优先 Domain 标签，否则取目标主机
    pub fn domain(endpoint: &Endpoint) -> &str {
        let domain = endpoint.domain.trim();
        if domain.is_empty() {
            endpoint.host()
        } else {
            domain
        }
    }
}

#[async_trait]
impl HealthChecker for DomainChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Domain
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        let domain = Self::domain(endpoint);
        if domain.is_empty() {
            return CheckOutcome::down(endpoint, Duration::ZERO, "Empty domain");
        }

        let start_time = Instant::now();
        let result = timeout(endpoint.timeout, self.whois.lookup_expiry(domain)).await;
        let elapsed = start_time.elapsed();

        let expiry = match result {
            Ok(Ok(expiry)) => expiry,
            Ok(Err(e)) => return CheckOutcome::down(endpoint, elapsed, e.to_string()),
            Err(_) => return CheckOutcome::down(endpoint, elapsed, "WHOIS timeout"),
        };

        let days_left = (expiry - Utc::now()).num_seconds().div_euclid(SECONDS_PER_DAY);
        let threshold = endpoint.certificate_expiration_days;
        if days_left < threshold {
            CheckOutcome::down(
                endpoint,
                elapsed,
                format!("Domain {domain} expires in {days_left} days (threshold {threshold})"),
            )
        } else {
            CheckOutcome::up(
                endpoint,
                elapsed,
                format!("Domain {domain} valid for {days_left} days"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use tokio::net::TcpListener;

    fn parser() -> WhoisParser {
        WhoisParser::new().unwrap()
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = compile_pattern("(unclosed").unwrap_err();
        assert!(matches!(err, CheckError::Whois(ref msg) if msg.contains("正则表达式错误")));
        assert!(WhoisParser::new().is_ok());
    }

    #[test]
    fn test_parse_referral() {
        let iana = "% IANA WHOIS server\n\ndomain:       COM\n\nrefer:        whois.verisign-grs.com\n";
        assert_eq!(
            parser().referral(iana).as_deref(),
            Some("whois.verisign-grs.com")
        );
        assert!(parser().referral("domain: EXAMPLE\nstatus: ACTIVE\n").is_none());
    }

    #[test]
    fn test_parse_expiry_formats() {
        let cases = [
            (
                "Registry Expiry Date: 2028-09-14T04:00:00Z",
                Utc.with_ymd_and_hms(2028, 9, 14, 4, 0, 0).unwrap(),
            ),
            (
                "paid-till:     2027-03-04T21:00:00Z",
                Utc.with_ymd_and_hms(2027, 3, 4, 21, 0, 0).unwrap(),
            ),
            (
                "Expiry date:  15-Mar-2027",
                Utc.with_ymd_and_hms(2027, 3, 15, 0, 0, 0).unwrap(),
            ),
            (
                "expires:      2027-05-01 (YYYY-MM-DD)",
                Utc.with_ymd_and_hms(2027, 5, 1, 0, 0, 0).unwrap(),
            ),
            (
                "Expiration Time: 2027-11-30 23:59:59",
                Utc.with_ymd_and_hms(2027, 11, 30, 23, 59, 59).unwrap(),
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(parser().expiry(response), Some(expected), "{response}");
        }
    }

    #[test]
    fn test_parse_expiry_skips_unparseable_lines() {
        let response = "Expiration Date: see registrar\nRegistry Expiry Date: 2029-01-02T00:00:00Z\n";
        assert_eq!(parser().expiry(response).map(|d| d.year()), Some(2029));
        assert!(parser().expiry("Creation Date: 2001-01-01").is_none());
    }

    #[test]
    fn test_domain_falls_back_to_destination() {
        let mut ep = Endpoint::new(
            "dom",
            CheckKind::Domain,
            "https://www.example.com/login",
            Duration::from_secs(1),
            "up",
            "down",
        );
        assert_eq!(DomainChecker::domain(&ep), "www.example.com");

        ep.domain = "example.com".into();
        assert_eq!(DomainChecker::domain(&ep), "example.com");
    }

    /// 本地 WHOIS 服务：第一次连接返回转介，第二次返回域名信息
    async fn spawn_whois(expiry: DateTime<Utc>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            for round in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 256];
                let n = socket.read(&mut buf).await.unwrap();
                assert!(String::from_utf8_lossy(&buf[..n]).starts_with("example.test"));

                let body = if round == 0 {
                    "refer: localhost\n".to_string()
                } else {
                    format!(
                        "Domain Name: EXAMPLE.TEST\nRegistry Expiry Date: {}\n",
                        expiry.to_rfc3339()
                    )
                };
                socket.write_all(body.as_bytes()).await.unwrap();
            }
        });

        port
    }

    #[tokio::test]
    async fn test_lookup_follows_referral() {
        let expiry = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        let port = spawn_whois(expiry).await;

        let client = WhoisClient::new("127.0.0.1", port).unwrap();
        assert_eq!(client.lookup_expiry("example.test").await.unwrap(), expiry);
    }

    #[tokio::test]
    async fn test_domain_check_against_threshold() {
        let expiry = Utc::now() + chrono::Duration::days(30);
        let port = spawn_whois(expiry).await;
        let checker = DomainChecker::with_client(WhoisClient::new("127.0.0.1", port).unwrap());

        let mut ep = Endpoint::new(
            "dom",
            CheckKind::Domain,
            "",
            Duration::from_secs(5),
            "up",
            "down",
        );
        ep.domain = "example.test".into();
        ep.certificate_expiration_days = 60;

        let outcome = checker.check(&ep).await;
        assert!(!outcome.success);
        assert!(outcome.detail.contains("threshold 60"));
    }

    #[tokio::test]
    async fn test_empty_domain_is_down() {
        let ep = Endpoint::new(
            "dom",
            CheckKind::Domain,
            "",
            Duration::from_secs(1),
            "up",
            "down",
        );
        let outcome = DomainChecker::new().unwrap().check(&ep).await;
        assert!(!outcome.success);
        assert_eq!(outcome.detail, "Empty domain");
    }
}
