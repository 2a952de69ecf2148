//! 数据库连通性检测器实现
//!
//! 连接串形如 `{dsn}.{brand}`，去掉类型后缀后通过 sqlx 建立连接并 ping

use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 支持的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBrand {
    Postgres,
    MySql,
    MariaDb,
}

impl DatabaseBrand {
    /// 解析 Brand 标签值（不区分大小写）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "mariadb" => Some(Self::MariaDb),
            _ => None,
        }
    }

    /// 该类型可接受的 DSN 协议
    fn schemes(self) -> &'static [&'static str] {
        match self {
            Self::Postgres => &["postgres", "postgresql"],
            Self::MySql | Self::MariaDb => &["mysql", "mariadb"],
        }
    }
}

impl fmt::Display for DatabaseBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "Postgres"),
            Self::MySql => write!(f, "MySql"),
            Self::MariaDb => write!(f, "MariaDb"),
        }
    }
}

/// 解析后的连接目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub brand: DatabaseBrand,
    /// 可直接交给 sqlx 的连接串
    pub dsn: String,
}

/// 拆分并校验 `{dsn}.{brand}` 形式的连接串
pub fn parse_connection_string(
    connection_string: &str,
    brand: &str,
) -> std::result::Result<DatabaseTarget, String> {
    let brand_value = brand.trim();
    if brand_value.is_empty() {
        return Err("Missing Brand tag".to_string());
    }
    let parsed_brand = DatabaseBrand::parse(brand_value)
        .ok_or_else(|| format!("Unsupported brand: {brand_value}"))?;

    let dsn = connection_string
        .strip_suffix(brand_value)
        .and_then(|rest| rest.strip_suffix('.'))
        .ok_or_else(|| "Malformed connection string".to_string())?
        .trim();
    if dsn.is_empty() {
        return Err("Empty connection string".to_string());
    }

    // MariaDB 使用 MySQL 协议
    let (scheme, rest) = dsn
        .split_once("://")
        .ok_or_else(|| "Malformed connection string".to_string())?;
    let scheme = scheme.to_ascii_lowercase();
    if !parsed_brand.schemes().contains(&scheme.as_str()) {
        return Err(format!(
            "Connection string scheme {scheme} does not match brand {parsed_brand}"
        ));
    }

    let dsn = if scheme == "mariadb" {
        format!("mysql://{rest}")
    } else {
        dsn.to_string()
    };

    Ok(DatabaseTarget {
        brand: parsed_brand,
        dsn,
    })
}

/// 数据库检测器
#[derive(Debug)]
pub struct DatabaseChecker;

impl Default for DatabaseChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseChecker {
    pub fn new() -> Self {
        // 重复调用只生效一次
        sqlx::any::install_default_drivers();
        Self
    }

    async fn connect_and_ping(dsn: &str) -> std::result::Result<(), sqlx::Error> {
        let mut conn = AnyConnection::connect(dsn).await?;
        conn.ping().await?;
        conn.close().await
    }
}

#[async_trait]
impl HealthChecker for DatabaseChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Database
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        let Some(connection_string) = endpoint.connection_string.as_deref() else {
            return CheckOutcome::down(endpoint, Duration::ZERO, "Missing connection string");
        };

        let target = match parse_connection_string(connection_string, &endpoint.brand) {
            Ok(target) => target,
            Err(detail) => return CheckOutcome::down(endpoint, Duration::ZERO, detail),
        };

        let start_time = Instant::now();
        let result = timeout(endpoint.timeout, Self::connect_and_ping(&target.dsn)).await;
        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(())) => {
                CheckOutcome::up(endpoint, elapsed, format!("{} reachable", target.brand))
            }
            Ok(Err(e)) => {
                CheckOutcome::down(endpoint, elapsed, format!("{} error: {e}", target.brand))
            }
            Err(_) => CheckOutcome::down(endpoint, elapsed, "Database connection timeout"),
        }
    }
}
