//! 检测端点
//!
//! 由监控项解析得到的、可直接执行的检测描述

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 证书/域名到期告警阈值的默认天数
pub const DEFAULT_EXPIRATION_DAYS: i64 = 3;

/// 未设置期望状态码时的取值
pub const DEFAULT_SUCCESS_STATUS_CODE: i32 = -1;

/// 检测类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    Ping,
    Http,
    Tcp,
    Certificate,
    Database,
    Domain,
    /// 探针尚不支持的类型，原样保留
    Unrecognized(String),
}

impl CheckKind {
    /// 解析 Type 标签的值（不区分大小写）
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ping" => CheckKind::Ping,
            "http" => CheckKind::Http,
            "tcp" => CheckKind::Tcp,
            "certificate" => CheckKind::Certificate,
            "database" => CheckKind::Database,
            "domain" => CheckKind::Domain,
            _ => CheckKind::Unrecognized(value.to_string()),
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Ping => write!(f, "Ping"),
            CheckKind::Http => write!(f, "Http"),
            CheckKind::Tcp => write!(f, "Tcp"),
            CheckKind::Certificate => write!(f, "Certificate"),
            CheckKind::Database => write!(f, "Database"),
            CheckKind::Domain => write!(f, "Domain"),
            CheckKind::Unrecognized(raw) => write!(f, "Unrecognized({raw})"),
        }
    }
}

/// 检测端点
///
/// 每轮从监控项重新构造，除数据库连接串外构造后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// 来源监控项名称
    pub monitor_name: String,
    /// 检测类型
    pub kind: CheckKind,
    /// 目标地址
    pub destination: String,
    /// 超时时间
    pub timeout: Duration,
    /// 响应体需包含的关键字，空字符串表示不检查
    pub keyword: String,
    /// HTTP方法
    pub method: Option<String>,
    /// 期望的成功状态码，-1 表示使用协议默认语义
    pub success_status_code: i32,
    /// 数据库类型
    pub brand: String,
    /// 端口，0 表示未设置
    pub port: u16,
    /// 域名
    pub domain: String,
    /// 到期告警阈值（天）
    pub certificate_expiration_days: i64,
    /// 是否忽略TLS证书错误
    pub ignore_tls_errors: bool,
    /// 数据库连接串，仅在分发前为 Database 类型填充
    pub connection_string: Option<String>,
    /// 成功推送地址
    pub push_up_uri: String,
    /// 失败推送地址
    pub push_down_uri: String,
}

impl Endpoint {
    /// 创建带默认值的端点
    pub fn new(
        monitor_name: impl Into<String>,
        kind: CheckKind,
        destination: impl Into<String>,
        timeout: Duration,
        push_up_uri: impl Into<String>,
        push_down_uri: impl Into<String>,
    ) -> Self {
        Self {
            monitor_name: monitor_name.into(),
            kind,
            destination: destination.into(),
            timeout,
            keyword: String::new(),
            method: None,
            success_status_code: DEFAULT_SUCCESS_STATUS_CODE,
            brand: String::new(),
            port: 0,
            domain: String::new(),
            certificate_expiration_days: DEFAULT_EXPIRATION_DAYS,
            ignore_tls_errors: false,
            connection_string: None,
            push_up_uri: push_up_uri.into(),
            push_down_uri: push_down_uri.into(),
        }
    }

    /// 目标主机名：去掉协议、路径和端口
    pub fn host(&self) -> &str {
        let without_scheme = self
            .destination
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.destination);
        let authority = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(without_scheme);

        // [IPv6]:port
        if let Some(rest) = authority.strip_prefix('[') {
            return rest.split(']').next().unwrap_or(rest);
        }

        match authority.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
            _ => authority,
        }
    }
}
