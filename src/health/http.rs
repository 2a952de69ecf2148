//! HTTP检测器实现
//!
//! 发送HTTP请求，按状态码与关键字判定结果

use crate::error::{CheckError, Result};
use crate::health::{CheckOutcome, HealthChecker};
use crate::probe::endpoint::{CheckKind, Endpoint};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// HTTP检测器
pub struct HttpChecker {
    /// 默认客户端
    client: Client,
    /// 忽略证书错误的客户端（IgnoreSSL 标签）
    insecure_client: Client,
}

impl HttpChecker {
    /// 创建新的HTTP检测器
    pub fn new() -> Result<Self> {
        let client = Self::builder().build().map_err(CheckError::RequestError)?;
        let insecure_client = Self::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(CheckError::RequestError)?;

        Ok(Self {
            client,
            insecure_client,
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        Client::builder().user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
    }

    /// 解析HTTP方法，未设置时使用 GET
    fn method(endpoint: &Endpoint) -> std::result::Result<Method, String> {
        match endpoint.method.as_deref() {
            None => Ok(Method::GET),
            Some(raw) => Method::from_str(&raw.trim().to_uppercase())
                .map_err(|_| format!("Invalid HTTP method: {raw}")),
        }
    }

    /// 判断状态码是否视为成功
    ///
    /// 2xx/3xx 总是成功；设置了 SuccessStatusCode 时精确匹配也算成功
    pub fn is_success_status(status: StatusCode, success_status_code: i32) -> bool {
        status.is_success()
            || status.is_redirection()
            || (success_status_code >= 0 && i32::from(status.as_u16()) == success_status_code)
    }

    fn describe_status(status: StatusCode) -> String {
        format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_builder() {
            "Invalid request".to_string()
        } else if error.is_decode() || error.is_body() {
            "Response decode error".to_string()
        } else {
            let error_str = error.to_string();
            if error_str.contains("dns") || error_str.contains("DNS") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {error_str}")
            }
        }
    }
}

#[async_trait]
impl HealthChecker for HttpChecker {
    fn kind(&self) -> CheckKind {
        CheckKind::Http
    }

    async fn check(&self, endpoint: &Endpoint) -> CheckOutcome {
        if endpoint.destination.trim().is_empty() {
            return CheckOutcome::down(endpoint, Duration::ZERO, "Empty destination");
        }

        let method = match Self::method(endpoint) {
            Ok(method) => method,
            Err(detail) => return CheckOutcome::down(endpoint, Duration::ZERO, detail),
        };

        let client = if endpoint.ignore_tls_errors {
            &self.insecure_client
        } else {
            &self.client
        };

        let start_time = Instant::now();
        let response = client
            .request(method, &endpoint.destination)
            .timeout(endpoint.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                return CheckOutcome::down(
                    endpoint,
                    start_time.elapsed(),
                    Self::format_request_error(&e),
                )
            }
        };

        let status = response.status();
        let body = if endpoint.keyword.is_empty() {
            Ok(String::new())
        } else {
            response.text().await
        };
        let elapsed = start_time.elapsed();

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                return CheckOutcome::down(endpoint, elapsed, Self::format_request_error(&e))
                    .with_status_code(status.as_u16())
            }
        };

        let outcome = if !Self::is_success_status(status, endpoint.success_status_code) {
            CheckOutcome::down(endpoint, elapsed, Self::describe_status(status))
        } else if !endpoint.keyword.is_empty() && !body.contains(&endpoint.keyword) {
            CheckOutcome::down(endpoint, elapsed, "Keyword not found")
        } else {
            CheckOutcome::up(endpoint, elapsed, Self::describe_status(status))
        };

        outcome.with_status_code(status.as_u16())
    }
}
