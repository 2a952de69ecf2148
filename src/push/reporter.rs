//! 推送上报模块
//!
//! 通过 Uptime Kuma 的 push 接口上报检测结果

use crate::error::{PushError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// 推送上报trait
#[async_trait]
pub trait PushReporter: Send + Sync {
    /// 上报成功
    ///
    /// # 参数
    /// * `uri` - 成功推送地址（以 `ping=` 结尾）
    /// * `elapsed_ms` - 检测耗时
    async fn push_success(&self, uri: &str, elapsed_ms: u64) -> Result<()>;

    /// 上报失败
    ///
    /// # 参数
    /// * `uri` - 失败推送地址（以 `ping=` 结尾）
    /// * `elapsed_ms` - 检测耗时
    /// * `detail` - 失败原因
    async fn push_failure(&self, uri: &str, elapsed_ms: u64, detail: &str) -> Result<()>;
}

/// push 接口的响应体
#[derive(Debug, Deserialize)]
struct PushResponse {
    ok: bool,
    #[serde(default)]
    msg: Option<String>,
}

/// 基于HTTP的推送上报器
pub struct HttpPushReporter {
    client: Client,
}

impl HttpPushReporter {
    /// 创建新的推送上报器
    ///
    /// # 参数
    /// * `timeout` - 推送请求超时时间
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(PushError::RequestError)?;

        Ok(Self { client })
    }

    /// 构建成功推送地址
    pub fn success_url(uri: &str, elapsed_ms: u64) -> Result<Url> {
        Url::parse(&format!("{uri}{elapsed_ms}"))
            .map_err(|e| PushError::InvalidUri(format!("{uri}: {e}")).into())
    }

    /// 构建失败推送地址，附带 msg 参数
    pub fn failure_url(uri: &str, elapsed_ms: u64, detail: &str) -> Result<Url> {
        let mut url = Self::success_url(uri, elapsed_ms)?;
        url.query_pairs_mut().append_pair("msg", detail);
        Ok(url)
    }

    /// 发送推送请求并检查响应
    async fn send(&self, url: Url) -> Result<()> {
        debug!("推送检测结果: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PushError::RequestError)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Uptime Kuma 在令牌无效时返回 404 与 {"ok": false, "msg": ...}
        let parsed = serde_json::from_str::<PushResponse>(&body).ok();
        if !status.is_success() || parsed.as_ref().is_some_and(|r| !r.ok) {
            let message = parsed.and_then(|r| r.msg).unwrap_or(body);
            return Err(PushError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl PushReporter for HttpPushReporter {
    async fn push_success(&self, uri: &str, elapsed_ms: u64) -> Result<()> {
        let url = Self::success_url(uri, elapsed_ms)?;
        self.send(url).await
    }

    async fn push_failure(&self, uri: &str, elapsed_ms: u64, detail: &str) -> Result<()> {
        let url = Self::failure_url(uri, elapsed_ms, detail)?;
        self.send(url).await
    }
}

/// 空的推送上报器（用于一次性检测或测试）
pub struct NoOpReporter;

#[async_trait]
impl PushReporter for NoOpReporter {
    async fn push_success(&self, _uri: &str, _elapsed_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn push_failure(&self, _uri: &str, _elapsed_ms: u64, _detail: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_success_url() {
        let url = HttpPushReporter::success_url(
            "https://kuma.example.com/api/push/abc?status=up&msg=OK&ping=",
            123,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://kuma.example.com/api/push/abc?status=up&msg=OK&ping=123"
        );
    }

    #[test]
    fn test_failure_url_encodes_detail() {
        let url = HttpPushReporter::failure_url(
            "https://kuma.example.com/api/push/abc?status=down&ping=",
            7,
            "Keyword not found & more",
        )
        .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("ping".to_string(), "7".to_string())));
        assert!(pairs.contains(&("msg".to_string(), "Keyword not found & more".to_string())));
    }

    #[test]
    fn test_invalid_uri() {
        let err = HttpPushReporter::success_url("not a url", 1).unwrap_err();
        assert!(err.to_string().contains("无效的推送地址"));
    }

    #[tokio::test]
    async fn test_push_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/push/abc")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "up".into()),
                Matcher::UrlEncoded("msg".into(), "OK".into()),
                Matcher::UrlEncoded("ping".into(), "55".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let reporter = HttpPushReporter::new(Duration::from_secs(5)).unwrap();
        let uri = format!("{}/api/push/abc?status=up&msg=OK&ping=", server.url());
        reporter.push_success(&uri, 55).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_push_failure_with_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/push/abc")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "down".into()),
                Matcher::UrlEncoded("ping".into(), "10".into()),
                Matcher::UrlEncoded("msg".into(), "HTTP 500 Internal Server Error".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let reporter = HttpPushReporter::new(Duration::from_secs(5)).unwrap();
        let uri = format!("{}/api/push/abc?status=down&ping=", server.url());
        reporter
            .push_failure(&uri, 10, "HTTP 500 Internal Server Error")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_push_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/push/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"ok":false,"msg":"Monitor not found or not active."}"#)
            .create_async()
            .await;

        let reporter = HttpPushReporter::new(Duration::from_secs(5)).unwrap();
        let uri = format!("{}/api/push/missing?status=up&msg=OK&ping=", server.url());
        let err = reporter.push_success(&uri, 1).await.unwrap_err();
        assert!(err.to_string().contains("Monitor not found"));
    }
}
