//! 监控项来源
//!
//! 通过 Uptime Kuma 的 REST 接口拉取监控项列表

use crate::config::MonitorSourceConfig;
use crate::error::{Result, SourceError};
use crate::monitor::types::MonitorDefinition;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// 监控项来源trait
#[async_trait]
pub trait MonitorSource: Send + Sync {
    /// 拉取当前可见的监控项
    ///
    /// # 返回
    /// * `Ok(None)` - 服务端返回 null
    /// * `Ok(Some(monitors))` - 监控项列表
    async fn fetch_monitors(&self) -> Result<Option<Vec<MonitorDefinition>>>;
}

/// 监控项接口的响应体，兼容裸数组与 `{"monitors": [...]}` 两种形式
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MonitorsPayload {
    List(Vec<MonitorDefinition>),
    Wrapped { monitors: Option<Vec<MonitorDefinition>> },
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

/// 基于HTTP的监控项来源
pub struct HttpMonitorSource {
    /// HTTP客户端
    client: Client,
    /// 接口基础地址（不含末尾斜杠）
    base_url: String,
    /// 固定访问令牌
    token: Option<String>,
    /// 登录凭据
    credentials: Option<(String, String)>,
}

impl HttpMonitorSource {
    /// 根据配置创建监控项来源
    pub fn new(config: &MonitorSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(SourceError::RequestError)?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            credentials,
        })
    }

    /// 获取访问令牌：优先使用配置的令牌，否则用用户名密码登录
    async fn access_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }

        let Some((username, password)) = &self.credentials else {
            return Ok(None);
        };

        let url = format!("{}/login/access-token", self.base_url);
        debug!("登录监控项接口: {}", url);

        let response = self
            .client
            .post(&url)
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await
            .map_err(SourceError::RequestError)?;

        if !response.status().is_success() {
            return Err(SourceError::LoginFailed(response.status().as_u16()).into());
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(Some(token.access_token))
    }
}

#[async_trait]
impl MonitorSource for HttpMonitorSource {
    async fn fetch_monitors(&self) -> Result<Option<Vec<MonitorDefinition>>> {
        let url = format!("{}/monitors", self.base_url);
        let mut request = self.client.get(&url);

        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(SourceError::RequestError)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus(status.as_u16()).into());
        }

        let body = response.text().await.map_err(SourceError::RequestError)?;
        let payload: Option<MonitorsPayload> =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

        let monitors = match payload {
            Some(MonitorsPayload::List(monitors)) => Some(monitors),
            Some(MonitorsPayload::Wrapped { monitors }) => monitors,
            None => None,
        };

        debug!(
            "拉取到 {} 个监控项",
            monitors.as_ref().map(Vec::len).unwrap_or(0)
        );

        Ok(monitors)
    }
}
