//! 配置数据结构定义
//!
//! 定义探针的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 探针配置项
    pub probe: ProbeConfig,
    /// 监控项来源配置
    pub monitor_source: MonitorSourceConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 探针配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// 探针名称，与监控项的 Probe 标签匹配
    pub name: String,
    /// 上游依赖主机，每轮检测前 ping 一次
    #[serde(default)]
    pub up_dependency: String,
    /// 两轮检测之间的间隔（毫秒）
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// 依赖 ping 与单项检测的超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Uptime Kuma 基础地址，推送地址由此拼接
    pub url: String,
    /// 数据库连接串模板
    #[serde(default)]
    pub connection_strings: String,
}

impl ProbeConfig {
    /// 轮询间隔
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// 超时时间
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 监控项来源配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSourceConfig {
    /// REST 接口基础地址，监控项位于 `{url}/monitors`
    pub url: String,
    /// 访问令牌（优先于用户名密码）
    pub token: Option<String>,
    /// 登录用户名
    pub username: Option<String>,
    /// 登录密码
    pub password: Option<String>,
    /// 请求超时时间（毫秒）
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl MonitorSourceConfig {
    /// 请求超时时间，推送请求也使用该值
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否使用JSON格式
    #[serde(default)]
    pub json_format: bool,
    /// 日志文件路径（可选，不设置则输出到控制台）
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

// 默认值函数
fn default_delay_ms() -> u64 {
    60_000
}
fn default_timeout_ms() -> u64 {
    1_000
}
fn default_source_timeout_ms() -> u64 {
    10_000
}
fn default_log_level() -> String {
    "info".to_string()
}

/// 配置验证函数
///
/// 上游依赖主机为空不在此处拒绝，由探针启动时处理
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let probe = &config.probe;

    if probe.name.trim().is_empty() {
        return Err("探针名称不能为空".to_string());
    }

    if probe.delay_ms == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if probe.timeout_ms == 0 {
        return Err("超时时间不能为0".to_string());
    }

    if !probe.url.starts_with("http://") && !probe.url.starts_with("https://") {
        return Err(format!("Uptime Kuma 地址格式无效: {}", probe.url));
    }

    if !probe.url.ends_with('/') {
        return Err(format!("Uptime Kuma 地址必须以 / 结尾: {}", probe.url));
    }

    let source = &config.monitor_source;
    if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
        return Err(format!("监控项来源地址格式无效: {}", source.url));
    }

    if source.timeout_ms == 0 {
        return Err("监控项来源超时时间不能为0".to_string());
    }

    if source.username.is_some() != source.password.is_some() {
        return Err("监控项来源的用户名和密码必须同时配置".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.logging.level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.logging.level, valid_log_levels
        ));
    }

    Ok(())
}
