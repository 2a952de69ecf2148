//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Kuma Probe 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 健康检测相关错误
    #[error("健康检测错误: {0}")]
    Check(#[from] CheckError),

    /// 推送上报相关错误
    #[error("推送错误: {0}")]
    Push(#[from] PushError),

    /// 监控项拉取错误
    #[error("监控项拉取错误: {0}")]
    Source(#[from] SourceError),

    /// 未配置上游依赖主机，无法启动
    #[error("未配置上游依赖主机 (probe.up_dependency)")]
    MissingUpDependency,

    /// 监控项缺少必需的 Type 标签
    #[error("监控项 {monitor} 缺少 Type 标签")]
    MissingTypeTag { monitor: String },

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 健康检测错误类型
///
/// 检测器内部使用，最终都会被转换为失败的 `CheckOutcome`
#[derive(Error, Debug)]
pub enum CheckError {
    /// HTTP请求错误
    #[error("HTTP请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 超时错误
    #[error("请求超时")]
    Timeout,

    /// 目标地址无效
    #[error("无效的目标地址: {0}")]
    InvalidDestination(String),

    /// 名称解析失败
    #[error("无法解析主机: {0}")]
    Resolve(String),

    /// TLS 握手或证书解析失败
    #[error("TLS错误: {0}")]
    Tls(String),

    /// WHOIS 查询失败
    #[error("WHOIS查询失败: {0}")]
    Whois(String),
}

/// 推送错误类型
#[derive(Error, Debug)]
pub enum PushError {
    /// 推送地址无效
    #[error("无效的推送地址: {0}")]
    InvalidUri(String),

    /// HTTP请求错误
    #[error("推送请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 服务端拒绝
    #[error("推送被拒绝: {status} {message}")]
    Rejected { status: u16, message: String },
}

/// 监控项拉取错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP请求错误
    #[error("请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 登录失败
    #[error("登录失败: HTTP {0}")]
    LoginFailed(u16),

    /// 非成功状态码
    #[error("拉取监控项失败: HTTP {0}")]
    UnexpectedStatus(u16),

    /// 响应体解析失败
    #[error("响应解析失败: {0}")]
    Decode(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ProbeError>;
