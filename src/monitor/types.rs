//! 监控项数据结构
//!
//! Uptime Kuma 监控项及其标签的定义

use serde::{Deserialize, Deserializer, Serialize};

/// 监控项标签
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// 标签名
    pub name: String,
    /// 标签值，`null` 视为空字符串
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Uptime Kuma 监控项定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorDefinition {
    /// 监控项ID
    #[serde(default)]
    pub id: u64,
    /// 显示名称
    pub name: String,
    /// 是否启用
    #[serde(default, deserialize_with = "flexible_bool")]
    pub active: bool,
    /// 是否处于维护状态
    #[serde(default, deserialize_with = "flexible_bool")]
    pub maintenance: bool,
    /// 监控类型，探针只处理 "push"
    #[serde(rename = "type")]
    pub monitor_type: String,
    /// 声明的检测间隔（秒）
    #[serde(default)]
    pub interval: u64,
    /// 推送令牌
    #[serde(rename = "pushToken", default, deserialize_with = "null_as_default")]
    pub push_token: String,
    /// 标签列表，保持服务端顺序
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
}

impl MonitorDefinition {
    /// 按名称查找标签值，同名标签取第一个
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    /// 声明的检测间隔（毫秒）
    pub fn interval_ms(&self) -> u64 {
        self.interval.saturating_mul(1000)
    }
}

/// 将 `null` 反序列化为默认值
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 兼容布尔值与 0/1 整数
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<BoolOrInt>::deserialize(deserializer)? {
        Some(BoolOrInt::Bool(value)) => value,
        Some(BoolOrInt::Int(value)) => value != 0,
        None => false,
    })
}
