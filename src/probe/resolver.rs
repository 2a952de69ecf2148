//! 端点解析器
//!
//! 将监控项过滤并转换为本探针需要执行的检测端点

use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::monitor::MonitorDefinition;
use crate::probe::endpoint::{
    CheckKind, Endpoint, DEFAULT_EXPIRATION_DAYS, DEFAULT_SUCCESS_STATUS_CODE,
};
use std::str::FromStr;
use tracing::{debug, warn};

/// 监控项类型必须为 push
const PUSH_MONITOR_TYPE: &str = "push";

/// 标签名
pub mod tags {
    pub const PROBE: &str = "Probe";
    pub const TYPE: &str = "Type";
    pub const ADDRESS: &str = "Address";
    pub const KEYWORD: &str = "Keyword";
    pub const METHOD: &str = "Method";
    pub const SUCCESS_STATUS_CODE: &str = "SuccessStatusCode";
    pub const BRAND: &str = "Brand";
    pub const PORT: &str = "Port";
    pub const DOMAIN: &str = "Domain";
    pub const CERTIFICATE_EXPIRATION: &str = "CertificateExpiration";
    pub const IGNORE_SSL: &str = "IgnoreSSL";
}

/// 监控项声明的间隔小于探针轮询间隔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalWarning {
    /// 监控项名称
    pub monitor: String,
    /// 监控项声明的间隔（毫秒）
    pub interval_ms: u64,
    /// 探针轮询间隔（毫秒）
    pub delay_ms: u64,
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// 按监控项顺序排列的端点
    pub endpoints: Vec<Endpoint>,
    /// 间隔告警
    pub warnings: Vec<IntervalWarning>,
}

/// 端点解析器
pub struct EndpointResolver<'a> {
    config: &'a ProbeConfig,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(config: &'a ProbeConfig) -> Self {
        Self { config }
    }

    /// 解析本轮需要检测的端点
    ///
    /// 缺少 Type 标签的监控项会使整个解析失败
    pub fn resolve(&self, monitors: &[MonitorDefinition]) -> Result<Resolution> {
        let mut resolution = Resolution::default();

        for monitor in monitors.iter().filter(|m| self.is_eligible(m)) {
            if let Some(warning) = self.interval_warning(monitor) {
                warn!(
                    "监控项 {} 的检测间隔 {}ms 小于探针轮询间隔 {}ms",
                    warning.monitor, warning.interval_ms, warning.delay_ms
                );
                resolution.warnings.push(warning);
            }

            resolution.endpoints.push(self.build_endpoint(monitor)?);
        }

        debug!(
            "共 {} 个监控项，本探针负责 {} 个",
            monitors.len(),
            resolution.endpoints.len()
        );

        Ok(resolution)
    }

    /// 判断监控项是否由本探针负责
    pub fn is_eligible(&self, monitor: &MonitorDefinition) -> bool {
        monitor.active
            && !monitor.maintenance
            && monitor.monitor_type == PUSH_MONITOR_TYPE
            && monitor.tag(tags::PROBE) == Some(self.config.name.as_str())
    }

    /// 检查声明间隔是否小于轮询间隔
    pub fn interval_warning(&self, monitor: &MonitorDefinition) -> Option<IntervalWarning> {
        let interval_ms = monitor.interval_ms();
        (interval_ms < self.config.delay_ms).then(|| IntervalWarning {
            monitor: monitor.name.clone(),
            interval_ms,
            delay_ms: self.config.delay_ms,
        })
    }

    /// 由监控项构造端点
    fn build_endpoint(&self, monitor: &MonitorDefinition) -> Result<Endpoint> {
        let kind = monitor
            .tag(tags::TYPE)
            .map(CheckKind::parse)
            .ok_or_else(|| ProbeError::MissingTypeTag {
                monitor: monitor.name.clone(),
            })?;

        let (push_up_uri, push_down_uri) = self.push_uris(&monitor.push_token);

        let mut endpoint = Endpoint::new(
            monitor.name.clone(),
            kind,
            monitor.tag(tags::ADDRESS).unwrap_or_default(),
            self.config.timeout(),
            push_up_uri,
            push_down_uri,
        );

        endpoint.keyword = monitor.tag(tags::KEYWORD).unwrap_or_default().to_string();
        endpoint.method = monitor
            .tag(tags::METHOD)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string);
        endpoint.success_status_code =
            parse_tag(monitor, tags::SUCCESS_STATUS_CODE, DEFAULT_SUCCESS_STATUS_CODE);
        endpoint.brand = monitor.tag(tags::BRAND).unwrap_or_default().to_string();
        endpoint.port = parse_tag(monitor, tags::PORT, 0);
        endpoint.domain = monitor.tag(tags::DOMAIN).unwrap_or_default().to_string();
        endpoint.certificate_expiration_days =
            parse_tag(monitor, tags::CERTIFICATE_EXPIRATION, DEFAULT_EXPIRATION_DAYS);
        endpoint.ignore_tls_errors = monitor
            .tag(tags::IGNORE_SSL)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        Ok(endpoint)
    }

    /// 拼接成功/失败推送地址
    pub fn push_uris(&self, push_token: &str) -> (String, String) {
        let base = &self.config.url;
        (
            format!("{base}api/push/{push_token}?status=up&msg=OK&ping="),
            format!("{base}api/push/{push_token}?status=down&ping="),
        )
    }
}

/// 解析数值标签，缺失时使用默认值，无法解析时告警并使用默认值
fn parse_tag<T>(monitor: &MonitorDefinition, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match monitor.tag(name).map(str::trim) {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(
                "监控项 {} 的 {} 标签值无效: {}，使用默认值 {}",
                monitor.name, name, raw, default
            );
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Tag;
    use std::time::Duration;

    fn probe_config() -> ProbeConfig {
        ProbeConfig {
            name: "probe-eu-1".to_string(),
            up_dependency: "1.1.1.1".to_string(),
            delay_ms: 60_000,
            timeout_ms: 1_500,
            url: "https://kuma.example.com/".to_string(),
            connection_strings: String::new(),
        }
    }

    fn monitor(name: &str, tags: Vec<Tag>) -> MonitorDefinition {
        MonitorDefinition {
            id: 1,
            name: name.to_string(),
            active: true,
            maintenance: false,
            monitor_type: "push".to_string(),
            interval: 60,
            push_token: "tok".to_string(),
            tags,
        }
    }

    fn probe_tags(kind: &str) -> Vec<Tag> {
        vec![Tag::new("Probe", "probe-eu-1"), Tag::new("Type", kind)]
    }

    #[test]
    fn test_push_uris() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);
        let (up, down) = resolver.push_uris("abc");

        assert_eq!(
            up,
            "https://kuma.example.com/api/push/abc?status=up&msg=OK&ping="
        );
        assert_eq!(down, "https://kuma.example.com/api/push/abc?status=down&ping=");
    }

    #[test]
    fn test_full_tag_set() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);
        let mut tags = probe_tags("Http");
        tags.extend([
            Tag::new("Address", "https://app.example.com/health"),
            Tag::new("Keyword", "healthy"),
            Tag::new("Method", "HEAD"),
            Tag::new("SuccessStatusCode", "418"),
            Tag::new("Brand", "Postgres"),
            Tag::new("Port", "8443"),
            Tag::new("Domain", "example.com"),
            Tag::new("CertificateExpiration", "14"),
            Tag::new("IgnoreSSL", "True"),
        ]);

        let resolution = resolver.resolve(&[monitor("app", tags)]).unwrap();
        let ep = &resolution.endpoints[0];

        assert_eq!(ep.kind, CheckKind::Http);
        assert_eq!(ep.destination, "https://app.example.com/health");
        assert_eq!(ep.timeout, Duration::from_millis(1_500));
        assert_eq!(ep.keyword, "healthy");
        assert_eq!(ep.method.as_deref(), Some("HEAD"));
        assert_eq!(ep.success_status_code, 418);
        assert_eq!(ep.brand, "Postgres");
        assert_eq!(ep.port, 8443);
        assert_eq!(ep.domain, "example.com");
        assert_eq!(ep.certificate_expiration_days, 14);
        assert!(ep.ignore_tls_errors);
        assert!(ep.connection_string.is_none());
    }

    #[test]
    fn test_invalid_numeric_tags_fall_back_to_defaults() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);
        let mut tags = probe_tags("Tcp");
        tags.push(Tag::new("Port", "not-a-port"));
        tags.push(Tag::new("SuccessStatusCode", ""));

        let resolution = resolver.resolve(&[monitor("db", tags)]).unwrap();
        assert_eq!(resolution.endpoints[0].port, 0);
        assert_eq!(resolution.endpoints[0].success_status_code, -1);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);
        let tags = vec![Tag::new("Probe", "probe-eu-1")];

        let err = resolver.resolve(&[monitor("untyped", tags)]).unwrap_err();
        assert!(matches!(err, ProbeError::MissingTypeTag { ref monitor } if monitor == "untyped"));
    }

    #[test]
    fn test_missing_type_on_foreign_monitor_is_ignored() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);
        let tags = vec![Tag::new("Probe", "probe-us-1")];

        let resolution = resolver.resolve(&[monitor("foreign", tags)]).unwrap();
        assert!(resolution.endpoints.is_empty());
    }

    #[test]
    fn test_unrecognized_type_still_resolves() {
        let config = probe_config();
        let resolver = EndpointResolver::new(&config);

        let resolution = resolver.resolve(&[monitor("dns", probe_tags("Dns"))]).unwrap();
        assert_eq!(
            resolution.endpoints[0].kind,
            CheckKind::Unrecognized("Dns".to_string())
        );
    }
}
