//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use crate::config::LoggingConfig;
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 依赖库默认只输出告警及以上
const QUIET_MODULES: &[&str] = &["sqlx", "hyper", "hyper_util", "reqwest", "rustls", "surge_ping"];

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化错误
    init_error: Option<String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn lock_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// 由配置文件的 `[logging]` 段构造
    ///
    /// # 参数
    /// * `config` - 配置文件中的日志配置
    /// * `level_override` - 命令行指定的日志级别，优先于配置文件
    pub fn from_config(config: &LoggingConfig, level_override: Option<&str>) -> Self {
        let level = level_override
            .and_then(|l| LevelFilter::from_str(l).ok())
            .or_else(|| LevelFilter::from_str(&config.level).ok())
            .unwrap_or(LevelFilter::Info);

        let file_path = config.file_path.as_ref().map(PathBuf::from);

        let module_levels = QUIET_MODULES
            .iter()
            .map(|module| (module.to_string(), LevelFilter::Warn.min(level)))
            .collect();

        Self {
            level,
            console: file_path.is_none(),
            file_path,
            json_format: config.json_format,
            module_levels,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装订阅者，只返回新的句柄
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        {
            let state = lock_state();
            if state.initialized && !force_reinit {
                if let Some(e) = &state.init_error {
                    return Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e));
                }
                // 订阅者只安装一次，返回实际生效的配置
                let active = state.current_config.clone().unwrap_or(config);
                return Ok(Self { config: active });
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = lock_state();
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    /// 当前句柄使用的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        LOG_TRACER_INIT
            .get_or_init(|| LogTracer::init().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 构造环境过滤器
    fn build_env_filter(config: &LogConfig) -> EnvFilter {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::level_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("忽略无效的模块日志级别 {module}: {e}"),
            }
        }

        env_filter
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = Self::build_env_filter(config);

        let result = match (&config.file_path, config.console) {
            (Some(file_path), false) => {
                if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| anyhow::anyhow!("创建日志目录失败: {}", e))?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let writer = Mutex::new(file);

                let file_layer = if config.json_format {
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .boxed()
                } else {
                    fmt::layer()
                        .with_writer(writer)
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_target(true)
                        .boxed()
                };
                registry().with(env_filter).with(file_layer).try_init()
            }
            _ => {
                let console_layer = if config.json_format {
                    fmt::layer()
                        .json()
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .boxed()
                } else {
                    fmt::layer()
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_ansi(true)
                        .with_target(true)
                        .boxed()
                };
                registry().with(env_filter).with(console_layer).try_init()
            }
        };

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("already been set")
                    || error_msg.contains("already initialized")
                {
                    // 测试中可能已经安装过全局订阅者
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn level_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        let mut state = lock_state();
        *state = GlobalLoggingState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }

    #[test]
    fn test_from_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            json_format: true,
            file_path: Some("/tmp/kuma-probe.log".to_string()),
        };

        let config = LogConfig::from_config(&logging, None);
        assert_eq!(config.level, LevelFilter::Debug);
        assert!(config.json_format);
        assert!(!config.console);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/kuma-probe.log")));
        assert_eq!(config.module_levels.get("sqlx"), Some(&LevelFilter::Warn));

        let overridden = LogConfig::from_config(&logging, Some("error"));
        assert_eq!(overridden.level, LevelFilter::Error);
        assert_eq!(overridden.module_levels.get("sqlx"), Some(&LevelFilter::Error));
    }

    #[test]
    fn test_from_config_invalid_level_falls_back() {
        let logging = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };

        let config = LogConfig::from_config(&logging, Some("also-invalid"));
        assert_eq!(config.level, LevelFilter::Info);
        assert!(config.console);
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        assert!(LoggingSystem::setup_logging(config.clone()).is_ok());
        assert!(lock_state().initialized);

        // 第二次初始化不会重复安装订阅者，返回首次生效的配置
        let mut second = config.clone();
        second.level = LevelFilter::Trace;
        let system = LoggingSystem::setup_logging(second).unwrap();
        assert_eq!(system.config(), &config);
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(LoggingSystem::setup_logging_with_options(config, true).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_dir.path().join("logs").join("probe.log"));
        config.console = false;

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;
        config
            .module_levels
            .insert("kuma_probe::health".to_string(), LevelFilter::Debug);

        let system = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert_eq!(system.config(), &config);
        assert_eq!(lock_state().current_config, Some(config));
    }
}
