//! 客户端配置
//!
//! `Options` 可以直接构造，也可以从 TOML 文件加载。探测间隔与项目名支持环境变量覆盖。

use crate::error::{RegistryError, Result};
use crate::retry::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 探测间隔环境变量（秒）
pub const ENV_CHECK_SCI_INTERVAL: &str = "CHECK_SCI_INTERVAL";
/// 项目名环境变量，用于拼接 API 基础路径
pub const ENV_PROJECT_ID: &str = "CSE_PROJECT_ID";

/// 默认探测间隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 25;
/// 地址池耗尽时使用的兜底地址
pub const DEFAULT_ADDR: &str = "127.0.0.1:30100";
/// 注册中心默认端口
pub const DEFAULT_PORT: u16 = 30100;
pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_TENANT: &str = "default";
pub const DEFAULT_API_VERSION: &str = "v4";

/// 注册中心客户端配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// 注册中心地址列表（host:port）
    pub addrs: Vec<String>,
    pub enable_ssl: bool,
    /// 租户，通过 `X-Domain-Name` 请求头传递
    pub tenant: String,
    /// 项目名，未设置时读取 `CSE_PROJECT_ID`，再退回 `default`
    pub project: Option<String>,
    /// 单次请求超时（毫秒），`None` 表示不限制
    pub timeout_ms: Option<u64>,
    /// API 版本路径段
    pub version: String,
    /// 打印请求/响应调试日志
    pub verbose: bool,
    /// 地址探测间隔（秒），未设置时读取 `CHECK_SCI_INTERVAL`
    pub probe_interval: Option<u64>,
    /// 地址未带端口时探测使用的端口
    pub default_port: u16,
    /// 地址池耗尽时返回的地址
    pub fallback_address: String,
    /// 长连接重连退避配置
    pub reconnect: ReconnectConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            enable_ssl: false,
            tenant: DEFAULT_TENANT.to_string(),
            project: None,
            timeout_ms: None,
            version: DEFAULT_API_VERSION.to_string(),
            verbose: false,
            probe_interval: None,
            default_port: DEFAULT_PORT,
            fallback_address: DEFAULT_ADDR.to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Options {
    pub fn new<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addrs: addrs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_ssl(mut self, enable: bool) -> Self {
        self.enable_ssl = enable;
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1));
        self
    }

    pub fn with_probe_interval(mut self, secs: u64) -> Self {
        self.probe_interval = Some(secs);
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// 从 TOML 文件加载配置
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Config(format!("读取配置文件 {} 失败: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 实际使用的项目名
    pub fn resolved_project(&self) -> String {
        match &self.project {
            Some(project) if !project.is_empty() => project.clone(),
            _ => project_from(std::env::var(ENV_PROJECT_ID).ok().as_deref()),
        }
    }

    /// 实际使用的探测间隔
    pub fn resolved_probe_interval(&self) -> Duration {
        let secs = match self.probe_interval {
            Some(secs) if secs > 0 => secs,
            _ => parse_interval(std::env::var(ENV_CHECK_SCI_INTERVAL).ok().as_deref()),
        };
        Duration::from_secs(secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|t| *t > 0).map(Duration::from_millis)
    }

    pub fn http_scheme(&self) -> &'static str {
        if self.enable_ssl { "https" } else { "http" }
    }

    pub fn feed_scheme(&self) -> &'static str {
        if self.enable_ssl { "wss" } else { "ws" }
    }
}

/// 解析探测间隔，非法或缺失时使用默认值
pub fn parse_interval(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS)
}

/// 解析项目名，缺失或为空时使用默认值
pub fn project_from(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(project) if !project.is_empty() => project.to_string(),
        _ => DEFAULT_PROJECT.to_string(),
    }
}

/// 长连接重连退避配置
///
/// `max_elapsed_ms` 为 `None` 时无限重试。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub randomization_factor: f64,
    pub max_elapsed_ms: Option<u64>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            multiplier: 2.0,
            max_interval_ms: 30_000,
            randomization_factor: 0.5,
            max_elapsed_ms: None,
        }
    }
}

impl ReconnectConfig {
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.initial_interval_ms),
            self.multiplier,
            Duration::from_millis(self.max_interval_ms),
        )
        .with_randomization(self.randomization_factor)
        .with_max_elapsed(self.max_elapsed_ms.map(Duration::from_millis))
    }
}

/// 单次调用选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// 忽略缓存的 revision，也不更新它
    pub without_revision: bool,
    /// 显式指定 revision，优先于缓存值
    pub revision: Option<String>,
}

impl CallOptions {
    pub fn without_revision() -> Self {
        Self {
            without_revision: true,
            revision: None,
        }
    }

    pub fn with_revision(revision: impl Into<String>) -> Self {
        Self {
            without_revision: false,
            revision: Some(revision.into()),
        }
    }
}
