//! 注册中心客户端统一错误类型

use super::code::ErrorCode;
use thiserror::Error;

/// 注册中心客户端错误
///
/// `NotModified` 与 `MicroServiceNotExists` 是条件拉取协议的预期结果，
/// 调用方应据此复用旧结果或重新注册，而不是当作故障处理。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// 网络或建连失败
    #[error("传输错误: {0}")]
    Transport(String),

    /// 请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 非预期的状态码或响应体
    #[error("协议错误 [{status}]: {body}")]
    Protocol { status: u16, body: String },

    /// 实例列表自给定 revision 以来未变化
    #[error("实例列表未变化")]
    NotModified,

    /// 注册中心中不存在该微服务
    #[error("微服务不存在")]
    MicroServiceNotExists,

    /// 缺少必填参数
    #[error("参数错误: {0}")]
    InvalidArgument(String),

    /// 地址池中没有可用地址
    #[error("没有可用的注册中心地址")]
    NoAvailableAddress,

    /// 序列化/反序列化失败
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 客户端已关闭
    #[error("客户端已关闭")]
    Closed,
}

impl RegistryError {
    /// 创建传输错误
    pub fn transport(reason: impl Into<String>) -> Self {
        RegistryError::Transport(reason.into())
    }

    /// 创建协议错误
    pub fn protocol(status: u16, body: impl Into<String>) -> Self {
        RegistryError::Protocol {
            status,
            body: body.into(),
        }
    }

    /// 创建参数错误
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(reason.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::Transport(_) => ErrorCode::ConnectionFailed,
            RegistryError::Timeout(_) => ErrorCode::ConnectionTimeout,
            RegistryError::Protocol { .. } => ErrorCode::ProtocolError,
            RegistryError::NotModified => ErrorCode::NotModified,
            RegistryError::MicroServiceNotExists => ErrorCode::MicroServiceNotExists,
            RegistryError::InvalidArgument(_) => ErrorCode::InvalidParameter,
            RegistryError::NoAvailableAddress => ErrorCode::NoAvailableAddress,
            RegistryError::Serialization(_) => ErrorCode::SerializationError,
            RegistryError::Config(_) => ErrorCode::ConfigurationError,
            RegistryError::Closed => ErrorCode::ClientClosed,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// 是否为"未变化"结果
    pub fn is_not_modified(&self) -> bool {
        matches!(self, RegistryError::NotModified)
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RegistryError>;
