//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 连接相关错误
/// - 3000-3999: 协议相关错误
/// - 5000-5999: 注册中心相关错误
/// - 6000-6999: 系统相关错误
/// - 8000-8999: 序列化相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 连接相关错误 (1000-1999)
    // ============================================================
    ConnectionFailed = 1000,
    ConnectionTimeout = 1001,
    ConnectionClosed = 1002,
    NoAvailableAddress = 1003,

    // ============================================================
    // 协议相关错误 (3000-3999)
    // ============================================================
    ProtocolError = 3000,
    NotModified = 3001,
    MessageDecodeFailed = 3002,

    // ============================================================
    // 注册中心相关错误 (5000-5999)
    // ============================================================
    MicroServiceNotExists = 5000,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    ClientClosed = 6000,
    ConfigurationError = 6003,

    // ============================================================
    // 序列化相关错误 (8000-8999)
    // ============================================================
    SerializationError = 8000,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    InvalidParameter = 9001,
    UnknownError = 9999,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::ConnectionFailed),
            1001 => Some(ErrorCode::ConnectionTimeout),
            1002 => Some(ErrorCode::ConnectionClosed),
            1003 => Some(ErrorCode::NoAvailableAddress),
            3000 => Some(ErrorCode::ProtocolError),
            3001 => Some(ErrorCode::NotModified),
            3002 => Some(ErrorCode::MessageDecodeFailed),
            5000 => Some(ErrorCode::MicroServiceNotExists),
            6000 => Some(ErrorCode::ClientClosed),
            6003 => Some(ErrorCode::ConfigurationError),
            8000 => Some(ErrorCode::SerializationError),
            9001 => Some(ErrorCode::InvalidParameter),
            9999 => Some(ErrorCode::UnknownError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::ConnectionClosed => "CONNECTION_CLOSED",
            ErrorCode::NoAvailableAddress => "NO_AVAILABLE_ADDRESS",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::NotModified => "NOT_MODIFIED",
            ErrorCode::MessageDecodeFailed => "MESSAGE_DECODE_FAILED",
            ErrorCode::MicroServiceNotExists => "MICRO_SERVICE_NOT_EXISTS",
            ErrorCode::ClientClosed => "CLIENT_CLOSED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Connection,
            3000..=3999 => ErrorCategory::Protocol,
            5000..=5999 => ErrorCategory::Registry,
            6000..=6999 => ErrorCategory::System,
            8000..=8999 => ErrorCategory::Serialization,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionFailed
                | ErrorCode::ConnectionTimeout
                | ErrorCode::ConnectionClosed
                | ErrorCode::NoAvailableAddress
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Connection,
    Protocol,
    Registry,
    System,
    Serialization,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Connection => write!(f, "CONNECTION"),
            ErrorCategory::Protocol => write!(f, "PROTOCOL"),
            ErrorCategory::Registry => write!(f, "REGISTRY"),
            ErrorCategory::System => write!(f, "SYSTEM"),
            ErrorCategory::Serialization => write!(f, "SERIALIZATION"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_numeric_value() {
        for code in [
            ErrorCode::ConnectionFailed,
            ErrorCode::NotModified,
            ErrorCode::MicroServiceNotExists,
            ErrorCode::InvalidParameter,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(ErrorCode::from_u32(4242), None);
    }

    #[test]
    fn categories_follow_numeric_ranges() {
        assert_eq!(ErrorCode::ConnectionTimeout.category(), ErrorCategory::Connection);
        assert_eq!(ErrorCode::NotModified.category(), ErrorCategory::Protocol);
        assert_eq!(ErrorCode::MicroServiceNotExists.category(), ErrorCategory::Registry);
        assert_eq!(ErrorCode::InvalidParameter.category(), ErrorCategory::General);
    }
}
