//! 错误处理模块
//!
//! 提供注册中心客户端的统一错误类型、错误代码分类和错误转换

pub mod code;
pub mod conversions;
pub mod registry_error;

pub use code::{ErrorCategory, ErrorCode};
pub use registry_error::{RegistryError, Result};
