//! 长连接抽象

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use thiserror::Error;

/// 长连接上收到的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
}

impl Frame {
    /// 数据帧的负载；控制帧返回 `None`
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(text) => Some(text.as_bytes()),
            Frame::Binary(bytes) => Some(bytes),
            Frame::Ping(_) | Frame::Pong(_) => None,
        }
    }
}

/// 读帧失败的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// 对端关闭（包括正常关闭）
    #[error("连接已关闭 (code={code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    /// 底层 IO 错误
    #[error("连接错误: {0}")]
    Io(String),

    /// 帧内容无法解码
    #[error("帧解码失败: {0}")]
    Decode(String),
}

impl FeedError {
    pub fn close_code(&self) -> Option<u16> {
        match self {
            FeedError::Closed { code, .. } => *code,
            _ => None,
        }
    }
}

/// 已建立的长连接
#[async_trait]
pub trait FeedConnection: Send {
    /// 阻塞读取下一帧，关闭帧以 [`FeedError::Closed`] 返回
    async fn read_frame(&mut self) -> std::result::Result<Frame, FeedError>;

    async fn close(&mut self) -> Result<()>;
}

/// 长连接拨号器
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, url: &str, headers: &HeaderMap) -> Result<Box<dyn FeedConnection>>;
}
