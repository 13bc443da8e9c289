//! 传输层抽象
//!
//! - [`Transport`]：一次请求/响应调用，默认实现基于 `reqwest`
//! - [`Dialer`] / [`FeedConnection`]：长连接，默认实现基于 WebSocket

pub mod feed;
pub mod http;
pub mod ws;

pub use feed::{Dialer, FeedConnection, FeedError, Frame};
pub use self::http::ReqwestTransport;
pub use ws::WsDialer;

use crate::error::{RegistryError, Result};
use ::http::{HeaderMap, Method, StatusCode};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// 一次 HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// 一次 HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// 非 2xx 时转换为协议错误
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(RegistryError::protocol(self.status.as_u16(), self.body_text()))
        }
    }
}

/// 请求/响应传输
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发送请求。非 2xx 状态码不视为错误，由调用方解释
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
