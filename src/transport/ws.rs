//! 基于 WebSocket 的长连接实现

use super::feed::{Dialer, FeedConnection, FeedError, Frame};
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::HeaderMap;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

/// WebSocket 拨号器
#[derive(Debug, Clone, Default)]
pub struct WsDialer;

impl WsDialer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, url: &str, headers: &HeaderMap) -> Result<Box<dyn FeedConnection>> {
        let mut request = url.into_client_request()?;
        request.headers_mut().extend(headers.clone());

        let (stream, response) = connect_async(request).await?;
        debug!(url = %url, status = %response.status(), "feed connection established");

        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn read_frame(&mut self) -> std::result::Result<Frame, FeedError> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Err(FeedError::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    });
                }
                Some(Err(e)) => return Err(FeedError::Io(e.to_string())),
            };

            return match message {
                Message::Text(text) => Ok(Frame::Text(text)),
                Message::Binary(data) => Ok(Frame::Binary(Bytes::from(data))),
                Message::Ping(data) => Ok(Frame::Ping(Bytes::from(data))),
                Message::Pong(data) => Ok(Frame::Pong(Bytes::from(data))),
                Message::Close(frame) => Err(match frame {
                    Some(frame) => FeedError::Closed {
                        code: Some(u16::from(frame.code)),
                        reason: frame.reason.into_owned(),
                    },
                    None => FeedError::Closed {
                        code: None,
                        reason: String::new(),
                    },
                }),
                // 原始帧只在写入路径出现
                Message::Frame(_) => continue,
            };
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(RegistryError::transport(e.to_string())),
        }
    }
}
