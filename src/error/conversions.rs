//! 错误类型转换实现

use super::RegistryError;
use std::io;

impl From<io::Error> for RegistryError {
    fn from(err: io::Error) -> Self {
        RegistryError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(format!("JSON 序列化错误: {}", err))
    }
}

impl From<toml::de::Error> for RegistryError {
    fn from(err: toml::de::Error) -> Self {
        RegistryError::Config(format!("TOML 解析错误: {}", err))
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RegistryError::Timeout(err.to_string())
        } else if err.is_builder() {
            RegistryError::InvalidArgument(err.to_string())
        } else {
            RegistryError::Transport(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RegistryError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Url(e) => RegistryError::InvalidArgument(e.to_string()),
            WsError::Http(response) => {
                let body = response
                    .body()
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                RegistryError::protocol(response.status().as_u16(), body)
            }
            other => RegistryError::Transport(other.to_string()),
        }
    }
}

impl From<http::header::InvalidHeaderValue> for RegistryError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        RegistryError::Config(format!("非法的请求头: {}", err))
    }
}
