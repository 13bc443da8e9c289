//! 实例变更订阅

use super::FeedHandler;
use crate::model::MicroServiceInstanceChangedEvent;
use crate::transport::{FeedError, Frame};
use std::sync::Arc;
use tracing::debug;

/// 事件回调，在读循环中同步执行
pub type EventCallback = Arc<dyn Fn(MicroServiceInstanceChangedEvent) + Send + Sync>;

pub struct WatchHandler {
    service_id: String,
    callback: EventCallback,
}

impl WatchHandler {
    pub fn new(service_id: impl Into<String>, callback: EventCallback) -> Self {
        Self {
            service_id: service_id.into(),
            callback,
        }
    }
}

impl FeedHandler for WatchHandler {
    fn kind(&self) -> &'static str {
        "watch"
    }

    fn on_frame(&self, frame: &Frame) -> Result<(), FeedError> {
        let Some(payload) = frame.payload() else {
            return Ok(());
        };
        let event: MicroServiceInstanceChangedEvent =
            serde_json::from_slice(payload).map_err(|e| FeedError::Decode(e.to_string()))?;
        debug!(
            service_id = %self.service_id,
            action = %event.action,
            "instance change event received"
        );
        (self.callback)(event);
        Ok(())
    }
}
