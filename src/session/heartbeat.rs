//! 实例心跳长连接
//!
//! 服务端以关闭码 [`INSTANCE_NOT_EXISTS_CLOSE_CODE`] 断开连接表示实例已被删除，
//! 此时在下一次重连前执行一次调用方提供的重新注册逻辑。

use super::FeedHandler;
use crate::registry::routes::INSTANCE_NOT_EXISTS_CLOSE_CODE;
use crate::transport::{FeedError, Frame};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info};

/// 实例被删除后的回调
///
/// 之后的重连沿用原实例 ID，回调中重新注册时应保留该 ID。
pub type RemovedCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct HeartbeatHandler {
    service_id: String,
    instance_id: String,
    on_removed: RemovedCallback,
}

impl HeartbeatHandler {
    pub fn new(
        service_id: impl Into<String>,
        instance_id: impl Into<String>,
        on_removed: RemovedCallback,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            instance_id: instance_id.into(),
            on_removed,
        }
    }
}

#[async_trait]
impl FeedHandler for HeartbeatHandler {
    fn kind(&self) -> &'static str {
        "heartbeat"
    }

    /// 心跳连接上的数据帧没有业务含义
    fn on_frame(&self, frame: &Frame) -> Result<(), FeedError> {
        debug!(instance_id = %self.instance_id, len = frame.payload().map_or(0, <[u8]>::len), "heartbeat frame");
        Ok(())
    }

    async fn on_disconnect(&self, error: &FeedError) {
        if error.close_code() != Some(INSTANCE_NOT_EXISTS_CLOSE_CODE) {
            return;
        }
        info!(
            service_id = %self.service_id,
            instance_id = %self.instance_id,
            "instance removed by registry, running re-registration"
        );
        (self.on_removed)().await;
    }
}
