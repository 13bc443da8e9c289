//! 长连接订阅会话
//!
//! 每个订阅键（watch 的服务 ID、心跳的实例 ID）至多对应一条存活连接。
//! 会话状态流转：
//!
//! ```text
//! Connecting -> Active -> (读失败/对端关闭/解码失败) -> Backoff -> Connecting -> ...
//! ```
//!
//! 首次拨号由调用方触发，失败同步返回并释放槽位；之后的重连在后台任务中进行，
//! 只记录日志。重连期间槽位保持占用，重复订阅不会建立第二条连接。

pub mod heartbeat;
pub mod watch;

pub use heartbeat::HeartbeatHandler;
pub use watch::WatchHandler;

use crate::config::ReconnectConfig;
use crate::error::{RegistryError, Result};
use crate::registry::pool::AddressPool;
use crate::registry::routes::{RoutePath, build_url};
use crate::retry::ExponentialBackoff;
use crate::transport::{Dialer, FeedConnection, FeedError, Frame};
use async_trait::async_trait;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 已占用槽位，正在首次拨号
    Connecting,
    /// 连接已建立，读循环运行中
    Active,
    /// 连接已断开，等待退避后重连
    Backoff,
}

/// 长连接上的帧处理逻辑
#[async_trait]
pub trait FeedHandler: Send + Sync + 'static {
    /// 用于日志的会话类型
    fn kind(&self) -> &'static str;

    /// 处理一个数据帧，返回错误时当前连接被视为失效
    fn on_frame(&self, frame: &Frame) -> std::result::Result<(), FeedError>;

    /// 连接断开后、下一次重连前调用
    async fn on_disconnect(&self, _error: &FeedError) {}
}

#[derive(Debug)]
struct SessionSlot {
    generation: u64,
    state: SessionState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// 订阅槽位的占用凭证
#[derive(Debug, Clone)]
pub struct SessionTicket {
    generation: u64,
    cancel: CancellationToken,
}

/// 会话表
///
/// 检查与占用在同一把写锁下完成。每次占用分配新的 generation，
/// 旧任务的状态更新和释放不会影响之后的新槽位。
#[derive(Debug, Default)]
pub struct SessionTable {
    slots: RwLock<HashMap<String, SessionSlot>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.slots.read().await.contains_key(key)
    }

    pub async fn state(&self, key: &str) -> Option<SessionState> {
        self.slots.read().await.get(key).map(|slot| slot.state)
    }

    /// 连接是否处于可用状态
    pub async fn is_ready(&self, key: &str) -> bool {
        self.state(key).await == Some(SessionState::Active)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// 占用槽位；已被占用时返回 `None`
    pub async fn reserve(&self, key: &str) -> Result<Option<SessionTicket>> {
        let mut slots = self.slots.write().await;
        if self.shutdown.is_cancelled() {
            return Err(RegistryError::Closed);
        }
        if slots.contains_key(key) {
            return Ok(None);
        }
        let ticket = SessionTicket {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            cancel: self.shutdown.child_token(),
        };
        slots.insert(
            key.to_string(),
            SessionSlot {
                generation: ticket.generation,
                state: SessionState::Connecting,
                cancel: ticket.cancel.clone(),
                task: None,
            },
        );
        Ok(Some(ticket))
    }

    pub async fn set_state(&self, key: &str, ticket: &SessionTicket, state: SessionState) {
        if let Some(slot) = self.slots.write().await.get_mut(key) {
            if slot.generation == ticket.generation {
                slot.state = state;
            }
        }
    }

    async fn attach_task(&self, key: &str, ticket: &SessionTicket, task: JoinHandle<()>) {
        if let Some(slot) = self.slots.write().await.get_mut(key) {
            if slot.generation == ticket.generation {
                slot.task = Some(task);
            }
        }
    }

    pub async fn release(&self, key: &str, ticket: &SessionTicket) {
        let mut slots = self.slots.write().await;
        if slots.get(key).map(|slot| slot.generation) == Some(ticket.generation) {
            slots.remove(key);
        }
    }

    /// 取消所有会话并等待其退出，超时后强制中止
    pub async fn close(&self, timeout: Duration) {
        let drained: Vec<(String, SessionSlot)> = {
            let mut slots = self.slots.write().await;
            self.shutdown.cancel();
            slots.drain().collect()
        };

        for (key, slot) in drained {
            slot.cancel.cancel();
            let Some(mut task) = slot.task else {
                continue;
            };
            if tokio::time::timeout(timeout, &mut task).await.is_err() {
                warn!(key = %key, "feed session did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

/// 会话运行所需的共享资源
pub struct FeedContext {
    pub pool: Arc<AddressPool>,
    pub dialer: Arc<dyn Dialer>,
    pub headers: HeaderMap,
    pub scheme: &'static str,
    pub reconnect: ReconnectConfig,
    pub sessions: Arc<SessionTable>,
}

impl FeedContext {
    /// 从地址池取一个地址并拨号
    async fn dial(&self, path: &RoutePath) -> Result<Box<dyn FeedConnection>> {
        let address = self.pool.get_available_address().await;
        let url = build_url(self.scheme, &address, path, &[])?;
        debug!(url = %url, "dialing feed");
        self.dialer.dial(&url, &self.headers).await
    }
}

/// 订阅长连接
///
/// 已存在同键会话时直接返回成功。
pub async fn subscribe<H: FeedHandler>(
    ctx: Arc<FeedContext>,
    key: String,
    path: RoutePath,
    handler: Arc<H>,
) -> Result<()> {
    if ctx.sessions.contains(&key).await {
        debug!(kind = handler.kind(), key = %key, "feed session already exists");
        return Ok(());
    }
    let Some(ticket) = ctx.sessions.reserve(&key).await? else {
        debug!(kind = handler.kind(), key = %key, "feed session already exists");
        return Ok(());
    };

    let conn = match ctx.dial(&path).await {
        Ok(conn) => conn,
        Err(e) => {
            ctx.sessions.release(&key, &ticket).await;
            return Err(e);
        }
    };
    ctx.sessions.set_state(&key, &ticket, SessionState::Active).await;
    info!(kind = handler.kind(), key = %key, "feed session established");

    let task = tokio::spawn(run_session(
        Arc::clone(&ctx),
        key.clone(),
        path,
        handler,
        conn,
        ticket.clone(),
    ));
    ctx.sessions.attach_task(&key, &ticket, task).await;
    Ok(())
}

async fn run_session<H: FeedHandler>(
    ctx: Arc<FeedContext>,
    key: String,
    path: RoutePath,
    handler: Arc<H>,
    mut conn: Box<dyn FeedConnection>,
    ticket: SessionTicket,
) {
    let mut backoff = ctx.reconnect.to_backoff();
    loop {
        let outcome = tokio::select! {
            _ = ticket.cancel.cancelled() => None,
            error = read_until_failure(conn.as_mut(), handler.as_ref()) => Some(error),
        };
        if let Err(e) = conn.close().await {
            debug!(key = %key, error = %e, "closing feed connection failed");
        }
        let Some(error) = outcome else {
            break;
        };

        ctx.sessions.set_state(&key, &ticket, SessionState::Backoff).await;
        warn!(kind = handler.kind(), key = %key, error = %error, "feed session lost, reconnecting");

        tokio::select! {
            _ = ticket.cancel.cancelled() => break,
            _ = handler.on_disconnect(&error) => {}
        }

        match reconnect(&ctx, &path, &mut backoff, &ticket.cancel).await {
            Some(next) => {
                conn = next;
                ctx.sessions.set_state(&key, &ticket, SessionState::Active).await;
                info!(kind = handler.kind(), key = %key, "feed session re-established");
            }
            None => break,
        }
    }
    ctx.sessions.release(&key, &ticket).await;
    debug!(kind = handler.kind(), key = %key, "feed session stopped");
}

/// 读取并处理帧，直到连接失效
async fn read_until_failure<H: FeedHandler>(conn: &mut dyn FeedConnection, handler: &H) -> FeedError {
    loop {
        let frame = match conn.read_frame().await {
            Ok(frame) => frame,
            Err(e) => return e,
        };
        if frame.payload().is_none() {
            continue;
        }
        if let Err(e) = handler.on_frame(&frame) {
            return e;
        }
    }
}

/// 按退避节奏重连，取消或超出退避上限时返回 `None`
async fn reconnect(
    ctx: &FeedContext,
    path: &RoutePath,
    backoff: &mut ExponentialBackoff,
    cancel: &CancellationToken,
) -> Option<Box<dyn FeedConnection>> {
    loop {
        let Some(delay) = backoff.next_backoff() else {
            warn!(path = %path, attempts = backoff.attempt(), "feed reconnect gave up");
            return None;
        };
        debug!(path = %path, delay_ms = delay.as_millis() as u64, "waiting before reconnect");
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        let dialed = tokio::select! {
            _ = cancel.cancelled() => return None,
            dialed = ctx.dial(path) => dialed,
        };
        match dialed {
            Ok(conn) => {
                backoff.reset();
                return Some(conn);
            }
            Err(e) => warn!(path = %path, error = %e, "feed reconnect failed"),
        }
    }
}
