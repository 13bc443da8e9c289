//! 注册中心地址池
//!
//! 维护候选地址及其连通状态，按轮询方式返回可用地址，并由后台任务周期性探测连通性。
//! 探测只影响优先级，不会把地址移出地址池。

use super::load_balancer::RoundRobin;
use crate::config::{DEFAULT_ADDR, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_PORT};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 单次探测超时
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// 地址状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Default)]
struct PoolState {
    addresses: Vec<String>,
    status: HashMap<String, AddressStatus>,
    /// 当前可用地址上的轮询器，状态变化时重建
    available: RoundRobin,
}

impl PoolState {
    fn rebuild(&mut self) {
        let available = self
            .addresses
            .iter()
            .filter(|a| self.status.get(*a) == Some(&AddressStatus::Available))
            .cloned()
            .collect();
        self.available = RoundRobin::new(available);
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    started: bool,
    handle: Option<JoinHandle<()>>,
}

/// 地址池
#[derive(Debug)]
pub struct AddressPool {
    state: RwLock<PoolState>,
    monitor: Mutex<MonitorState>,
    probe_interval: Duration,
    default_port: u16,
    fallback: String,
    shutdown: CancellationToken,
}

impl AddressPool {
    /// 创建地址池，所有地址初始为可用
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = PoolState::default();
        replace_addresses(&mut state, addresses.into_iter().map(Into::into));
        Self {
            state: RwLock::new(state),
            monitor: Mutex::new(MonitorState::default()),
            probe_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            default_port: DEFAULT_PORT,
            fallback: DEFAULT_ADDR.to_string(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// 整体替换候选地址，全部重置为可用
    pub async fn set_address<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.write().await;
        replace_addresses(&mut state, addresses.into_iter().map(Into::into));
        info!(addresses = ?state.addresses, "registry address pool replaced");
    }

    /// 返回一个可用地址；全部不可用时返回兜底地址
    pub async fn get_available_address(&self) -> String {
        match self.try_get_available_address().await {
            Ok(addr) => addr,
            Err(_) => {
                warn!(fallback = %self.fallback, "no available registry address, using fallback");
                self.fallback.clone()
            }
        }
    }

    /// 返回一个可用地址；全部不可用时返回 `NoAvailableAddress`
    pub async fn try_get_available_address(&self) -> Result<String> {
        let state = self.state.read().await;
        state.available.next()
    }

    pub async fn addresses(&self) -> Vec<String> {
        self.state.read().await.addresses.clone()
    }

    pub async fn status(&self, address: &str) -> Option<AddressStatus> {
        self.state.read().await.status.get(address).copied()
    }

    pub async fn available_addresses(&self) -> Vec<String> {
        self.state.read().await.available.addresses().to_vec()
    }

    /// 探测所有候选地址并更新状态
    pub async fn check_connectivity(&self) {
        let candidates = self.addresses().await;
        let probes = candidates.iter().map(|addr| {
            let target = probe_target(addr, self.default_port);
            async move { (addr, probe(&target).await) }
        });
        let results = futures::future::join_all(probes).await;

        let mut state = self.state.write().await;
        let mut changed = false;
        for (addr, reachable) in results {
            // 探测期间地址池可能已被替换
            let Some(status) = state.status.get_mut(addr) else {
                continue;
            };
            let next = if reachable {
                AddressStatus::Available
            } else {
                AddressStatus::Unavailable
            };
            if *status == next {
                continue;
            }
            match next {
                AddressStatus::Available => info!(address = %addr, "registry address recovered"),
                AddressStatus::Unavailable => warn!(address = %addr, "registry address unreachable"),
            }
            *status = next;
            changed = true;
        }
        // 状态未变化时保留轮询位置
        if changed {
            state.rebuild();
        }
    }

    /// 启动后台探测任务，整个生命周期内最多启动一次
    ///
    /// 返回本次调用是否真正启动了任务。
    pub async fn monitor(self: &Arc<Self>) -> bool {
        let mut monitor = self.monitor.lock().await;
        if monitor.started {
            return false;
        }
        monitor.started = true;

        let pool = Arc::downgrade(self);
        let interval = self.probe_interval;
        let shutdown = self.shutdown.clone();
        monitor.handle = Some(tokio::spawn(run_monitor(pool, interval, shutdown)));
        debug!(interval_secs = interval.as_secs(), "registry address monitor started");
        true
    }

    pub async fn is_monitoring(&self) -> bool {
        self.monitor.lock().await.started
    }

    /// 停止后台探测任务
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.monitor.lock().await.handle.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_monitor(pool: Weak<AddressPool>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        // 首次 tick 立即触发
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let Some(pool) = pool.upgrade() else {
            break;
        };
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = pool.check_connectivity() => {}
        }
    }
    debug!("registry address monitor stopped");
}

fn replace_addresses(state: &mut PoolState, addresses: impl Iterator<Item = String>) {
    state.addresses.clear();
    state.status.clear();
    for addr in addresses {
        if addr.is_empty() || state.status.contains_key(&addr) {
            continue;
        }
        state.status.insert(addr.clone(), AddressStatus::Available);
        state.addresses.push(addr);
    }
    state.rebuild();
}

fn probe_target(addr: &str, default_port: u16) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

async fn probe(target: &str) -> bool {
    match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(target)).await {
        Ok(Ok(_)) => {
            debug!(address = %target, "probe succeeded");
            true
        }
        Ok(Err(e)) => {
            debug!(address = %target, error = %e, "probe failed");
            false
        }
        Err(_) => {
            debug!(address = %target, "probe timed out");
            false
        }
    }
}
