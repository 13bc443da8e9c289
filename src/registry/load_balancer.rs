//! 轮询选择器
//!
//! 在一组固定地址上循环选择，计数器使用原子自增，并发调用方之间无需加锁。

use crate::error::{RegistryError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 轮询（Round Robin）
///
/// 地址序列在构造时捕获，之后不再变化。
#[derive(Debug, Default)]
pub struct RoundRobin {
    addresses: Vec<String>,
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 返回下一个地址；序列为空时返回 `NoAvailableAddress`
    pub fn next(&self) -> Result<String> {
        if self.addresses.is_empty() {
            return Err(RegistryError::NoAvailableAddress);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(self.addresses[index % self.addresses.len()].clone())
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }
}

impl Clone for RoundRobin {
    /// 克隆后从头开始计数
    fn clone(&self) -> Self {
        Self::new(self.addresses.clone())
    }
}
