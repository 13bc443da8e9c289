//! 实例列表 revision 缓存
//!
//! 每个客户端持有一个 revision，初始为 `"0"`（无基线）。并发拉取之间后写者胜出，
//! 过期 revision 最多导致一次额外的全量拉取。

use tokio::sync::RwLock;

/// 无基线时的 revision
pub const DEFAULT_REVISION: &str = "0";

#[derive(Debug)]
pub struct RevisionCache {
    token: RwLock<String>,
}

impl RevisionCache {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(DEFAULT_REVISION.to_string()),
        }
    }

    pub async fn get(&self) -> String {
        self.token.read().await.clone()
    }

    /// 采用新的 revision，空值忽略
    pub async fn set(&self, revision: impl Into<String>) {
        let revision = revision.into();
        if revision.is_empty() {
            return;
        }
        *self.token.write().await = revision;
    }

    pub async fn reset(&self) {
        *self.token.write().await = DEFAULT_REVISION.to_string();
    }
}

impl Default for RevisionCache {
    fn default() -> Self {
        Self::new()
    }
}
