//! 注册中心地址管理与协议约定
//!
//! - [`RoundRobin`]：原子计数的轮询选择器
//! - [`AddressPool`]：候选地址、连通状态与后台探测
//! - [`RevisionCache`]：实例列表条件拉取使用的 revision
//! - [`routes`]：API 路径、请求头与协议常量

pub mod load_balancer;
pub mod pool;
pub mod revision;
pub mod routes;

pub use load_balancer::RoundRobin;
pub use pool::{AddressPool, AddressStatus};
pub use revision::{DEFAULT_REVISION, RevisionCache};
pub use routes::{INSTANCE_NOT_EXISTS_CLOSE_CODE, RoutePath, Routes};
