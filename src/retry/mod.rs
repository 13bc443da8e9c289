//! 重试策略模块

pub mod exponential;

pub use exponential::ExponentialBackoff;
