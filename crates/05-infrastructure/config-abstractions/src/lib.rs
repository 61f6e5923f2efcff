//! # Configuration Abstractions
//!
//! 容器配置的来源与叠加规则。
//!
//! - [`ConfigProvider`] - 单个配置来源（文件、环境变量或自定义来源）
//! - [`ConfigManager`] - 按优先级叠加多个来源，并把配置节绑定到类型

pub mod manager;
pub mod provider;

pub use manager::ConfigManager;
pub use provider::{priority, ConfigOrigin, ConfigProvider};
