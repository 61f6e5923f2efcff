//! # Infrastructure Common
//!
//! 这个 crate 提供了依赖注入引擎各层共享的基础类型。
//!
//! ## 核心类型
//!
//! - [`TypeKey`] / [`ComponentId`] - 类型与组件标识
//! - [`Qualifier`] - 注入限定符
//! - [`Scope`] - 组件作用域（单例 / 依赖）
//! - [`InstanceState`] - 实例生命周期状态机
//! - [`DependencyError`] - 依赖解析与注入错误
//! - [`ConfigSection`] - 配置节
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 显式状态，不依赖任何全局注册表
//! - 错误在解析阶段尽早暴露

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
