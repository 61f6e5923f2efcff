//! # 应用组合层
//!
//! 负责把各个声明来源（会话组件模块、托管类模块）与配置源组合成一个
//! 可运行的应用。
//!
//! ## 主要功能
//!
//! - **应用组合器**: 使用构建者模式收集模块与配置源
//! - **声明合并**: 按合并策略处理跨模块的重复声明
//! - **日志初始化**: 基于 `tracing-subscriber` 的日志配置
//! - **生命周期管理**: 应用停止时关闭注册表并销毁所有实例
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{ApplicationComposer, BeansModule};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let application = ApplicationComposer::new()
//!         .add_module(BeansModule::new("beans"))
//!         .add_config_env_vars("LORN_DI")?
//!         .compose()
//!         .await?;
//!
//!     println!("{:?}", application.metrics().await);
//!
//!     application.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod composer;
pub mod logging;
pub mod modules;


pub use application::{Application, ApplicationMetrics, ApplicationStatus};
pub use composer::ApplicationComposer;
pub use logging::{init_logging, LoggingConfig};
pub use modules::{BeansModule, EjbModule};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
