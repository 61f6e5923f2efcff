//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件声明模型、解析计划和引擎各阶段的核心接口。
//!
//! ## 核心类型
//!
//! - [`ManagedComponentDeclaration`] - 托管组件声明
//! - [`InjectionPointIndex`] - 注入点索引
//! - [`ResolutionPlan`] - 解析计划
//! - [`Instance`] - 组件实例
//!
//! ## 核心接口
//!
//! - [`InjectionPointScanner`] - 注入点索引构建
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`ScopeManager`] - 作用域管理接口
//! - [`DeclarationSource`] - 声明来源接口

pub mod container;
pub mod descriptor;
pub mod discovery;
pub mod factory;
pub mod inject;
pub mod instance;
pub mod plan;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::*;
pub use descriptor::*;
pub use discovery::*;
pub use factory::*;
pub use inject::*;
pub use instance::*;
pub use plan::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;

pub use infrastructure_common::{
    ComponentId, DependencyError, DependencyResult, InstanceState, Qualifier, Scope, TypeKey,
};
