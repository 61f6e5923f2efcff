//! # 依赖注入具体实现
//!
//! 提供注入点索引、依赖图解析器、实例注册表、注入器和容器实现。
//!
//! 引擎操作都是同步的：注册表使用互斥锁加条件变量实现单例的比较并创建，
//! 所有解析类错误在构建容器时就会暴露。

pub mod container;
pub mod index;
pub mod injector;
pub mod registry;
pub mod resolver;

pub use container::*;
pub use index::*;
pub use injector::*;
pub use registry::*;
pub use resolver::*;
