//! 作用域管理抽象接口

use crate::instance::Instance;
use infrastructure_common::{ComponentId, DependencyResult, Scope};
use std::sync::Arc;

/// 实例创建函数
pub type CreateInstance<'a> = &'a mut dyn FnMut() -> DependencyResult<Arc<Instance>>;

/// 作用域管理器 trait
///
/// 负责按作用域缓存或新建实例，以及关闭时的统一销毁
pub trait ScopeManager: Send + Sync {
    /// 获取或创建实例
    ///
    /// 单例在注册表生命周期内只创建一次；依赖作用域每次都新建。
    fn get_or_create(
        &self,
        component: &ComponentId,
        scope: Scope,
        create: CreateInstance<'_>,
    ) -> DependencyResult<Arc<Instance>>;

    /// 获取已就绪的单例
    fn singleton(&self, component: &ComponentId) -> Option<Arc<Instance>>;

    /// 关闭并销毁所有实例
    fn teardown(&self) -> DependencyResult<()>;

    /// 是否已关闭
    fn is_closed(&self) -> bool;
}
