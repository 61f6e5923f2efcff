//! 组件构造抽象
//!
//! 构造路径接收已解析的构造器依赖并产生组件对象

use infrastructure_common::{DependencyError, DependencyResult};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// 类型擦除的组件对象，具体类型为组件实现类型
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// 类型擦除的依赖句柄
///
/// 内部保存 `Arc<R>`，`R` 为注入点所需类型（可以是 `dyn Trait`）。
pub type DependencyHandle = Arc<dyn Any + Send + Sync>;

/// 构造函数
pub type ConstructFn = Arc<dyn Fn(&ConstructorArgs) -> DependencyResult<AnyInstance> + Send + Sync>;

/// 构造器参数
///
/// 按成员名称保存已解析的构造器依赖
#[derive(Default)]
pub struct ConstructorArgs {
    component: String,
    values: HashMap<String, DependencyHandle>,
}

impl ConstructorArgs {
    /// 创建新的构造器参数
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            values: HashMap::new(),
        }
    }

    /// 插入已解析的依赖
    pub fn insert(&mut self, member: impl Into<String>, handle: DependencyHandle) {
        self.values.insert(member.into(), handle);
    }

    /// 获取构造器依赖
    pub fn get<D>(&self, member: &str) -> DependencyResult<Arc<D>>
    where
        D: ?Sized + Send + Sync + 'static,
    {
        let handle = self.values.get(member).ok_or_else(|| {
            DependencyError::injection_failed(&self.component, member, "构造器参数未解析")
        })?;

        handle.downcast_ref::<Arc<D>>().cloned().ok_or_else(|| {
            DependencyError::injection_failed(
                &self.component,
                member,
                format!("构造器参数类型不匹配, 期望 {}", std::any::type_name::<D>()),
            )
        })
    }

    /// 参数数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for ConstructorArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorArgs")
            .field("component", &self.component)
            .field("members", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
