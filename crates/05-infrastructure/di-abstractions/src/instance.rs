//! 组件实例

use crate::factory::AnyInstance;
use chrono::{DateTime, Utc};
use infrastructure_common::{ComponentId, DependencyError, DependencyResult, InstanceState, Scope};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// 组件实例
///
/// 以 `Arc<Instance>` 共享，实例身份即 `Arc::ptr_eq`。
pub struct Instance {
    id: Uuid,
    component: ComponentId,
    scope: Scope,
    object: AnyInstance,
    created_at: DateTime<Utc>,
    state: Mutex<InstanceState>,
}

impl Instance {
    /// 包装刚构造完成的组件对象
    pub fn constructed(component: ComponentId, scope: Scope, object: AnyInstance) -> Self {
        Self {
            id: Uuid::new_v4(),
            component,
            scope,
            object,
            created_at: Utc::now(),
            state: Mutex::new(InstanceState::Constructed),
        }
    }

    /// 实例ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 所属组件
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// 作用域
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// 创建时间
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 类型擦除的组件对象
    pub fn object(&self) -> &AnyInstance {
        &self.object
    }

    /// 当前生命周期状态
    pub fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    /// 转换生命周期状态
    pub fn transition(&self, next: InstanceState) -> DependencyResult<()> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(DependencyError::lifecycle(format!(
                "{} 实例 {} 不能从 {} 转换到 {}",
                self.component, self.id, *state, next
            )));
        }
        *state = next;
        Ok(())
    }

    /// 获取具体类型的组件对象
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("component", &self.component.name())
            .field("scope", &self.scope)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Green;

    fn green_instance() -> Instance {
        Instance::constructed(ComponentId::of::<Green>(), Scope::Dependent, Arc::new(Green))
    }

    #[test]
    fn test_instance_lifecycle() {
        let instance = green_instance();
        assert_eq!(instance.state(), InstanceState::Constructed);

        instance.transition(InstanceState::Wired).unwrap();
        instance.transition(InstanceState::Ready).unwrap();
        assert!(instance.transition(InstanceState::Wired).is_err());

        instance.transition(InstanceState::Destroyed).unwrap();
        assert_eq!(instance.state(), InstanceState::Destroyed);
    }

    #[test]
    fn test_downcast() {
        let instance = green_instance();
        assert!(instance.downcast::<Green>().is_some());
        assert!(instance.downcast::<String>().is_none());
    }

    #[test]
    fn test_distinct_ids() {
        assert_ne!(green_instance().id(), green_instance().id());
    }
}
