//! 延迟注入槽位

use std::sync::{Arc, OnceLock};
use tracing::debug;

/// 延迟注入的依赖
///
/// 组件以 `Arc` 共享，setter/字段注入通过该槽位在构造后写入依赖。
/// 只接受第一次注入。
pub struct Injected<T: ?Sized> {
    slot: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Injected<T> {
    /// 创建空槽位
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// 注入依赖，槽位已有值时忽略并记录
    pub fn inject(&self, value: Arc<T>) {
        if !self.try_inject(value) {
            debug!(
                target_type = std::any::type_name::<T>(),
                "槽位已注入，忽略重复注入"
            );
        }
    }

    /// 尝试注入依赖，槽位已有值时返回 `false`
    pub fn try_inject(&self, value: Arc<T>) -> bool {
        self.slot.set(value).is_ok()
    }

    /// 获取已注入的依赖
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    /// 是否已注入
    pub fn is_injected(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injected")
            .field("type", &std::any::type_name::<T>())
            .field("injected", &self.is_injected())
            .finish()
    }
}
