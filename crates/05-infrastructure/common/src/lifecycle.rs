//! 组件作用域与实例生命周期

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 单例模式 - 注册表生命周期内只创建一个实例
    Singleton,
    /// 依赖模式 - 每次注入都创建新实例
    #[default]
    Dependent,
}

impl Scope {
    /// 是否为单例
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Dependent => f.write_str("dependent"),
        }
    }
}

/// 实例生命周期状态
///
/// `Unconstructed -> Constructed -> Wired -> Ready`，
/// 只有在注册表关闭时才会进入 `Destroyed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    /// 尚未构造
    Unconstructed,
    /// 已构造，延迟注入点尚未注入
    Constructed,
    /// 延迟注入点已全部注入
    Wired,
    /// 就绪回调已执行，可以对外提供
    Ready,
    /// 已销毁
    Destroyed,
}

impl InstanceState {
    /// 检查状态转换是否合法
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unconstructed, Self::Constructed)
                | (Self::Constructed, Self::Wired)
                | (Self::Wired, Self::Ready)
                | (Self::Constructed | Self::Wired | Self::Ready, Self::Destroyed)
        )
    }

    /// 是否已完成注入
    pub fn is_wired(self) -> bool {
        matches!(self, Self::Wired | Self::Ready)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
