//! 元数据定义
//!
//! 提供组件标识、类型键和注入限定符

use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型键
///
/// 以 `TypeId` 标识类型，同时保留类型名称用于日志和错误信息。
/// 支持非定长类型，因此 `dyn Trait` 也可以作为注入目标类型。
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    /// 类型ID
    id: TypeId,
    /// 完整类型名称
    name: &'static str,
}

impl TypeKey {
    /// 从类型获取类型键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 获取类型ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 获取完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    ///
    /// 泛型类型保留完整名称，避免截断出无意义的片段。
    pub fn short_name(&self) -> &'static str {
        if self.name.contains('<') {
            return self.name;
        }
        let short = self.name.rsplit("::").next().unwrap_or(self.name);
        if let Some(stripped) = self.name.strip_prefix("dyn ") {
            if !stripped.contains("::") {
                return stripped;
            }
        }
        short
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 组件标识
///
/// 组件以其实现类型作为唯一标识。
pub type ComponentId = TypeKey;

/// 注入限定符
///
/// 当多个组件都能满足同一个所需类型时，用于消除歧义。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifier(String);

impl Qualifier {
    /// 创建新的限定符
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 获取限定符字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Qualifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Qualifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
