//! 声明来源抽象接口
//!
//! 模块把已类型化的组件声明交给引擎

use crate::descriptor::ManagedComponentDeclaration;

/// 声明来源 trait
pub trait DeclarationSource: Send + Sync {
    /// 来源名称
    fn name(&self) -> &str;

    /// 来源提供的声明，已标记来源名称
    fn declarations(&self) -> Vec<ManagedComponentDeclaration>;
}
