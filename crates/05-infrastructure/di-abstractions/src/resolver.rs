//! 依赖解析器抽象接口
//!
//! 把注入点绑定到提供组件，并产生构造计划

use crate::container::DeclarationSet;
use crate::plan::ResolutionPlan;
use crate::scanner::InjectionPointIndex;
use infrastructure_common::DependencyResult;

/// 依赖解析器 trait
///
/// 所有解析类错误都必须在这里发现，任何实例构造之前
pub trait DependencyResolver: Send + Sync {
    /// 解析依赖并生成计划
    fn resolve(
        &self,
        index: &InjectionPointIndex,
        declarations: &DeclarationSet,
    ) -> DependencyResult<ResolutionPlan>;
}
