//! 注入器
//!
//! 为已构造实例执行 setter/字段注入。构造器注入点在构造前由容器解析。

use di_abstractions::{Binding, DependencyHandle, InjectionPoint, Instance, ResolutionPlan};
use infrastructure_common::{DependencyError, DependencyResult, InstanceState};
use tracing::debug;

/// 依赖提供函数：按绑定取得（必要时创建）提供者并投影为所需类型
pub type Provide<'a> = &'a mut dyn FnMut(&Binding) -> DependencyResult<DependencyHandle>;

/// 注入器
#[derive(Debug, Clone, Copy, Default)]
pub struct Injector;

impl Injector {
    /// 创建新的注入器
    pub fn new() -> Self {
        Self
    }

    /// 注入实例的所有延迟注入点
    ///
    /// 实例已处于 `Wired` 或 `Ready` 时不做任何事并返回 `false`。
    pub fn wire(
        &self,
        instance: &Instance,
        points: &[InjectionPoint],
        plan: &ResolutionPlan,
        provide: Provide<'_>,
    ) -> DependencyResult<bool> {
        if instance.state().is_wired() {
            debug!(component = %instance.component(), "实例已注入, 跳过");
            return Ok(false);
        }

        for point in points.iter().filter(|point| point.is_deferred()) {
            let binding = plan.binding(&point.component, &point.member).ok_or_else(|| {
                DependencyError::injection_failed(
                    point.component.name(),
                    &point.member,
                    "解析计划中没有该注入点的绑定",
                )
            })?;

            let handle = provide(binding)?;
            point.apply(instance.object(), &handle)?;

            debug!(
                component = %point.component,
                member = %point.member,
                provider = %binding.provider,
                "依赖已注入"
            );
        }

        instance.transition(InstanceState::Wired)?;
        Ok(true)
    }
}
