//! 注入点索引构建

use di_abstractions::{
    DeclarationSet, InjectionPoint, InjectionPointIndex, InjectionPointScanner,
    ManagedComponentDeclaration,
};
use infrastructure_common::{DependencyError, DependencyResult, TypeKey};
use std::collections::HashSet;
use tracing::debug;

/// 默认注入点扫描器
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInjectionPointScanner;

impl DefaultInjectionPointScanner {
    /// 创建新的扫描器
    pub fn new() -> Self {
        Self
    }
}

impl InjectionPointScanner for DefaultInjectionPointScanner {
    fn build_index(&self, declarations: &DeclarationSet) -> DependencyResult<InjectionPointIndex> {
        build_index(declarations)
    }

    fn name(&self) -> &str {
        "default"
    }
}

/// 构建注入点索引
///
/// 所需类型优先取描述符声明的类型，否则取成员绑定的参数类型
pub fn build_index(declarations: &DeclarationSet) -> DependencyResult<InjectionPointIndex> {
    let mut index = InjectionPointIndex::new();

    for declaration in declarations {
        let points = index_component(declaration)?;
        debug!(
            component = %declaration.id(),
            points = points.len(),
            "注入点已索引"
        );
        index.insert(declaration.id(), points);
    }

    Ok(index)
}

fn index_component(
    declaration: &ManagedComponentDeclaration,
) -> DependencyResult<Vec<InjectionPoint>> {
    let mut members = HashSet::new();
    let mut points = Vec::with_capacity(declaration.injection_points().len());

    for decl in declaration.injection_points() {
        let invalid = |reason: String| DependencyError::AmbiguousInjectionPoint {
            component: declaration.name().to_string(),
            member: decl.member.clone(),
            reason,
        };

        if !members.insert(decl.member.as_str()) {
            return Err(invalid("同一成员被多次声明为注入点".to_string()));
        }

        let required_type = required_type(decl.declared_type, decl.binding.parameter_type())
            .map_err(invalid)?;

        if decl.kind.is_deferred() && decl.binding.setter().is_none() {
            return Err(invalid(format!("{} 注入点没有可用的 setter", decl.kind)));
        }

        points.push(InjectionPoint::new(declaration.id(), decl, required_type));
    }

    Ok(points)
}

fn required_type(declared: Option<TypeKey>, parameter: Option<TypeKey>) -> Result<TypeKey, String> {
    match (declared, parameter) {
        (Some(declared), Some(parameter)) if declared != parameter => Err(format!(
            "声明类型 {} 与参数类型 {} 不一致",
            declared.name(),
            parameter.name()
        )),
        (Some(required), _) | (None, Some(required)) => Ok(required),
        (None, None) => Err("无法确定所需类型".to_string()),
    }
}
