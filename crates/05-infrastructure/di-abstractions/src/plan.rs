//! 解析计划
//!
//! 解析器的输出：每个注入点的提供者绑定、依赖边以及按依赖优先排序的构造分组

use crate::descriptor::InjectionKind;
use infrastructure_common::{ComponentId, TypeKey};
use std::collections::HashMap;

/// 依赖边：组件 -> 提供组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionEdge {
    /// 依赖方
    pub from: ComponentId,
    /// 提供方
    pub to: ComponentId,
    /// 注入点成员
    pub member: String,
    /// 注入方式
    pub kind: InjectionKind,
}

impl ResolutionEdge {
    /// 是否为延迟边
    pub fn is_deferred(&self) -> bool {
        self.kind.is_deferred()
    }
}

/// 注入点绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// 提供组件
    pub provider: ComponentId,
    /// 使用的能力类型
    pub capability: TypeKey,
}

/// 构造分组
///
/// 单个无环组件，或仅由延迟边连接的强连通组件集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionGroup {
    /// 组成员
    pub members: Vec<ComponentId>,
    /// 是否为环
    pub cyclic: bool,
}

impl ConstructionGroup {
    /// 是否包含指定组件
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.members.contains(id)
    }
}

/// 解析计划
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    bindings: HashMap<(ComponentId, String), Binding>,
    edges: Vec<ResolutionEdge>,
    groups: Vec<ConstructionGroup>,
    group_of: HashMap<ComponentId, usize>,
}

impl ResolutionPlan {
    /// 创建解析计划
    pub fn new(
        bindings: HashMap<(ComponentId, String), Binding>,
        edges: Vec<ResolutionEdge>,
        groups: Vec<ConstructionGroup>,
    ) -> Self {
        let group_of = groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| group.members.iter().map(move |id| (*id, index)))
            .collect();
        Self {
            bindings,
            edges,
            groups,
            group_of,
        }
    }

    /// 获取注入点绑定
    pub fn binding(&self, owner: &ComponentId, member: &str) -> Option<&Binding> {
        self.bindings.get(&(*owner, member.to_string()))
    }

    /// 绑定数量
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// 所有依赖边
    pub fn edges(&self) -> &[ResolutionEdge] {
        &self.edges
    }

    /// 组件的出边
    pub fn dependencies_of<'a>(
        &'a self,
        id: &'a ComponentId,
    ) -> impl Iterator<Item = &'a ResolutionEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.from == *id)
    }

    /// 构造分组，依赖优先
    pub fn groups(&self) -> &[ConstructionGroup] {
        &self.groups
    }

    /// 组件所在分组
    pub fn group_of(&self, id: &ComponentId) -> Option<&ConstructionGroup> {
        self.group_of.get(id).map(|index| &self.groups[*index])
    }

    /// 组件在构造顺序中的分组位置
    pub fn position(&self, id: &ComponentId) -> Option<usize> {
        self.group_of.get(id).copied()
    }

    /// 扁平化的构造顺序
    pub fn construction_order(&self) -> Vec<ComponentId> {
        self.groups
            .iter()
            .flat_map(|group| group.members.iter().copied())
            .collect()
    }

    /// 环分组数量
    pub fn cyclic_group_count(&self) -> usize {
        self.groups.iter().filter(|group| group.cyclic).count()
    }
}
