//! 注入点索引抽象
//!
//! 把组件声明中的注入点归一化为带所需类型的索引

use crate::container::DeclarationSet;
use crate::descriptor::InjectionPoint;
use infrastructure_common::{ComponentId, DependencyResult};
use std::collections::HashMap;

/// 注入点索引
///
/// 组件标识到有序注入点列表的映射，每个声明都有条目（可能为空）
#[derive(Debug, Clone, Default)]
pub struct InjectionPointIndex {
    order: Vec<ComponentId>,
    points: HashMap<ComponentId, Vec<InjectionPoint>>,
}

impl InjectionPointIndex {
    /// 创建空索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记组件的注入点
    pub fn insert(&mut self, component: ComponentId, points: Vec<InjectionPoint>) {
        if self.points.insert(component, points).is_none() {
            self.order.push(component);
        }
    }

    /// 获取组件的注入点
    pub fn get(&self, component: &ComponentId) -> &[InjectionPoint] {
        self.points.get(component).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 是否包含组件
    pub fn contains(&self, component: &ComponentId) -> bool {
        self.points.contains_key(component)
    }

    /// 按登记顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&ComponentId, &[InjectionPoint])> {
        self.order
            .iter()
            .map(move |id| (id, self.get(id)))
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 注入点总数
    pub fn point_count(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }
}

/// 注入点扫描器 trait
///
/// 根据声明集合构建注入点索引
pub trait InjectionPointScanner: Send + Sync {
    /// 构建注入点索引
    fn build_index(&self, declarations: &DeclarationSet) -> DependencyResult<InjectionPointIndex>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}
