//! 容器配置、统计与声明集合

use crate::descriptor::ManagedComponentDeclaration;
use infrastructure_common::{
    ComponentId, ConfigError, ConfigResult, DependencyError, DependencyResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// 配置节名称
pub const CONTAINER_SECTION: &str = "container";

/// 重复声明合并策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// 拒绝重复声明
    #[default]
    Reject,
    /// 保留先注册的声明
    FirstRegisteredWins,
    /// 后注册的声明覆盖先注册的
    LastRegisteredWins,
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否允许仅由 setter/字段注入构成的循环
    pub allow_deferred_cycles: bool,
    /// 是否在构建时创建所有单例
    pub eager_singletons: bool,
    /// 等待其他线程创建单例的超时时间（毫秒），未设置时一直等待
    pub creation_wait_timeout_ms: Option<u64>,
    /// 关闭时等待进行中创建的超时时间（毫秒）
    pub teardown_timeout_ms: u64,
    /// 重复声明合并策略
    pub merge_policy: MergePolicy,
}

impl ContainerConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.creation_wait_timeout_ms == Some(0) {
            return Err(ConfigError::validation(
                "container.creation_wait_timeout_ms 必须大于 0",
            ));
        }
        if self.teardown_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "container.teardown_timeout_ms 必须大于 0",
            ));
        }
        Ok(())
    }

    /// 单例创建等待超时
    pub fn creation_wait_timeout(&self) -> Option<Duration> {
        self.creation_wait_timeout_ms.map(Duration::from_millis)
    }

    /// 关闭等待超时
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_deferred_cycles: true,
            eager_singletons: false,
            creation_wait_timeout_ms: None,
            teardown_timeout_ms: 5000,
            merge_policy: MergePolicy::Reject,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 单例组件数量
    pub singleton_components: usize,
    /// 注入点数量
    pub injection_points: usize,
    /// 构造分组数量
    pub construction_groups: usize,
    /// 环分组数量
    pub cyclic_groups: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
    /// 存活的依赖作用域实例数量
    pub live_dependents: usize,
    /// 累计创建的实例数量
    pub instances_created: u64,
}

/// 声明集合
///
/// 按注册顺序保存声明，组件标识唯一
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
    declarations: Vec<ManagedComponentDeclaration>,
    positions: HashMap<ComponentId, usize>,
}

impl DeclarationSet {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 按合并策略插入声明
    pub fn insert(
        &mut self,
        declaration: ManagedComponentDeclaration,
        policy: MergePolicy,
    ) -> DependencyResult<()> {
        let Some(&position) = self.positions.get(&declaration.id()) else {
            self.positions
                .insert(declaration.id(), self.declarations.len());
            self.declarations.push(declaration);
            return Ok(());
        };

        let existing = &self.declarations[position];
        warn!(
            component = %declaration.id(),
            first_source = existing.source(),
            second_source = declaration.source(),
            policy = ?policy,
            "检测到重复的组件声明"
        );

        match policy {
            MergePolicy::Reject => Err(DependencyError::DuplicateComponent {
                type_name: declaration.id().name().to_string(),
                first_source: existing.source().to_string(),
                second_source: declaration.source().to_string(),
            }),
            MergePolicy::FirstRegisteredWins => Ok(()),
            MergePolicy::LastRegisteredWins => {
                self.declarations[position] = declaration;
                Ok(())
            }
        }
    }

    /// 合并另一个集合
    pub fn merge(&mut self, other: DeclarationSet, policy: MergePolicy) -> DependencyResult<()> {
        for declaration in other.declarations {
            self.insert(declaration, policy)?;
        }
        Ok(())
    }

    /// 获取声明
    pub fn get(&self, id: &ComponentId) -> Option<&ManagedComponentDeclaration> {
        self.positions.get(id).map(|position| &self.declarations[*position])
    }

    /// 是否包含组件
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.positions.contains_key(id)
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> std::slice::Iter<'_, ManagedComponentDeclaration> {
        self.declarations.iter()
    }

    /// 组件标识列表
    pub fn ids(&self) -> Vec<ComponentId> {
        self.declarations.iter().map(|decl| decl.id()).collect()
    }

    /// 声明数量
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeclarationSet {
    type Item = &'a ManagedComponentDeclaration;
    type IntoIter = std::slice::Iter<'a, ManagedComponentDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
