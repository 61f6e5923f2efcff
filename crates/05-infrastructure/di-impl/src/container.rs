//! 依赖注入容器
//!
//! 构建时完成索引与解析（任何错误都在构造实例之前暴露），
//! 运行时按解析计划惰性创建对象图。

use crate::index::DefaultInjectionPointScanner;
use crate::injector::Injector;
use crate::registry::{Claim, DestroyHook, InstanceRegistry};
use crate::resolver::GraphResolver;
use di_abstractions::{
    Binding, ConstructionGroup, ConstructorArgs, ContainerConfig, ContainerStats, DeclarationSet,
    DependencyHandle, DependencyResolver, InjectionKind, InjectionPointIndex,
    InjectionPointScanner, Instance, ManagedComponent, ManagedComponentDeclaration, ResolutionPlan,
    ScopeManager,
};
use infrastructure_common::{
    ComponentId, DependencyError, DependencyResult, InstanceState, Qualifier, TypeKey,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 一次构造请求的上下文
///
/// 环成员在注入完成之前先登记在这里，使同一对象图内共享同一个实例。
#[derive(Default)]
struct Session {
    early: HashMap<ComponentId, Arc<Instance>>,
}

/// 依赖注入容器构建器
#[derive(Default)]
pub struct DiContainerBuilder {
    declarations: Vec<ManagedComponentDeclaration>,
    config: ContainerConfig,
}

impl DiContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置容器配置
    #[must_use]
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 注册组件声明
    #[must_use]
    pub fn register(mut self, declaration: ManagedComponentDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// 注册托管组件类型
    #[must_use]
    pub fn register_component<T: ManagedComponent>(self) -> Self {
        self.register(T::declaration())
    }

    /// 注册整个声明集合
    #[must_use]
    pub fn register_set(mut self, declarations: DeclarationSet) -> Self {
        self.declarations.extend(declarations.iter().cloned());
        self
    }

    /// 构建容器
    ///
    /// 依次执行合并、索引和解析，任一步失败都不会产生容器。
    pub fn build(self) -> DependencyResult<DiContainer> {
        self.config
            .validate()
            .map_err(|e| DependencyError::lifecycle(format!("容器配置无效: {e}")))?;

        let mut declarations = DeclarationSet::new();
        for declaration in self.declarations {
            declarations.insert(declaration, self.config.merge_policy)?;
        }
        let declarations = Arc::new(declarations);

        let index = DefaultInjectionPointScanner::new().build_index(&declarations)?;
        let plan = GraphResolver::from_config(&self.config).resolve(&index, &declarations)?;

        let hook_declarations = Arc::clone(&declarations);
        let destroy_hook: DestroyHook = Arc::new(move |component, object| {
            if let Some(declaration) = hook_declarations.get(&component) {
                declaration.run_on_destroy(object);
            }
        });
        let registry = InstanceRegistry::from_config(&self.config).with_destroy_hook(destroy_hook);

        let container = DiContainer {
            declarations,
            index,
            plan,
            registry,
            injector: Injector::new(),
            config: self.config,
        };

        info!(
            components = container.declarations.len(),
            injection_points = container.index.point_count(),
            "依赖注入容器构建完成"
        );

        if container.config.eager_singletons {
            container.instantiate_eager_singletons()?;
        }

        Ok(container)
    }
}

/// 依赖注入容器
pub struct DiContainer {
    declarations: Arc<DeclarationSet>,
    index: InjectionPointIndex,
    plan: ResolutionPlan,
    registry: InstanceRegistry,
    injector: Injector,
    config: ContainerConfig,
}

impl DiContainer {
    /// 创建构建器
    pub fn builder() -> DiContainerBuilder {
        DiContainerBuilder::new()
    }

    /// 按类型获取组件（类型可以是 `dyn Trait`）
    pub fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup(TypeKey::of::<T>(), None)
    }

    /// 按类型和限定符获取组件
    pub fn get_qualified<T>(&self, qualifier: impl Into<Qualifier>) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup(TypeKey::of::<T>(), Some(qualifier.into()))
    }

    /// 获取组件实例
    pub fn instance_of(&self, component: &ComponentId) -> DependencyResult<Arc<Instance>> {
        self.instance_in(component, &mut Session::default())
    }

    /// 解析计划
    pub fn plan(&self) -> &ResolutionPlan {
        &self.plan
    }

    /// 注入点索引
    pub fn index(&self) -> &InjectionPointIndex {
        &self.index
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 组件声明
    pub fn declaration(&self, component: &ComponentId) -> Option<&ManagedComponentDeclaration> {
        self.declarations.get(component)
    }

    /// 检查是否有组件能以指定类型注入
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        let key = TypeKey::of::<T>();
        self.declarations.iter().any(|decl| decl.provides(&key))
    }

    /// 所有已注册组件
    pub fn registered_components(&self) -> Vec<ComponentId> {
        self.declarations.ids()
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_components: self.declarations.len(),
            singleton_components: self
                .declarations
                .iter()
                .filter(|decl| decl.scope().is_singleton())
                .count(),
            injection_points: self.index.point_count(),
            construction_groups: self.plan.groups().len(),
            cyclic_groups: self.plan.cyclic_group_count(),
            active_singletons: self.registry.active_singletons(),
            live_dependents: self.registry.live_dependents(),
            instances_created: self.registry.instances_created(),
        }
    }

    /// 创建所有单例
    ///
    /// 任一单例创建失败时关闭注册表并返回错误
    pub fn instantiate_eager_singletons(&self) -> DependencyResult<usize> {
        let singletons: Vec<ComponentId> = self
            .plan
            .construction_order()
            .into_iter()
            .filter(|id| {
                self.declarations
                    .get(id)
                    .is_some_and(|decl| decl.scope().is_singleton())
            })
            .collect();

        for component in &singletons {
            if let Err(e) = self.instance_of(component) {
                error!(component = %component, error = %e, "预先创建单例失败");
                if let Err(teardown_error) = self.registry.teardown() {
                    error!(error = %teardown_error, "关闭注册表失败");
                }
                return Err(e);
            }
        }

        info!(count = singletons.len(), "单例已预先创建");
        Ok(singletons.len())
    }

    /// 关闭容器，销毁所有实例
    pub fn shutdown(&self) -> DependencyResult<()> {
        self.registry.teardown()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }

    fn lookup<T>(&self, key: TypeKey, qualifier: Option<Qualifier>) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let candidates: Vec<&ManagedComponentDeclaration> = self
            .declarations
            .iter()
            .filter(|decl| decl.provides(&key))
            .filter(|decl| qualifier.as_ref().map_or(true, |q| decl.has_qualifier(q)))
            .collect();

        let provider = match candidates.as_slice() {
            [] => {
                return Err(DependencyError::not_registered(match &qualifier {
                    Some(q) => format!("{q} {}", key.name()),
                    None => key.name().to_string(),
                }))
            }
            [provider] => provider.id(),
            _ => {
                return Err(DependencyError::AmbiguousDependency {
                    component: "<lookup>".to_string(),
                    injection_point: key.short_name().to_string(),
                    required_type: key.name().to_string(),
                    candidates: candidates.iter().map(|d| d.name().to_string()).collect(),
                })
            }
        };

        let instance = self.instance_of(&provider)?;
        let handle = self.project(
            &instance,
            &Binding {
                provider,
                capability: key,
            },
        )?;
        handle.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
            DependencyError::injection_failed(key.name(), "<lookup>", "能力投影类型不匹配")
        })
    }

    fn instance_in(
        &self,
        component: &ComponentId,
        session: &mut Session,
    ) -> DependencyResult<Arc<Instance>> {
        if let Some(instance) = session.early.get(component) {
            return Ok(Arc::clone(instance));
        }

        let declaration = self
            .declarations
            .get(component)
            .ok_or_else(|| DependencyError::not_registered(component.name()))?;
        let group = self
            .plan
            .group_of(component)
            .ok_or_else(|| DependencyError::not_registered(component.name()))?;

        if group.cyclic {
            return self.realize_cycle(component, group, session);
        }

        self.registry
            .get_or_create(component, declaration.scope(), &mut || {
                self.build_single(declaration, session)
            })
    }

    /// 构造、注入并就绪单个无环组件
    fn build_single(
        &self,
        declaration: &ManagedComponentDeclaration,
        session: &mut Session,
    ) -> DependencyResult<Arc<Instance>> {
        let instance = self.construct(declaration, session)?;
        self.injector.wire(
            &instance,
            self.index.get(&declaration.id()),
            &self.plan,
            &mut |binding| self.provide(binding, session),
        )?;
        self.make_ready(declaration, &instance)?;
        Ok(instance)
    }

    /// 实现环分组：先构造全部成员，再统一注入
    fn realize_cycle(
        &self,
        root: &ComponentId,
        group: &ConstructionGroup,
        session: &mut Session,
    ) -> DependencyResult<Arc<Instance>> {
        let _flight = self.registry.begin(root)?;
        if let Some(instance) = self.registry.singleton(root) {
            return Ok(instance);
        }
        let members = self.reachable_within(root, group);
        let singletons: Vec<ComponentId> = members
            .iter()
            .copied()
            .filter(|id| {
                self.declarations
                    .get(id)
                    .is_some_and(|decl| decl.scope().is_singleton())
            })
            .collect();

        // 失败或 panic 时由 claim 释放全部槽位
        let claim = self.registry.claim_group(&singletons)?;
        let mut fresh = Vec::new();
        let result = self.construct_cycle(&members, claim.claims(), session, &mut fresh);

        let root_instance = session.early.get(root).cloned();
        for member in &members {
            session.early.remove(member);
        }
        result?;

        let (published, dependents): (Vec<Arc<Instance>>, Vec<Arc<Instance>>) = fresh
            .into_iter()
            .partition(|instance| instance.scope().is_singleton());
        claim.publish(&published);
        for instance in &dependents {
            self.registry.track(instance);
        }

        debug!(
            root = %root,
            members = members.len(),
            created = published.len() + dependents.len(),
            "环分组已实现"
        );

        root_instance.ok_or_else(|| DependencyError::not_registered(root.name()))
    }

    fn construct_cycle(
        &self,
        members: &[ComponentId],
        claims: &HashMap<ComponentId, Claim>,
        session: &mut Session,
        fresh: &mut Vec<Arc<Instance>>,
    ) -> DependencyResult<()> {
        for member in members {
            if let Some(Claim::Ready(instance)) = claims.get(member) {
                session.early.insert(*member, Arc::clone(instance));
                continue;
            }
            let declaration = self
                .declarations
                .get(member)
                .ok_or_else(|| DependencyError::not_registered(member.name()))?;
            let instance = self.construct(declaration, session)?;
            session.early.insert(*member, Arc::clone(&instance));
            fresh.push(instance);
        }

        for instance in fresh.iter() {
            self.injector.wire(
                instance,
                self.index.get(&instance.component()),
                &self.plan,
                &mut |binding| self.provide(binding, session),
            )?;
        }

        for instance in fresh.iter() {
            let declaration = self
                .declarations
                .get(&instance.component())
                .ok_or_else(|| DependencyError::not_registered(instance.component().name()))?;
            self.make_ready(declaration, instance)?;
        }

        Ok(())
    }

    /// 在分组内从 root 出发可达的成员
    fn reachable_within(&self, root: &ComponentId, group: &ConstructionGroup) -> Vec<ComponentId> {
        let mut seen = HashSet::from([*root]);
        let mut members = vec![*root];
        let mut queue = VecDeque::from([*root]);

        while let Some(current) = queue.pop_front() {
            for edge in self.plan.dependencies_of(&current) {
                if group.contains(&edge.to) && seen.insert(edge.to) {
                    members.push(edge.to);
                    queue.push_back(edge.to);
                }
            }
        }

        members
    }

    /// 解析构造器参数并执行构造路径
    fn construct(
        &self,
        declaration: &ManagedComponentDeclaration,
        session: &mut Session,
    ) -> DependencyResult<Arc<Instance>> {
        let mut args = ConstructorArgs::new(declaration.name());
        for point in self
            .index
            .get(&declaration.id())
            .iter()
            .filter(|point| point.kind == InjectionKind::Constructor)
        {
            let binding = self
                .plan
                .binding(&declaration.id(), &point.member)
                .ok_or_else(|| {
                    DependencyError::injection_failed(
                        declaration.name(),
                        &point.member,
                        "解析计划中没有该注入点的绑定",
                    )
                })?;
            args.insert(point.member.clone(), self.provide(binding, session)?);
        }

        let object = declaration.construct(&args).map_err(|e| {
            error!(component = %declaration.id(), error = %e, "组件构造失败");
            e
        })?;
        let instance = Arc::new(Instance::constructed(
            declaration.id(),
            declaration.scope(),
            object,
        ));
        debug!(
            component = %declaration.id(),
            instance = %instance.id(),
            scope = %declaration.scope(),
            "组件已构造"
        );
        Ok(instance)
    }

    fn provide(&self, binding: &Binding, session: &mut Session) -> DependencyResult<DependencyHandle> {
        let provider = self.instance_in(&binding.provider, session)?;
        self.project(&provider, binding)
    }

    fn project(&self, instance: &Instance, binding: &Binding) -> DependencyResult<DependencyHandle> {
        self.declarations
            .get(&binding.provider)
            .and_then(|decl| decl.capability(&binding.capability))
            .and_then(|capability| capability.project(instance.object()))
            .ok_or_else(|| {
                DependencyError::injection_failed(
                    binding.provider.name(),
                    binding.capability.name(),
                    "提供者无法投影为所需类型",
                )
            })
    }

    fn make_ready(
        &self,
        declaration: &ManagedComponentDeclaration,
        instance: &Instance,
    ) -> DependencyResult<()> {
        declaration.run_on_ready(instance.object())?;
        instance.transition(InstanceState::Ready)
    }
}

impl std::fmt::Debug for DiContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiContainer")
            .field("components", &self.declarations.len())
            .field("groups", &self.plan.groups().len())
            .field("closed", &self.registry.is_closed())
            .finish()
    }
}
