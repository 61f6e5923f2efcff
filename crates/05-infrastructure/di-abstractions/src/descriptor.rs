//! 托管组件声明
//!
//! 声明描述组件的身份、作用域、能力集合、限定符、注入点、
//! 构造路径以及生命周期回调。声明构建完成后不可变。

use crate::factory::{AnyInstance, ConstructFn, ConstructorArgs, DependencyHandle};
use infrastructure_common::{
    ComponentId, DependencyError, DependencyResult, Qualifier, Scope, TypeKey,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 默认声明来源名称
pub const DEFAULT_SOURCE: &str = "default";

/// 能力投影函数：把组件对象转换为依赖句柄
pub type CastFn = Arc<dyn Fn(&AnyInstance) -> Option<DependencyHandle> + Send + Sync>;

/// 成员注入函数：把依赖句柄写入目标对象
pub type SetterFn = Arc<dyn Fn(&AnyInstance, &DependencyHandle) -> DependencyResult<()> + Send + Sync>;

type ReadyFn = Arc<dyn Fn(&AnyInstance) -> DependencyResult<()> + Send + Sync>;
type DestroyFn = Arc<dyn Fn(&AnyInstance) + Send + Sync>;

/// 注入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionKind {
    /// 构造器注入，必须在构造前解析
    Constructor,
    /// setter 注入，构造后执行
    Setter,
    /// 字段注入，构造后执行
    Field,
}

impl InjectionKind {
    /// 是否为延迟注入（构造后执行）
    pub fn is_deferred(self) -> bool {
        !matches!(self, Self::Constructor)
    }
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor => f.write_str("constructor"),
            Self::Setter => f.write_str("setter"),
            Self::Field => f.write_str("field"),
        }
    }
}

/// 组件能力
///
/// 组件可以被注入为的类型：实现类型本身或声明的父类型/trait。
#[derive(Clone)]
pub struct Capability {
    type_key: TypeKey,
    cast: CastFn,
}

impl Capability {
    /// 实现类型本身的能力
    pub fn of_self<T: Send + Sync + 'static>() -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            cast: Arc::new(|object: &AnyInstance| {
                object
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Arc::new(typed) as DependencyHandle)
            }),
        }
    }

    /// 通过投影函数声明的能力
    pub fn projected<T, R, F>(project: F) -> Self
    where
        T: Send + Sync + 'static,
        R: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<R> + Send + Sync + 'static,
    {
        Self {
            type_key: TypeKey::of::<R>(),
            cast: Arc::new(move |object: &AnyInstance| {
                object
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Arc::new(project(typed)) as DependencyHandle)
            }),
        }
    }

    /// 能力类型
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// 把组件对象投影为该能力的依赖句柄
    pub fn project(&self, object: &AnyInstance) -> Option<DependencyHandle> {
        (self.cast)(object)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.type_key.name()).finish()
    }
}

/// 成员绑定
///
/// 类型化的 setter 知道参数类型；描述符驱动的类型擦除 setter 不知道。
#[derive(Clone, Default)]
pub struct MemberBinding {
    parameter_type: Option<TypeKey>,
    apply: Option<SetterFn>,
}

impl MemberBinding {
    /// 只有参数类型，没有注入函数（构造器参数）
    pub fn parameter(parameter_type: TypeKey) -> Self {
        Self {
            parameter_type: Some(parameter_type),
            apply: None,
        }
    }

    /// 类型化的注入函数
    pub fn typed(parameter_type: TypeKey, apply: SetterFn) -> Self {
        Self {
            parameter_type: Some(parameter_type),
            apply: Some(apply),
        }
    }

    /// 类型擦除的注入函数
    pub fn erased(apply: SetterFn) -> Self {
        Self {
            parameter_type: None,
            apply: Some(apply),
        }
    }

    /// 参数类型
    pub fn parameter_type(&self) -> Option<TypeKey> {
        self.parameter_type
    }

    /// 注入函数
    pub fn setter(&self) -> Option<&SetterFn> {
        self.apply.as_ref()
    }
}

impl fmt::Debug for MemberBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberBinding")
            .field("parameter_type", &self.parameter_type.map(|t| t.name()))
            .field("has_setter", &self.apply.is_some())
            .finish()
    }
}

/// 声明形式的注入点
#[derive(Debug, Clone)]
pub struct InjectionPointDecl {
    /// 目标成员
    pub member: String,
    /// 注入方式
    pub kind: InjectionKind,
    /// 描述符元数据中声明的类型
    pub declared_type: Option<TypeKey>,
    /// 限定符
    pub qualifier: Option<Qualifier>,
    /// 成员绑定
    pub binding: MemberBinding,
}

/// 索引形式的注入点
#[derive(Clone)]
pub struct InjectionPoint {
    /// 所属组件
    pub component: ComponentId,
    /// 目标成员
    pub member: String,
    /// 所需类型
    pub required_type: TypeKey,
    /// 限定符
    pub qualifier: Option<Qualifier>,
    /// 注入方式
    pub kind: InjectionKind,
    setter: Option<SetterFn>,
}

impl InjectionPoint {
    /// 创建索引形式的注入点
    pub fn new(
        component: ComponentId,
        decl: &InjectionPointDecl,
        required_type: TypeKey,
    ) -> Self {
        Self {
            component,
            member: decl.member.clone(),
            required_type,
            qualifier: decl.qualifier.clone(),
            kind: decl.kind,
            setter: decl.binding.setter().cloned(),
        }
    }

    /// 是否为延迟注入点
    pub fn is_deferred(&self) -> bool {
        self.kind.is_deferred()
    }

    /// 是否有可执行的注入函数
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// 把依赖句柄写入目标对象
    pub fn apply(&self, target: &AnyInstance, handle: &DependencyHandle) -> DependencyResult<()> {
        let setter = self.setter.as_ref().ok_or_else(|| {
            DependencyError::injection_failed(self.component.name(), &self.member, "注入点没有 setter")
        })?;
        setter(target, handle)
    }
}

impl fmt::Debug for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("component", &self.component.name())
            .field("member", &self.member)
            .field("required_type", &self.required_type.name())
            .field("qualifier", &self.qualifier)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.component, self.member, self.kind)
    }
}

/// 托管组件声明
#[derive(Clone)]
pub struct ManagedComponentDeclaration {
    id: ComponentId,
    name: String,
    scope: Scope,
    capabilities: Vec<Capability>,
    qualifiers: Vec<Qualifier>,
    injection_points: Vec<InjectionPointDecl>,
    constructor: ConstructFn,
    on_ready: Option<ReadyFn>,
    on_destroy: Option<DestroyFn>,
    source: String,
}

impl ManagedComponentDeclaration {
    /// 以 `Default` 构造的组件声明
    pub fn default_constructed<T>() -> DeclarationBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        DeclarationBuilder::new(Arc::new(|_: &ConstructorArgs| {
            Ok(Arc::new(T::default()) as AnyInstance)
        }))
    }

    /// 使用自定义构造函数的组件声明
    pub fn constructed_with<T, F>(construct: F) -> DeclarationBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ConstructorArgs) -> DependencyResult<T> + Send + Sync + 'static,
    {
        DeclarationBuilder::new(Arc::new(move |args: &ConstructorArgs| {
            construct(args).map(|object| Arc::new(object) as AnyInstance)
        }))
    }

    /// 组件标识
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// 显示名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 作用域
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// 能力集合
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// 查找指定类型的能力
    pub fn capability(&self, type_key: &TypeKey) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.type_key == *type_key)
    }

    /// 是否能以指定类型注入
    pub fn provides(&self, type_key: &TypeKey) -> bool {
        self.capability(type_key).is_some()
    }

    /// 限定符集合
    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    /// 是否带有指定限定符
    pub fn has_qualifier(&self, qualifier: &Qualifier) -> bool {
        self.qualifiers.contains(qualifier)
    }

    /// 声明的注入点
    pub fn injection_points(&self) -> &[InjectionPointDecl] {
        &self.injection_points
    }

    /// 声明来源
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否有销毁回调
    pub fn has_destroy_callback(&self) -> bool {
        self.on_destroy.is_some()
    }

    /// 覆盖作用域
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// 设置声明来源
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 执行构造路径
    pub fn construct(&self, args: &ConstructorArgs) -> DependencyResult<AnyInstance> {
        (self.constructor)(args)
    }

    /// 执行就绪回调
    pub fn run_on_ready(&self, object: &AnyInstance) -> DependencyResult<()> {
        match &self.on_ready {
            Some(on_ready) => on_ready(object),
            None => Ok(()),
        }
    }

    /// 执行销毁回调
    pub fn run_on_destroy(&self, object: &AnyInstance) {
        if let Some(on_destroy) = &self.on_destroy {
            on_destroy(object);
        }
    }
}

impl fmt::Debug for ManagedComponentDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedComponentDeclaration")
            .field("id", &self.id.name())
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("capabilities", &self.capabilities)
            .field("qualifiers", &self.qualifiers)
            .field("injection_points", &self.injection_points)
            .field("source", &self.source)
            .finish()
    }
}

/// 托管组件
///
/// 通常由 `#[derive(Managed)]` 生成实现
pub trait ManagedComponent: Send + Sync + 'static {
    /// 组件声明
    fn declaration() -> ManagedComponentDeclaration;
}

/// 组件声明构建器
pub struct DeclarationBuilder<T> {
    name: String,
    scope: Scope,
    capabilities: Vec<Capability>,
    qualifiers: Vec<Qualifier>,
    injection_points: Vec<InjectionPointDecl>,
    constructor: ConstructFn,
    on_ready: Option<ReadyFn>,
    on_destroy: Option<DestroyFn>,
    source: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DeclarationBuilder<T> {
    fn new(constructor: ConstructFn) -> Self {
        Self {
            name: TypeKey::of::<T>().short_name().to_string(),
            scope: Scope::default(),
            capabilities: vec![Capability::of_self::<T>()],
            qualifiers: Vec::new(),
            injection_points: Vec::new(),
            constructor,
            on_ready: None,
            on_destroy: None,
            source: DEFAULT_SOURCE.to_string(),
            _marker: PhantomData,
        }
    }

    /// 设置显示名称
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置作用域
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// 单例作用域
    #[must_use]
    pub fn singleton(self) -> Self {
        self.scope(Scope::Singleton)
    }

    /// 依赖作用域
    #[must_use]
    pub fn dependent(self) -> Self {
        self.scope(Scope::Dependent)
    }

    /// 添加限定符
    #[must_use]
    pub fn qualifier(mut self, qualifier: impl Into<Qualifier>) -> Self {
        let qualifier = qualifier.into();
        if !self.qualifiers.contains(&qualifier) {
            self.qualifiers.push(qualifier);
        }
        self
    }

    /// 声明额外能力，例如 `dyn Trait`
    #[must_use]
    pub fn capability<R, F>(mut self, project: F) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<R> + Send + Sync + 'static,
    {
        let capability = Capability::projected::<T, R, F>(project);
        self.capabilities
            .retain(|existing| existing.type_key != capability.type_key);
        self.capabilities.push(capability);
        self
    }

    /// 声明构造器依赖
    #[must_use]
    pub fn constructor_dependency<D>(self, member: impl Into<String>) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        self.push_point(
            member,
            InjectionKind::Constructor,
            None,
            MemberBinding::parameter(TypeKey::of::<D>()),
        )
    }

    /// 声明带限定符的构造器依赖
    #[must_use]
    pub fn constructor_dependency_qualified<D>(
        self,
        member: impl Into<String>,
        qualifier: impl Into<Qualifier>,
    ) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        self.push_point(
            member,
            InjectionKind::Constructor,
            Some(qualifier.into()),
            MemberBinding::parameter(TypeKey::of::<D>()),
        )
    }

    /// 声明 setter 注入点
    #[must_use]
    pub fn setter<D, F>(self, member: impl Into<String>, apply: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        self.typed_point(member, InjectionKind::Setter, None, apply)
    }

    /// 声明带限定符的 setter 注入点
    #[must_use]
    pub fn setter_qualified<D, F>(
        self,
        member: impl Into<String>,
        qualifier: impl Into<Qualifier>,
        apply: F,
    ) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        self.typed_point(member, InjectionKind::Setter, Some(qualifier.into()), apply)
    }

    /// 声明字段注入点
    #[must_use]
    pub fn field<D, F>(self, member: impl Into<String>, apply: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        self.typed_point(member, InjectionKind::Field, None, apply)
    }

    /// 声明带限定符的字段注入点
    #[must_use]
    pub fn field_qualified<D, F>(
        self,
        member: impl Into<String>,
        qualifier: impl Into<Qualifier>,
        apply: F,
    ) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        self.typed_point(member, InjectionKind::Field, Some(qualifier.into()), apply)
    }

    /// 声明类型擦除的 setter 注入点
    ///
    /// 所需类型只能来自 `declared_type`，注入函数收到的句柄内部为 `Arc<R>`。
    #[must_use]
    pub fn erased_setter<F>(
        mut self,
        member: impl Into<String>,
        declared_type: Option<TypeKey>,
        apply: F,
    ) -> Self
    where
        F: Fn(&T, &DependencyHandle) -> DependencyResult<()> + Send + Sync + 'static,
    {
        let member = member.into();
        let component = self.name.clone();
        let target_member = member.clone();
        let setter: SetterFn = Arc::new(move |target: &AnyInstance, handle: &DependencyHandle| {
            let target = target.as_ref().downcast_ref::<T>().ok_or_else(|| {
                DependencyError::injection_failed(&component, &target_member, "目标对象类型不匹配")
            })?;
            apply(target, handle)
        });
        self.injection_points.push(InjectionPointDecl {
            member,
            kind: InjectionKind::Setter,
            declared_type,
            qualifier: None,
            binding: MemberBinding::erased(setter),
        });
        self
    }

    /// 声明只有描述符元数据的注入点
    #[must_use]
    pub fn declared_point(
        mut self,
        member: impl Into<String>,
        kind: InjectionKind,
        declared_type: Option<TypeKey>,
    ) -> Self {
        self.injection_points.push(InjectionPointDecl {
            member: member.into(),
            kind,
            declared_type,
            qualifier: None,
            binding: MemberBinding::default(),
        });
        self
    }

    /// 添加完整的注入点声明
    #[must_use]
    pub fn injection_point(mut self, decl: InjectionPointDecl) -> Self {
        self.injection_points.push(decl);
        self
    }

    /// 设置就绪回调（构造并注入完成后执行）
    #[must_use]
    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) -> DependencyResult<()> + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(move |object: &AnyInstance| {
            match object.as_ref().downcast_ref::<T>() {
                Some(target) => callback(target),
                None => Err(DependencyError::lifecycle(format!(
                    "就绪回调目标类型不匹配: {}",
                    std::any::type_name::<T>()
                ))),
            }
        }));
        self
    }

    /// 设置销毁回调（注册表关闭时执行）
    #[must_use]
    pub fn on_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_destroy = Some(Arc::new(move |object: &AnyInstance| {
            if let Some(target) = object.as_ref().downcast_ref::<T>() {
                callback(target);
            }
        }));
        self
    }

    /// 设置声明来源
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 构建声明
    pub fn build(self) -> ManagedComponentDeclaration {
        ManagedComponentDeclaration {
            id: ComponentId::of::<T>(),
            name: self.name,
            scope: self.scope,
            capabilities: self.capabilities,
            qualifiers: self.qualifiers,
            injection_points: self.injection_points,
            constructor: self.constructor,
            on_ready: self.on_ready,
            on_destroy: self.on_destroy,
            source: self.source,
        }
    }

    fn typed_point<D, F>(
        self,
        member: impl Into<String>,
        kind: InjectionKind,
        qualifier: Option<Qualifier>,
        apply: F,
    ) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        let member = member.into();
        let component = self.name.clone();
        let target_member = member.clone();
        let setter: SetterFn = Arc::new(move |target: &AnyInstance, handle: &DependencyHandle| {
            let target = target.as_ref().downcast_ref::<T>().ok_or_else(|| {
                DependencyError::injection_failed(&component, &target_member, "目标对象类型不匹配")
            })?;
            let dependency = handle.downcast_ref::<Arc<D>>().ok_or_else(|| {
                DependencyError::injection_failed(
                    &component,
                    &target_member,
                    format!("依赖类型不匹配, 期望 {}", std::any::type_name::<D>()),
                )
            })?;
            apply(target, Arc::clone(dependency));
            Ok(())
        });
        self.push_point(
            member,
            kind,
            qualifier,
            MemberBinding::typed(TypeKey::of::<D>(), setter),
        )
    }

    fn push_point(
        mut self,
        member: impl Into<String>,
        kind: InjectionKind,
        qualifier: Option<Qualifier>,
        binding: MemberBinding,
    ) -> Self {
        self.injection_points.push(InjectionPointDecl {
            member: member.into(),
            kind,
            declared_type: None,
            qualifier,
            binding,
        });
        self
    }
}
