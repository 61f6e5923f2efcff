//! 声明来源模块
//!
//! 会话组件模块与托管类模块各自收集声明，由组合器合并到同一个解析空间。

use di_abstractions::{DeclarationSource, ManagedComponent, ManagedComponentDeclaration};
use infrastructure_common::Scope;
use tracing::debug;

/// 会话组件模块
///
/// `singleton` 强制单例作用域，`stateful` 强制依赖作用域
#[derive(Debug, Clone)]
pub struct EjbModule {
    name: String,
    declarations: Vec<ManagedComponentDeclaration>,
}

impl EjbModule {
    /// 创建新的模块
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
        }
    }

    /// 添加单例会话组件
    #[must_use]
    pub fn singleton<T: ManagedComponent>(self) -> Self {
        self.with_scope(T::declaration(), Scope::Singleton)
    }

    /// 添加有状态会话组件
    #[must_use]
    pub fn stateful<T: ManagedComponent>(self) -> Self {
        self.with_scope(T::declaration(), Scope::Dependent)
    }

    /// 添加手工构建的声明，保留其作用域
    #[must_use]
    pub fn add_declaration(mut self, declaration: ManagedComponentDeclaration) -> Self {
        let declaration = declaration.with_source(self.name.clone());
        debug!(module = %self.name, component = %declaration.id(), "添加会话组件声明");
        self.declarations.push(declaration);
        self
    }

    fn with_scope(self, declaration: ManagedComponentDeclaration, scope: Scope) -> Self {
        self.add_declaration(declaration.with_scope(scope))
    }
}

impl DeclarationSource for EjbModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declarations(&self) -> Vec<ManagedComponentDeclaration> {
        self.declarations.clone()
    }
}

/// 托管类模块
///
/// 保留类型自身声明的作用域（默认为依赖作用域）
#[derive(Debug, Clone)]
pub struct BeansModule {
    name: String,
    declarations: Vec<ManagedComponentDeclaration>,
}

impl BeansModule {
    /// 创建新的模块
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
        }
    }

    /// 添加托管类
    #[must_use]
    pub fn add_managed_class<T: ManagedComponent>(self) -> Self {
        self.add_declaration(T::declaration())
    }

    /// 添加手工构建的声明
    #[must_use]
    pub fn add_declaration(mut self, declaration: ManagedComponentDeclaration) -> Self {
        let declaration = declaration.with_source(self.name.clone());
        debug!(module = %self.name, component = %declaration.id(), "添加托管类声明");
        self.declarations.push(declaration);
        self
    }
}

impl DeclarationSource for BeansModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declarations(&self) -> Vec<ManagedComponentDeclaration> {
        self.declarations.clone()
    }
}
