//! 应用组合器

use crate::application::Application;
use crate::logging::{init_logging, LoggingConfig};
use config_abstractions::{ConfigManager, ConfigProvider};
use config_impl::{
    ContainerConfigManager, EnvironmentConfigProviderImpl, JsonConfigProvider, TomlConfigProvider,
};
use di_abstractions::{
    ContainerConfig, DeclarationSet, DeclarationSource, MergePolicy, CONTAINER_SECTION,
};
use di_impl::DiContainerBuilder;
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::path::Path;
use tracing::{debug, info};

/// 应用组合器
///
/// 收集声明来源与配置源，合并到同一个解析空间后构建容器
#[derive(Default)]
pub struct ApplicationComposer {
    modules: Vec<Box<dyn DeclarationSource>>,
    config_sources: Vec<Box<dyn ConfigProvider>>,
    container_config: Option<ContainerConfig>,
    merge_policy: Option<MergePolicy>,
    logging: Option<LoggingConfig>,
}

impl ApplicationComposer {
    /// 创建新的组合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加声明来源模块
    #[must_use]
    pub fn add_module<M: DeclarationSource + 'static>(mut self, module: M) -> Self {
        debug!("添加模块: {}", module.name());
        self.modules.push(Box::new(module));
        self
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        info!("添加 TOML 配置文件: {}", path.as_ref().display());
        self.config_sources
            .push(Box::new(TomlConfigProvider::new(path)?));
        Ok(self)
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        info!("添加 JSON 配置文件: {}", path.as_ref().display());
        self.config_sources
            .push(Box::new(JsonConfigProvider::new(path)?));
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_config_env_vars(mut self, prefix: impl Into<String>) -> InfrastructureResult<Self> {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.config_sources
            .push(Box::new(EnvironmentConfigProviderImpl::new(prefix)?));
        Ok(self)
    }

    /// 添加自定义配置提供者
    #[must_use]
    pub fn add_config_provider<T: ConfigProvider + 'static>(mut self, provider: T) -> Self {
        info!("添加自定义配置提供者: {}", provider.name());
        self.config_sources.push(Box::new(provider));
        self
    }

    /// 直接指定容器配置，跳过配置源中的 `container` 节
    #[must_use]
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = Some(config);
        self
    }

    /// 覆盖合并策略
    #[must_use]
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = Some(policy);
        self
    }

    /// 组合时初始化日志
    #[must_use]
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 组合应用
    ///
    /// 加载配置、合并所有模块的声明并构建容器；任何解析错误都会在返回前暴露
    pub async fn compose(self) -> InfrastructureResult<Application> {
        if let Some(logging) = &self.logging {
            init_logging(logging)?;
        }

        info!("开始组合应用");

        let mut config_manager = ContainerConfigManager::new();
        for provider in self.config_sources {
            config_manager.register_provider(provider).await?;
        }

        let mut config = match self.container_config {
            Some(config) => config,
            None => {
                config_manager
                    .bind_section::<ContainerConfig>(CONTAINER_SECTION)
                    .await?
            }
        };
        if let Some(policy) = self.merge_policy {
            config.merge_policy = policy;
        }
        config.validate()?;
        debug!(?config, "容器配置已加载");

        let mut declarations = DeclarationSet::new();
        let mut module_names = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            let module_declarations = module.declarations();
            info!(
                module = module.name(),
                components = module_declarations.len(),
                "合并模块声明"
            );
            for declaration in module_declarations {
                declarations.insert(declaration, config.merge_policy)?;
            }
            module_names.push(module.name().to_string());
        }

        // 预先创建单例时可能等待其他线程，放在阻塞线程上构建
        let container = tokio::task::spawn_blocking(move || {
            DiContainerBuilder::new()
                .with_config(config)
                .register_set(declarations)
                .build()
        })
        .await
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("容器构建任务失败: {e}"),
        })??;

        info!(modules = module_names.len(), "应用组合完成");
        Ok(Application::new(container, config_manager, module_names))
    }
}

impl std::fmt::Debug for ApplicationComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationComposer")
            .field(
                "modules",
                &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "config_sources",
                &self.config_sources.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("container_config", &self.container_config)
            .field("merge_policy", &self.merge_policy)
            .finish_non_exhaustive()
    }
}
