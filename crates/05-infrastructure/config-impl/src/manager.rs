//! 配置管理器实现

use async_trait::async_trait;
use config_abstractions::{ConfigManager, ConfigOrigin, ConfigProvider};
use infrastructure_common::{ConfigError, ConfigResult, ConfigSection};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 容器配置管理器
///
/// 协调多个配置源，按优先级提供统一的配置访问接口
pub struct ContainerConfigManager {
    /// 配置提供者列表（按优先级排序）
    providers: Vec<Box<dyn ConfigProvider>>,
    /// 缓存的配置值
    config_cache: Arc<RwLock<HashMap<String, Value>>>,
    cache_enabled: bool,
}

impl std::fmt::Debug for ContainerConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerConfigManager")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

impl ContainerConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config_cache: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled: true,
        }
    }

    /// 设置是否启用缓存
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    /// 清除配置缓存
    pub async fn clear_cache(&self) {
        let mut cache = self.config_cache.write().await;
        cache.clear();
        debug!("配置缓存已清除");
    }

    /// 获取配置提供者数量
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// 按优先级顺序返回提供者名称
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for ContainerConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigManager for ContainerConfigManager {
    async fn register_provider(&mut self, provider: Box<dyn ConfigProvider>) -> ConfigResult<()> {
        if self.providers.iter().any(|p| p.name() == provider.name()) {
            return Err(ConfigError::validation(format!(
                "配置提供者已注册: {}",
                provider.name()
            )));
        }
        info!(
            provider = provider.name(),
            origin = %provider.origin(),
            priority = provider.priority(),
            "注册配置提供者"
        );

        self.providers.push(provider);

        // 优先级高的在前，同优先级保持注册顺序
        self.providers
            .sort_by(|a, b| b.priority().cmp(&a.priority()));

        self.clear_cache().await;
        Ok(())
    }

    async fn unregister_provider(&mut self, provider_name: &str) -> ConfigResult<()> {
        let initial_count = self.providers.len();
        self.providers.retain(|p| p.name() != provider_name);

        if self.providers.len() < initial_count {
            info!("移除配置提供者: {}", provider_name);
            self.clear_cache().await;
            Ok(())
        } else {
            warn!("配置提供者不存在: {}", provider_name);
            Err(ConfigError::KeyNotFound {
                key: provider_name.to_string(),
            })
        }
    }

    fn origins(&self) -> Vec<ConfigOrigin> {
        self.providers.iter().map(|p| p.origin()).collect()
    }

    async fn get_configuration(&self, key: &str) -> ConfigResult<Value> {
        debug!("获取配置: {}", key);

        if self.cache_enabled {
            let cache = self.config_cache.read().await;
            if let Some(value) = cache.get(key) {
                return Ok(value.clone());
            }
        }

        for provider in &self.providers {
            match provider.get_configuration(key).await {
                Ok(value) => {
                    debug!("从提供者 {} 获取配置: {}", provider.name(), key);

                    if self.cache_enabled {
                        let mut cache = self.config_cache.write().await;
                        cache.insert(key.to_string(), value.clone());
                    }

                    return Ok(value);
                }
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => {
                    error!("提供者 {} 获取配置失败: {}", provider.name(), e);
                    continue;
                }
            }
        }

        Err(ConfigError::KeyNotFound {
            key: key.to_string(),
        })
    }

    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection> {
        debug!("获取配置节: {}", section_name);

        let mut combined_section = ConfigSection::new();

        for provider in &self.providers {
            match provider.get_section(section_name).await {
                // 提供者按优先级降序排列
                Ok(section) => combined_section.fill_from(section),
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => {
                    warn!("提供者 {} 获取配置节失败: {}", provider.name(), e);
                    continue;
                }
            }
        }

        if combined_section.is_empty() {
            Err(ConfigError::KeyNotFound {
                key: section_name.to_string(),
            })
        } else {
            Ok(combined_section)
        }
    }

    async fn bind_section<T>(&self, section_name: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        debug!(
            "绑定配置节: {} -> {}",
            section_name,
            std::any::type_name::<T>()
        );

        match self.get_section(section_name).await {
            Ok(section) => section.bind(),
            Err(ConfigError::KeyNotFound { .. }) => {
                debug!("配置节 {} 不存在，使用默认值", section_name);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn reload_all(&mut self) -> ConfigResult<()> {
        info!("重新加载所有配置");

        let mut failed = Vec::new();
        for provider in &mut self.providers {
            if let Err(e) = provider.reload().await {
                error!("提供者 {} 重载失败: {}", provider.name(), e);
                failed.push(provider.name().to_string());
            }
        }

        self.clear_cache().await;

        if failed.is_empty() {
            info!("所有配置提供者重载成功");
            Ok(())
        } else {
            Err(ConfigError::ReloadError {
                message: format!("{}个提供者重载失败: {}", failed.len(), failed.join(", ")),
            })
        }
    }
}
