//! 配置管理抽象

use crate::provider::{ConfigOrigin, ConfigProvider};
use async_trait::async_trait;
use infrastructure_common::{ConfigResult, ConfigSection};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 配置管理器 trait
///
/// 叠加多个配置提供者。同一个键以优先级最高的提供者为准，
/// 同优先级时先注册的在前。
#[async_trait]
pub trait ConfigManager: Send + Sync {
    /// 注册配置提供者
    async fn register_provider(&mut self, provider: Box<dyn ConfigProvider>) -> ConfigResult<()>;

    /// 按名称移除配置提供者，不存在时返回 `KeyNotFound`
    async fn unregister_provider(&mut self, provider_name: &str) -> ConfigResult<()>;

    /// 已注册提供者的来源，按生效顺序排列
    fn origins(&self) -> Vec<ConfigOrigin>;

    /// 读取配置值
    async fn get_configuration(&self, key: &str) -> ConfigResult<Value>;

    /// 读取合并后的配置节
    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection>;

    /// 把配置节绑定到类型，配置节缺失时使用 `T::default()`
    async fn bind_section<T>(&self, section_name: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned + Default + Send + 'static;

    /// 重新加载所有提供者，失败的提供者名称汇总到 `ReloadError`
    async fn reload_all(&mut self) -> ConfigResult<()>;
}
