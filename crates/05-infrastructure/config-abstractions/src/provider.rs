//! 配置源抽象
//!
//! 配置键使用点分路径，例如 `container.eager_singletons`

use async_trait::async_trait;
use infrastructure_common::{ConfigError, ConfigResult, ConfigSection};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// 内置配置源的默认优先级，数值大的覆盖数值小的
pub mod priority {
    /// 环境变量
    pub const ENVIRONMENT: i32 = 200;
    /// TOML 文件
    pub const TOML_FILE: i32 = 100;
    /// JSON 文件
    pub const JSON_FILE: i32 = 90;
}

/// 配置数据的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// 配置文件
    File(PathBuf),
    /// 带前缀的环境变量
    Environment {
        /// 变量名前缀
        prefix: String,
        /// 层级分隔符
        separator: String,
    },
    /// 宿主自定义来源
    Custom(String),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Environment { prefix, separator } => write!(f, "env:{prefix}{separator}*"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// 配置提供者 trait
///
/// 一个提供者对应一个配置来源。查询不存在的键或节返回 `KeyNotFound`，
/// 管理器据此回退到下一个提供者。
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// 提供者名称，在同一个管理器中唯一
    fn name(&self) -> &str;

    /// 配置来源
    fn origin(&self) -> ConfigOrigin;

    /// 优先级
    fn priority(&self) -> i32 {
        0
    }

    /// 按点分路径读取配置值
    async fn get_configuration(&self, key: &str) -> ConfigResult<Value>;

    /// 读取配置节的顶层键值
    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection>;

    /// 所有叶子键的点分路径
    async fn get_all_keys(&self) -> ConfigResult<Vec<String>>;

    /// 从来源重新读取
    async fn reload(&mut self) -> ConfigResult<()>;

    /// 是否存在配置键
    async fn contains_key(&self, key: &str) -> ConfigResult<bool> {
        match self.get_configuration(key).await {
            Ok(_) => Ok(true),
            Err(ConfigError::KeyNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
