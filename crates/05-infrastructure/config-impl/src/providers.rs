//! 配置提供者实现

use async_trait::async_trait;
use config_abstractions::{priority, ConfigOrigin, ConfigProvider};
use infrastructure_common::{ConfigError, ConfigResult, ConfigSection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

/// 已加载为 JSON 树的配置文件
#[derive(Debug)]
struct FileDocument {
    path: PathBuf,
    format: FileFormat,
    root: Value,
}

impl FileDocument {
    fn open(path: &Path, format: FileFormat) -> ConfigResult<Self> {
        let mut document = Self {
            path: path.to_path_buf(),
            format,
            root: Value::Null,
        };
        document.load()?;
        Ok(document)
    }

    fn load(&mut self) -> ConfigResult<()> {
        debug!(path = %self.path.display(), format = ?self.format, "加载配置文件");

        let content = read_config_file(&self.path)?;
        self.root = match self.format {
            FileFormat::Toml => {
                let table: toml::Value = toml::from_str(&content).map_err(ConfigError::parse)?;
                toml_to_json(&table)
            }
            FileFormat::Json => serde_json::from_str(&content)?,
        };
        Ok(())
    }

    fn value(&self, key: &str) -> ConfigResult<Value> {
        nested_value(&self.root, key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound { key: key.to_string() })
    }
}

/// TOML 配置提供者
#[derive(Debug)]
pub struct TomlConfigProvider {
    document: FileDocument,
    priority: i32,
}

impl TomlConfigProvider {
    /// 读取 TOML 文件，文件不存在时返回 `FileNotFound`
    pub fn new<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Ok(Self {
            document: FileDocument::open(path.as_ref(), FileFormat::Toml)?,
            priority: priority::TOML_FILE,
        })
    }

    /// 设置优先级
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl ConfigProvider for TomlConfigProvider {
    fn name(&self) -> &str {
        "TomlConfigProvider"
    }

    fn origin(&self) -> ConfigOrigin {
        ConfigOrigin::File(self.document.path.clone())
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn get_configuration(&self, key: &str) -> ConfigResult<Value> {
        self.document.value(key)
    }

    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection> {
        object_section(&self.document.root, section_name)
    }

    async fn get_all_keys(&self) -> ConfigResult<Vec<String>> {
        Ok(collect_keys(&self.document.root))
    }

    async fn reload(&mut self) -> ConfigResult<()> {
        self.document.load()
    }
}

/// JSON 配置提供者
#[derive(Debug)]
pub struct JsonConfigProvider {
    document: FileDocument,
    priority: i32,
}

impl JsonConfigProvider {
    /// 读取 JSON 文件，文件不存在时返回 `FileNotFound`
    pub fn new<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Ok(Self {
            document: FileDocument::open(path.as_ref(), FileFormat::Json)?,
            priority: priority::JSON_FILE,
        })
    }

    /// 设置优先级
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl ConfigProvider for JsonConfigProvider {
    fn name(&self) -> &str {
        "JsonConfigProvider"
    }

    fn origin(&self) -> ConfigOrigin {
        ConfigOrigin::File(self.document.path.clone())
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn get_configuration(&self, key: &str) -> ConfigResult<Value> {
        self.document.value(key)
    }

    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection> {
        object_section(&self.document.root, section_name)
    }

    async fn get_all_keys(&self) -> ConfigResult<Vec<String>> {
        Ok(collect_keys(&self.document.root))
    }

    async fn reload(&mut self) -> ConfigResult<()> {
        self.document.load()
    }
}

/// 环境变量配置提供者
///
/// `LORN_DI__CONTAINER__EAGER_SINGLETONS=true` 对应配置键
/// `container.eager_singletons`。分隔符默认为双下划线，字段名中的单下划线得以保留。
#[derive(Debug)]
pub struct EnvironmentConfigProviderImpl {
    prefix: String,
    separator: String,
    priority: i32,
    values: HashMap<String, String>,
}

impl EnvironmentConfigProviderImpl {
    /// 读取以 `prefix` 加分隔符开头的环境变量
    pub fn new(prefix: impl Into<String>) -> ConfigResult<Self> {
        let mut provider = Self {
            prefix: prefix.into(),
            separator: "__".to_string(),
            priority: priority::ENVIRONMENT,
            values: HashMap::new(),
        };

        provider.scan()?;
        Ok(provider)
    }

    /// 设置分隔符并重新读取
    pub fn with_separator(mut self, separator: impl Into<String>) -> ConfigResult<Self> {
        self.separator = separator.into();
        self.scan()?;
        Ok(self)
    }

    /// 设置优先级
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn scan(&mut self) -> ConfigResult<()> {
        if self.separator.is_empty() {
            return Err(ConfigError::validation("环境变量分隔符不能为空"));
        }

        let full_prefix = format!("{}{}", self.prefix, self.separator);
        self.values = std::env::vars()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&full_prefix)?;
                Some((self.config_key(key), value))
            })
            .collect();

        debug!(prefix = %self.prefix, matched = self.values.len(), "读取环境变量");
        Ok(())
    }

    /// `CONTAINER__EAGER_SINGLETONS` -> `container.eager_singletons`
    fn config_key(&self, name: &str) -> String {
        name.split(self.separator.as_str())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[async_trait]
impl ConfigProvider for EnvironmentConfigProviderImpl {
    fn name(&self) -> &str {
        "EnvironmentConfigProvider"
    }

    fn origin(&self) -> ConfigOrigin {
        ConfigOrigin::Environment {
            prefix: self.prefix.clone(),
            separator: self.separator.clone(),
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn get_configuration(&self, key: &str) -> ConfigResult<Value> {
        self.values
            .get(key)
            .map(|value| parse_env_value(value))
            .ok_or_else(|| ConfigError::KeyNotFound { key: key.to_string() })
    }

    async fn get_section(&self, section_name: &str) -> ConfigResult<ConfigSection> {
        let section_prefix = format!("{section_name}.");
        let mut section = ConfigSection::new();
        for (key, value) in &self.values {
            if let Some(sub_key) = key.strip_prefix(&section_prefix) {
                section.insert(sub_key, parse_env_value(value));
            }
        }

        if section.is_empty() {
            Err(ConfigError::KeyNotFound {
                key: section_name.to_string(),
            })
        } else {
            Ok(section)
        }
    }

    async fn get_all_keys(&self) -> ConfigResult<Vec<String>> {
        Ok(self.values.keys().cloned().collect())
    }

    async fn reload(&mut self) -> ConfigResult<()> {
        self.scan()
    }
}

fn read_config_file(path: &Path) -> ConfigResult<String> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// 尝试把环境变量解析为布尔、整数或浮点数
fn parse_env_value(value: &str) -> Value {
    if let Ok(bool_val) = value.parse::<bool>() {
        Value::Bool(bool_val)
    } else if let Ok(int_val) = value.parse::<i64>() {
        Value::Number(serde_json::Number::from(int_val))
    } else if let Some(number) = value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        Value::Number(number)
    } else {
        Value::String(value.to_string())
    }
}

/// 从嵌套路径获取值
fn nested_value<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(config, |current, part| current.get(part))
}

fn object_section(config: &Value, section_name: &str) -> ConfigResult<ConfigSection> {
    match nested_value(config, section_name) {
        Some(Value::Object(obj)) => {
            let mut section = ConfigSection::new();
            for (key, value) in obj {
                section.insert(key.clone(), value.clone());
            }
            Ok(section)
        }
        Some(_) => Err(ConfigError::TypeConversionError {
            message: format!("配置节 {section_name} 不是表类型"),
        }),
        None => Err(ConfigError::KeyNotFound {
            key: section_name.to_string(),
        }),
    }
}

/// 递归收集所有键
fn collect_keys(config: &Value) -> Vec<String> {
    fn walk(obj: &serde_json::Map<String, Value>, prefix: &str, keys: &mut Vec<String>) {
        for (key, value) in obj {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            if let Value::Object(nested) = value {
                walk(nested, &full_key, keys);
            }
            keys.push(full_key);
        }
    }

    let mut keys = Vec::new();
    if let Value::Object(obj) = config {
        walk(obj, "", &mut keys);
    }
    keys
}
