//! 配置相关的基础类型

use crate::errors::ConfigResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 配置节
///
/// 某个配置节下的顶层键值，值保持 JSON 形式直到绑定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    /// 配置数据
    pub data: HashMap<String, serde_json::Value>,
}

impl ConfigSection {
    /// 创建新的配置节
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入配置项
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// 获取配置项
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// 配置节是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 用低优先级配置节补齐缺失的键，已有的键保持不变
    pub fn fill_from(&mut self, lower: ConfigSection) {
        for (key, value) in lower.data {
            self.data.entry(key).or_insert(value);
        }
    }

    /// 反序列化为具体类型
    pub fn bind<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}
