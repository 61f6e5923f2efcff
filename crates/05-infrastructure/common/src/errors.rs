//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },

    #[error("配置重载失败: {message}")]
    ReloadError { message: String },
}

impl ConfigError {
    /// 创建配置验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// 创建配置解析错误
    pub fn parse(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ParseError {
            source: Box::new(source),
        }
    }
}

/// 依赖注入错误类型
///
/// 解析类错误（未满足、歧义、循环）在解析阶段尽早发现，
/// 运行期只会出现注册表关闭、超时和组件创建失败。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("依赖未满足: {component}.{injection_point} 需要 {required_type}")]
    UnsatisfiedDependency {
        component: String,
        injection_point: String,
        required_type: String,
    },

    #[error("依赖存在歧义: {component}.{injection_point} 需要 {required_type}, 候选: {candidates:?}")]
    AmbiguousDependency {
        component: String,
        injection_point: String,
        required_type: String,
        candidates: Vec<String>,
    },

    #[error("注入点无效: {component}.{member}, 原因: {reason}")]
    AmbiguousInjectionPoint {
        component: String,
        member: String,
        reason: String,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("注册表已关闭, 无法获取组件: {component}")]
    RegistryClosed { component: String },

    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("注入失败: {component}.{member}, 原因: {message}")]
    InjectionFailed {
        component: String,
        member: String,
        message: String,
    },

    #[error("组件重复声明: {type_name}, 来源: {first_source} 与 {second_source}")]
    DuplicateComponent {
        type_name: String,
        first_source: String,
        second_source: String,
    },

    #[error("组件生命周期管理失败: {message}")]
    LifecycleError { message: String },

    #[error("关闭超时, 仍有 {in_flight} 个创建请求未完成")]
    ShutdownTimeout { in_flight: usize },

    #[error("等待单例创建超时: {component}")]
    CreationTimeout { component: String },
}

impl DependencyError {
    /// 创建组件未注册错误
    pub fn not_registered(type_name: impl Into<String>) -> Self {
        Self::ComponentNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建注入失败错误
    pub fn injection_failed(
        component: impl Into<String>,
        member: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InjectionFailed {
            component: component.into(),
            member: member.into(),
            message: message.into(),
        }
    }

    /// 创建生命周期错误
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::LifecycleError {
            message: message.into(),
        }
    }

    /// 从组件名称链创建循环依赖错误
    pub fn circular<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dependency_chain = chain
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::CircularDependency { dependency_chain }
    }

    /// 是否为解析阶段可以发现的错误
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnsatisfiedDependency { .. }
                | Self::AmbiguousDependency { .. }
                | Self::AmbiguousInjectionPoint { .. }
                | Self::CircularDependency { .. }
                | Self::DuplicateComponent { .. }
        )
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
