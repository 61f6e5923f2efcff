//! 已组合的应用

use crate::composer::ApplicationComposer;
use config_abstractions::ConfigManager;
use config_impl::ContainerConfigManager;
use di_abstractions::{ContainerStats, ResolutionPlan};
use di_impl::DiContainer;
use infrastructure_common::{InfrastructureError, InfrastructureResult, Qualifier};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 应用
///
/// 持有依赖注入容器与配置管理器，宿主按类型查找组件
pub struct Application {
    container: Arc<DiContainer>,
    config_manager: Arc<ContainerConfigManager>,
    modules: Vec<String>,
    status: Arc<RwLock<ApplicationStatus>>,
    metrics: Arc<RwLock<ApplicationMetrics>>,
    lookup_count: AtomicU64,
}

impl Application {
    /// 创建应用组合器
    pub fn composer() -> ApplicationComposer {
        ApplicationComposer::new()
    }

    pub(crate) fn new(
        container: DiContainer,
        config_manager: ContainerConfigManager,
        modules: Vec<String>,
    ) -> Self {
        let metrics = ApplicationMetrics {
            start_time: Some(chrono::Utc::now()),
            module_count: modules.len(),
            config_providers_count: config_manager.provider_count(),
            ..ApplicationMetrics::default()
        };

        Self {
            container: Arc::new(container),
            config_manager: Arc::new(config_manager),
            modules,
            status: Arc::new(RwLock::new(ApplicationStatus::Running)),
            metrics: Arc::new(RwLock::new(metrics)),
            lookup_count: AtomicU64::new(0),
        }
    }

    /// 按类型查找组件
    pub fn lookup<T>(&self) -> InfrastructureResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.container.get::<T>()?)
    }

    /// 按类型与限定符查找组件
    pub fn lookup_qualified<T>(
        &self,
        qualifier: impl Into<Qualifier>,
    ) -> InfrastructureResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.container.get_qualified::<T>(qualifier)?)
    }

    /// 读取配置值并反序列化
    pub async fn get_config<T>(&self, key: &str) -> InfrastructureResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self.config_manager.get_configuration(key).await?;
        serde_json::from_value(value)
            .map_err(|e| infrastructure_common::ConfigError::SerializationError { source: e }.into())
    }

    /// 停止应用，销毁所有实例
    ///
    /// 注册表关闭会等待进行中的创建，因此放在阻塞线程上执行
    pub async fn stop(&self) -> InfrastructureResult<()> {
        {
            let mut status = self.status.write().await;
            if *status == ApplicationStatus::Stopped {
                return Ok(());
            }
            *status = ApplicationStatus::Stopping;
        }
        info!("停止应用");

        let container = Arc::clone(&self.container);
        let result = tokio::task::spawn_blocking(move || container.shutdown())
            .await
            .map_err(|e| InfrastructureError::ShutdownFailed {
                message: format!("关闭任务失败: {e}"),
            })?;

        let mut status = self.status.write().await;
        if let Err(e) = result {
            error!(error = %e, "应用关闭失败");
            *status = ApplicationStatus::Failed;
            return Err(e.into());
        }

        *status = ApplicationStatus::Stopped;
        self.metrics.write().await.stop_time = Some(chrono::Utc::now());
        info!("应用已停止");
        Ok(())
    }

    /// 运行状态
    pub async fn status(&self) -> ApplicationStatus {
        *self.status.read().await
    }

    /// 统计信息
    pub async fn metrics(&self) -> ApplicationMetrics {
        let mut metrics = self.metrics.read().await.clone();
        metrics.lookup_count = self.lookup_count.load(Ordering::Relaxed);
        metrics.container = Some(self.container.stats());
        metrics
    }

    /// 解析计划
    pub fn plan(&self) -> &ResolutionPlan {
        self.container.plan()
    }

    /// 依赖注入容器
    pub fn container(&self) -> &Arc<DiContainer> {
        &self.container
    }

    /// 配置管理器
    pub fn config_manager(&self) -> &Arc<ContainerConfigManager> {
        &self.config_manager
    }

    /// 已合并的模块名称
    pub fn modules(&self) -> &[String] {
        &self.modules
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("modules", &self.modules)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 失败
    Failed,
}

/// 应用统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationMetrics {
    /// 启动时间
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 停止时间
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 模块数量
    pub module_count: usize,
    /// 配置提供者数量
    pub config_providers_count: usize,
    /// 组件查找次数
    pub lookup_count: u64,
    /// 容器统计
    pub container: Option<ContainerStats>,
}

impl ApplicationMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}
