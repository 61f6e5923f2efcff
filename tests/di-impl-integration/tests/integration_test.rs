//! 组合器端到端测试

use component_macros::Managed;
use di_abstractions::{DependencyError, Injected, MergePolicy};
use infrastructure_common::InfrastructureError;
use infrastructure_composition::{ApplicationComposer, ApplicationStatus, BeansModule, EjbModule};
use std::io::Write;
use std::sync::Arc;

#[derive(Managed)]
pub struct Orange {
    #[inject]
    blue: Injected<Blue>,
}

#[derive(Managed)]
pub struct Blue {
    #[inject]
    green: Injected<Green>,
}

#[derive(Managed)]
pub struct Green;

fn sample_composer() -> ApplicationComposer {
    ApplicationComposer::new()
        .add_module(EjbModule::new("orange-ejb").singleton::<Orange>())
        .add_module(
            BeansModule::new("colors")
                .add_managed_class::<Blue>()
                .add_managed_class::<Green>(),
        )
}

#[tokio::test]
async fn test_sample_graph_end_to_end() -> anyhow::Result<()> {
    let application = sample_composer().compose().await?;

    let orange = application.lookup::<Orange>()?;
    let blue = orange.blue.get().expect("blue 应该已注入");
    assert!(blue.green.get().is_some());

    // 单例在应用生命周期内唯一，依赖作用域每次新建
    assert!(Arc::ptr_eq(&orange, &application.lookup::<Orange>()?));
    assert!(!Arc::ptr_eq(&application.lookup::<Blue>()?, &blue));

    let order = application.plan().construction_order();
    let position = |name: &str| {
        order
            .iter()
            .position(|id| id.short_name() == name)
            .expect("组件应该出现在构造顺序中")
    };
    assert!(position("Green") < position("Blue"));
    assert!(position("Blue") < position("Orange"));

    application.stop().await?;
    assert_eq!(application.status().await, ApplicationStatus::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_unsatisfied_dependency_names_injection_point() {
    let error = ApplicationComposer::new()
        .add_module(EjbModule::new("orange-ejb").singleton::<Orange>())
        .compose()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::DependencyError {
            source:
                DependencyError::UnsatisfiedDependency {
                    component,
                    injection_point,
                    ..
                },
        } => {
            assert_eq!(component, "Orange");
            assert_eq!(injection_point, "blue");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_lookup_after_stop_fails() -> anyhow::Result<()> {
    let application = sample_composer().compose().await?;
    application.lookup::<Orange>()?;
    application.stop().await?;

    assert!(matches!(
        application.lookup::<Green>(),
        Err(InfrastructureError::DependencyError {
            source: DependencyError::RegistryClosed { .. }
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_container_config_from_json_file() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{"container": {{"eager_singletons": true, "merge_policy": "last-registered-wins"}}}}"#
    )?;

    let application = sample_composer()
        .add_module(BeansModule::new("overrides").add_managed_class::<Green>())
        .add_config_json(file.path())?
        .compose()
        .await?;

    let config = application.container().config();
    assert!(config.eager_singletons);
    assert_eq!(config.merge_policy, MergePolicy::LastRegisteredWins);
    assert_eq!(application.container().stats().active_singletons, 1);

    application.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_environment_overrides_file() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "[container]\neager_singletons = false")?;
    std::env::set_var("LORN_DI_E2E__CONTAINER__EAGER_SINGLETONS", "true");

    let application = sample_composer()
        .add_config_toml(file.path())?
        .add_config_env_vars("LORN_DI_E2E")?
        .compose()
        .await?;

    assert!(application.container().config().eager_singletons);
    application.stop().await?;
    Ok(())
}
