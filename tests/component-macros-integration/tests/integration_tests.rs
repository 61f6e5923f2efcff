//! 派生宏与容器的集中集成测试

use component_macros::Managed;
use di_abstractions::{ContainerConfig, DependencyError, Injected};
use di_impl::DiContainerBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Managed)]
#[managed(singleton)]
pub struct Chicken {
    #[inject]
    egg: Injected<Egg>,
}

#[derive(Managed)]
pub struct Egg {
    #[inject]
    chicken: Injected<Chicken>,
}

#[test]
fn test_field_injection_cycle_shares_singleton() {
    let container = DiContainerBuilder::new()
        .register_component::<Chicken>()
        .register_component::<Egg>()
        .build()
        .unwrap();

    let chicken = container.get::<Chicken>().unwrap();
    let egg = chicken.egg.get().expect("egg 应该已注入");
    let back = egg.chicken.get().expect("chicken 应该已注入");

    assert!(Arc::ptr_eq(&chicken, &back));
    assert_eq!(container.plan().cyclic_group_count(), 1);
}

#[test]
fn test_field_cycle_rejected_when_deferred_cycles_disabled() {
    let error = DiContainerBuilder::new()
        .with_config(ContainerConfig {
            allow_deferred_cycles: false,
            ..ContainerConfig::default()
        })
        .register_component::<Chicken>()
        .register_component::<Egg>()
        .build()
        .unwrap_err();

    assert!(matches!(error, DependencyError::CircularDependency { .. }));
}

static READY_COUNT: AtomicUsize = AtomicUsize::new(0);

#[derive(Managed)]
#[managed(singleton, on_ready = "ready")]
pub struct Clock {
    ticks: AtomicUsize,
}

impl Clock {
    fn ready(&self) -> di_abstractions::DependencyResult<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        READY_COUNT.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_eager_singletons_run_on_ready_once() {
    let before = READY_COUNT.load(Ordering::SeqCst);
    let container = DiContainerBuilder::new()
        .with_config(ContainerConfig {
            eager_singletons: true,
            ..ContainerConfig::default()
        })
        .register_component::<Clock>()
        .build()
        .unwrap();

    assert_eq!(READY_COUNT.load(Ordering::SeqCst), before + 1);

    let clock = container.get::<Clock>().unwrap();
    assert_eq!(clock.ticks.load(Ordering::SeqCst), 1);
    assert_eq!(READY_COUNT.load(Ordering::SeqCst), before + 1);
}

#[derive(Managed)]
pub struct Reader {
    #[inject(qualifier = "missing")]
    source: Injected<Chicken>,
}

#[test]
fn test_unsatisfied_qualified_field() {
    let error = DiContainerBuilder::new()
        .register_component::<Reader>()
        .register_component::<Chicken>()
        .register_component::<Egg>()
        .build()
        .unwrap_err();

    match error {
        DependencyError::UnsatisfiedDependency {
            component,
            injection_point,
            ..
        } => {
            assert_eq!(component, "Reader");
            assert_eq!(injection_point, "source");
        }
        other => panic!("unexpected error: {other}"),
    }
}
