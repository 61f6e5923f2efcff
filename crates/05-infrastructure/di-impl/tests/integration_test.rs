//! 依赖注入实现的集成测试

use di_abstractions::{
    ContainerConfig, DependencyError, Injected, InstanceState, ManagedComponentDeclaration,
};
use di_impl::{DiContainer, DiContainerBuilder};
use infrastructure_common::ComponentId;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

trait Color: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct Orange {
    blue: Injected<Blue>,
}

#[derive(Default)]
struct Blue {
    green: Injected<Green>,
}

#[derive(Default)]
struct Green;

impl Color for Green {
    fn name(&self) -> &'static str {
        "green"
    }
}

fn orange() -> ManagedComponentDeclaration {
    ManagedComponentDeclaration::default_constructed::<Orange>()
        .singleton()
        .setter::<Blue, _>("blue", |orange, blue| orange.blue.inject(blue))
        .build()
}

fn blue() -> ManagedComponentDeclaration {
    ManagedComponentDeclaration::default_constructed::<Blue>()
        .setter::<Green, _>("green", |blue, green| blue.green.inject(green))
        .build()
}

fn green() -> ManagedComponentDeclaration {
    ManagedComponentDeclaration::default_constructed::<Green>()
        .capability::<dyn Color, _>(|green| green as Arc<dyn Color>)
        .build()
}

fn sample_container() -> DiContainer {
    DiContainerBuilder::new()
        .register(orange())
        .register(blue())
        .register(green())
        .build()
        .unwrap()
}

#[test]
fn test_orange_blue_green_graph() {
    let container = sample_container();

    let orange = container.get::<Orange>().unwrap();
    let blue = orange.blue.get().expect("orange 应该注入了 blue");
    assert!(blue.green.get().is_some());

    let instance = container.instance_of(&ComponentId::of::<Orange>()).unwrap();
    assert_eq!(instance.state(), InstanceState::Ready);
}

#[test]
fn test_singleton_and_dependent_identity() {
    let container = sample_container();

    let first = container.get::<Orange>().unwrap();
    let second = container.get::<Orange>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // 依赖作用域每次都新建
    let blue_a = container.get::<Blue>().unwrap();
    let blue_b = container.get::<Blue>().unwrap();
    assert!(!Arc::ptr_eq(&blue_a, &blue_b));
    assert!(!Arc::ptr_eq(&blue_a, &first.blue.get().unwrap()));
}

#[test]
fn test_lookup_by_trait_capability() {
    let container = sample_container();

    let color = container.get::<dyn Color>().unwrap();
    assert_eq!(color.name(), "green");
    assert!(container.is_registered::<dyn Color>());
    assert!(!container.is_registered::<String>());
}

#[test]
fn test_unsatisfied_dependency_fails_at_build() {
    let error = DiContainerBuilder::new()
        .register(orange())
        .build()
        .unwrap_err();

    match error {
        DependencyError::UnsatisfiedDependency {
            component,
            injection_point,
            ..
        } => {
            assert_eq!(component, "Orange");
            assert_eq!(injection_point, "blue");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_lookup_of_unregistered_type() {
    let container = sample_container();
    assert!(matches!(
        container.get::<String>(),
        Err(DependencyError::ComponentNotRegistered { .. })
    ));
}

#[test]
fn test_constructor_injection() {
    struct Painter {
        color: Arc<dyn Color>,
    }

    let container = DiContainerBuilder::new()
        .register(
            ManagedComponentDeclaration::constructed_with::<Painter, _>(|args| {
                Ok(Painter {
                    color: args.get::<dyn Color>("color")?,
                })
            })
            .constructor_dependency::<dyn Color>("color")
            .build(),
        )
        .register(green())
        .build()
        .unwrap();

    let painter = container.get::<Painter>().unwrap();
    assert_eq!(painter.color.name(), "green");
}

#[test]
fn test_qualified_lookup_and_injection() {
    #[derive(Default)]
    struct Red;

    impl Color for Red {
        fn name(&self) -> &'static str {
            "red"
        }
    }

    #[derive(Default)]
    struct Canvas {
        warm: Injected<dyn Color>,
    }

    let container = DiContainerBuilder::new()
        .register(green())
        .register(
            ManagedComponentDeclaration::default_constructed::<Red>()
                .capability::<dyn Color, _>(|red| red as Arc<dyn Color>)
                .qualifier("warm")
                .build(),
        )
        .register(
            ManagedComponentDeclaration::default_constructed::<Canvas>()
                .field_qualified::<dyn Color, _>("warm", "warm", |canvas, color| {
                    canvas.warm.inject(color)
                })
                .build(),
        )
        .build()
        .unwrap();

    let canvas = container.get::<Canvas>().unwrap();
    assert_eq!(canvas.warm.get().unwrap().name(), "red");
    assert_eq!(container.get_qualified::<dyn Color>("warm").unwrap().name(), "red");
    assert!(matches!(
        container.get::<dyn Color>(),
        Err(DependencyError::AmbiguousDependency { .. })
    ));
}

#[derive(Default)]
struct Chicken {
    egg: Injected<Egg>,
}

#[derive(Default)]
struct Egg {
    chicken: Injected<Chicken>,
}

#[test]
fn test_setter_cycle_shares_members_within_graph() {
    let container = DiContainerBuilder::new()
        .register(
            ManagedComponentDeclaration::default_constructed::<Chicken>()
                .singleton()
                .setter::<Egg, _>("egg", |chicken, egg| chicken.egg.inject(egg))
                .build(),
        )
        .register(
            ManagedComponentDeclaration::default_constructed::<Egg>()
                .setter::<Chicken, _>("chicken", |egg, chicken| egg.chicken.inject(chicken))
                .build(),
        )
        .build()
        .unwrap();

    assert_eq!(container.plan().cyclic_group_count(), 1);

    let chicken = container.get::<Chicken>().unwrap();
    let egg = chicken.egg.get().unwrap();
    assert!(Arc::ptr_eq(&egg.chicken.get().unwrap(), &chicken));

    // 单例被复用，新的依赖实例指向同一个单例
    let another_egg = container.get::<Egg>().unwrap();
    assert!(!Arc::ptr_eq(&another_egg, &egg));
    assert!(Arc::ptr_eq(&another_egg.chicken.get().unwrap(), &chicken));
}

#[test]
fn test_panicking_cycle_member_can_be_retried() {
    static FIRST_START: AtomicBool = AtomicBool::new(true);

    let container = DiContainerBuilder::new()
        .register(
            ManagedComponentDeclaration::default_constructed::<Chicken>()
                .singleton()
                .setter::<Egg, _>("egg", |chicken, egg| chicken.egg.inject(egg))
                .on_ready(|_: &Chicken| {
                    if FIRST_START.swap(false, Ordering::SeqCst) {
                        panic!("first start fails");
                    }
                    Ok(())
                })
                .build(),
        )
        .register(
            ManagedComponentDeclaration::default_constructed::<Egg>()
                .setter::<Chicken, _>("chicken", |egg, chicken| egg.chicken.inject(chicken))
                .build(),
        )
        .build()
        .unwrap();

    let unwound =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| container.get::<Chicken>()));
    assert!(unwound.is_err());
    assert_eq!(container.stats().active_singletons, 0);

    let from_other_thread =
        thread::scope(|scope| scope.spawn(|| container.get::<Chicken>().unwrap()).join().unwrap());
    let chicken = container.get::<Chicken>().unwrap();
    assert!(Arc::ptr_eq(&chicken, &from_other_thread));
    assert_eq!(container.stats().active_singletons, 1);
}

#[test]
fn test_constructor_cycle_fails_at_build() {
    let error = DiContainerBuilder::new()
        .register(
            ManagedComponentDeclaration::constructed_with::<Chicken, _>(|args| {
                let _egg = args.get::<Egg>("egg")?;
                Ok(Chicken::default())
            })
            .constructor_dependency::<Egg>("egg")
            .build(),
        )
        .register(
            ManagedComponentDeclaration::default_constructed::<Egg>()
                .setter::<Chicken, _>("chicken", |egg, chicken| egg.chicken.inject(chicken))
                .build(),
        )
        .build()
        .unwrap_err();

    assert!(matches!(error, DependencyError::CircularDependency { .. }));
}

#[test]
fn test_concurrent_first_use_creates_one_singleton() {
    static CREATED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Slow;

    let container = Arc::new(
        DiContainerBuilder::new()
            .register(
                ManagedComponentDeclaration::constructed_with::<Slow, _>(|_| {
                    CREATED.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(Slow)
                })
                .singleton()
                .build(),
            )
            .build()
            .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.get::<Slow>().unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<Slow>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_shutdown_destroys_singletons_once_and_closes() {
    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Pool;

    let container = DiContainerBuilder::new()
        .register(
            ManagedComponentDeclaration::default_constructed::<Pool>()
                .singleton()
                .on_destroy(|_| {
                    DESTROYED.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .build()
        .unwrap();

    let pool = container.instance_of(&ComponentId::of::<Pool>()).unwrap();
    container.shutdown().unwrap();
    container.shutdown().unwrap();

    assert_eq!(DESTROYED.load(Ordering::SeqCst), 1);
    assert_eq!(pool.state(), InstanceState::Destroyed);
    assert!(container.is_closed());
    assert!(matches!(
        container.get::<Pool>(),
        Err(DependencyError::RegistryClosed { .. })
    ));
}

#[test]
fn test_eager_singletons_run_on_ready_at_build() {
    static READY: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Startup;

    let config = ContainerConfig {
        eager_singletons: true,
        ..ContainerConfig::default()
    };
    let container = DiContainerBuilder::new()
        .with_config(config)
        .register(
            ManagedComponentDeclaration::default_constructed::<Startup>()
                .singleton()
                .on_ready(|_| {
                    READY.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build(),
        )
        .build()
        .unwrap();

    assert_eq!(READY.load(Ordering::SeqCst), 1);
    assert_eq!(container.stats().active_singletons, 1);
    container.get::<Startup>().unwrap();
    assert_eq!(READY.load(Ordering::SeqCst), 1);
}

#[test]
fn test_eager_singleton_failure_fails_build() {
    #[derive(Default)]
    struct Broken;

    let config = ContainerConfig {
        eager_singletons: true,
        ..ContainerConfig::default()
    };
    let result = DiContainer::builder()
        .with_config(config)
        .register(
            ManagedComponentDeclaration::default_constructed::<Broken>()
                .singleton()
                .on_ready(|_| Err(DependencyError::lifecycle("初始化失败")))
                .build(),
        )
        .build();

    assert!(matches!(result, Err(DependencyError::LifecycleError { .. })));
}

#[test]
fn test_stats_reflect_plan_and_registry() {
    let container = sample_container();
    let _orange = container.get::<Orange>().unwrap();

    let stats = container.stats();
    assert_eq!(stats.registered_components, 3);
    assert_eq!(stats.singleton_components, 1);
    assert_eq!(stats.injection_points, 2);
    assert_eq!(stats.construction_groups, 3);
    assert_eq!(stats.cyclic_groups, 0);
    assert_eq!(stats.active_singletons, 1);
    assert_eq!(stats.instances_created, 3);
}
