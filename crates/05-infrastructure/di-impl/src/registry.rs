//! 实例注册表
//!
//! 单例采用比较并创建：持锁时要么取得已就绪实例，要么占用空槽位，
//! 要么在条件变量上等待其他线程完成创建。占用由 [`GroupClaim`] 持有，
//! 创建失败或 panic 时随守卫释放。依赖作用域实例只以弱引用登记，
//! 以便关闭时统一销毁。

use di_abstractions::{AnyInstance, ContainerConfig, CreateInstance, Instance, ScopeManager};
use infrastructure_common::{ComponentId, DependencyError, DependencyResult, InstanceState, Scope};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 销毁回调
pub type DestroyHook = Arc<dyn Fn(ComponentId, &AnyInstance) + Send + Sync>;

const PRUNE_THRESHOLD: usize = 64;

/// 单例槽位
enum Slot {
    /// 正在由指定线程创建
    Creating(ThreadId),
    /// 已就绪
    Ready(Arc<Instance>),
}

/// 按创建顺序登记的实例
enum Tracked {
    Singleton(Arc<Instance>),
    Dependent {
        component: ComponentId,
        instance: Weak<Instance>,
        object: Weak<dyn std::any::Any + Send + Sync>,
    },
}

/// 单例占用结果
#[derive(Debug, Clone)]
pub enum Claim {
    /// 已有就绪实例
    Ready(Arc<Instance>),
    /// 当前线程获得创建权
    Owned,
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<ComponentId, Slot>,
    created: Vec<Tracked>,
    in_flight: usize,
    closed: bool,
    torn_down: bool,
    instances_created: u64,
}

/// 进行中请求守卫，离开作用域时递减计数并唤醒等待者
pub struct FlightGuard<'a> {
    registry: &'a InstanceRegistry,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.state.lock();
        state.in_flight -= 1;
        drop(state);
        self.registry.changed.notify_all();
    }
}

/// 一组单例槽位的占用
///
/// 离开作用域时释放仍处于创建中的槽位，已发布的槽位不受影响。
pub struct GroupClaim<'a> {
    registry: &'a InstanceRegistry,
    claims: HashMap<ComponentId, Claim>,
    owned: Vec<ComponentId>,
}

impl GroupClaim<'_> {
    /// 各组件的占用结果
    pub fn claims(&self) -> &HashMap<ComponentId, Claim> {
        &self.claims
    }

    /// 已就绪的实例
    pub fn ready(&self, component: &ComponentId) -> Option<Arc<Instance>> {
        match self.claims.get(component) {
            Some(Claim::Ready(instance)) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    /// 当前线程获得创建权的组件
    pub fn owned(&self) -> &[ComponentId] {
        &self.owned
    }

    /// 发布创建完成的单例，未发布的占用随后释放
    pub fn publish(self, instances: &[Arc<Instance>]) {
        self.registry.publish(instances);
    }
}

impl Drop for GroupClaim<'_> {
    fn drop(&mut self) {
        if !self.owned.is_empty() {
            self.registry.abandon(&self.owned);
        }
    }
}

/// 实例注册表
pub struct InstanceRegistry {
    state: Mutex<RegistryState>,
    changed: Condvar,
    creation_wait_timeout: Option<Duration>,
    teardown_timeout: Duration,
    destroy_hook: Option<DestroyHook>,
}

impl InstanceRegistry {
    /// 创建新的注册表，`creation_wait_timeout` 为 `None` 时一直等待
    pub fn new(creation_wait_timeout: Option<Duration>, teardown_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            changed: Condvar::new(),
            creation_wait_timeout,
            teardown_timeout,
            destroy_hook: None,
        }
    }

    /// 从容器配置创建注册表
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self::new(config.creation_wait_timeout(), config.teardown_timeout())
    }

    /// 设置销毁回调
    #[must_use]
    pub fn with_destroy_hook(mut self, hook: DestroyHook) -> Self {
        self.destroy_hook = Some(hook);
        self
    }

    /// 登记一个进行中的请求
    pub fn begin(&self, component: &ComponentId) -> DependencyResult<FlightGuard<'_>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(closed(component));
        }
        state.in_flight += 1;
        Ok(FlightGuard { registry: self })
    }

    /// 原子地占用一组单例槽位
    ///
    /// 只要有成员正由其他线程创建就整体等待，不会只占用其中一部分。
    /// 等待在槽位发布、释放或注册表关闭时结束；配置了等待超时则超时后
    /// 返回 `CreationTimeout`。
    pub fn claim_group(&self, components: &[ComponentId]) -> DependencyResult<GroupClaim<'_>> {
        let Some(first) = components.first() else {
            return Ok(GroupClaim {
                registry: self,
                claims: HashMap::new(),
                owned: Vec::new(),
            });
        };
        let current = thread::current().id();
        let deadline = self
            .creation_wait_timeout
            .map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(closed(first));
            }

            let mut busy = None;
            for component in components {
                if let Some(Slot::Creating(owner)) = state.slots.get(component) {
                    if *owner == current {
                        return Err(DependencyError::circular([
                            component.to_string(),
                            component.to_string(),
                        ]));
                    }
                    busy = Some(*component);
                }
            }

            match busy {
                Some(component) => {
                    debug!(component = %component, "等待其他线程完成单例创建");
                    match deadline {
                        Some(deadline) => {
                            if self.changed.wait_until(&mut state, deadline).timed_out() {
                                return Err(DependencyError::CreationTimeout {
                                    component: component.to_string(),
                                });
                            }
                        }
                        None => self.changed.wait(&mut state),
                    }
                }
                None => {
                    let mut claims = HashMap::with_capacity(components.len());
                    let mut owned = Vec::new();
                    for component in components {
                        let claim = match state.slots.get(component) {
                            Some(Slot::Ready(instance)) => Claim::Ready(Arc::clone(instance)),
                            _ => {
                                state.slots.insert(*component, Slot::Creating(current));
                                owned.push(*component);
                                Claim::Owned
                            }
                        };
                        claims.insert(*component, claim);
                    }
                    return Ok(GroupClaim {
                        registry: self,
                        claims,
                        owned,
                    });
                }
            }
        }
    }

    /// 发布创建完成的单例
    pub fn publish(&self, instances: &[Arc<Instance>]) {
        let mut state = self.state.lock();
        for instance in instances {
            state
                .slots
                .insert(instance.component(), Slot::Ready(Arc::clone(instance)));
            state.created.push(Tracked::Singleton(Arc::clone(instance)));
            state.instances_created += 1;
            debug!(component = %instance.component(), instance = %instance.id(), "单例已发布");
        }
        drop(state);
        self.changed.notify_all();
    }

    /// 放弃当前线程占用的槽位
    pub fn abandon(&self, components: &[ComponentId]) {
        let current = thread::current().id();
        let mut state = self.state.lock();
        for component in components {
            if matches!(state.slots.get(component), Some(Slot::Creating(owner)) if *owner == current)
            {
                state.slots.remove(component);
                debug!(component = %component, "单例创建失败, 已释放槽位");
            }
        }
        drop(state);
        self.changed.notify_all();
    }

    /// 登记依赖作用域实例
    pub fn track(&self, instance: &Arc<Instance>) {
        let mut state = self.state.lock();
        state.created.push(Tracked::Dependent {
            component: instance.component(),
            instance: Arc::downgrade(instance),
            object: Arc::downgrade(instance.object()),
        });
        state.instances_created += 1;

        if state.created.len() % PRUNE_THRESHOLD == 0 {
            state.created.retain(|tracked| match tracked {
                Tracked::Singleton(_) => true,
                Tracked::Dependent { object, .. } => object.strong_count() > 0,
            });
        }
    }

    /// 活跃单例数量
    pub fn active_singletons(&self) -> usize {
        self.state
            .lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// 存活的依赖作用域实例数量
    pub fn live_dependents(&self) -> usize {
        self.state
            .lock()
            .created
            .iter()
            .filter(|tracked| {
                matches!(tracked, Tracked::Dependent { object, .. } if object.strong_count() > 0)
            })
            .count()
    }

    /// 累计创建的实例数量
    pub fn instances_created(&self) -> u64 {
        self.state.lock().instances_created
    }

    /// 进行中的请求数量
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    fn destroy(&self, component: ComponentId, object: &AnyInstance, instance: Option<&Instance>) {
        if let Some(instance) = instance {
            if instance.state() == InstanceState::Destroyed {
                return;
            }
        }
        if let Some(hook) = &self.destroy_hook {
            hook(component, object);
        }
        if let Some(instance) = instance {
            if let Err(error) = instance.transition(InstanceState::Destroyed) {
                warn!(component = %component, error = %error, "实例状态转换失败");
            }
        }
        debug!(component = %component, "实例已销毁");
    }
}

impl ScopeManager for InstanceRegistry {
    fn get_or_create(
        &self,
        component: &ComponentId,
        scope: Scope,
        create: CreateInstance<'_>,
    ) -> DependencyResult<Arc<Instance>> {
        let _flight = self.begin(component)?;

        match scope {
            Scope::Dependent => {
                let instance = create()?;
                self.track(&instance);
                Ok(instance)
            }
            Scope::Singleton => {
                let claim = self.claim_group(std::slice::from_ref(component))?;
                if let Some(instance) = claim.ready(component) {
                    return Ok(instance);
                }
                // 失败或 panic 时由 claim 释放槽位
                let instance = create()?;
                claim.publish(std::slice::from_ref(&instance));
                Ok(instance)
            }
        }
    }

    fn singleton(&self, component: &ComponentId) -> Option<Arc<Instance>> {
        match self.state.lock().slots.get(component) {
            Some(Slot::Ready(instance)) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    fn teardown(&self) -> DependencyResult<()> {
        let mut state = self.state.lock();
        if state.torn_down {
            return Ok(());
        }
        state.closed = true;
        self.changed.notify_all();

        let deadline = Instant::now() + self.teardown_timeout;
        while state.in_flight > 0 {
            if self.changed.wait_until(&mut state, deadline).timed_out() && state.in_flight > 0 {
                warn!(in_flight = state.in_flight, "等待进行中的创建请求超时");
                return Err(DependencyError::ShutdownTimeout {
                    in_flight: state.in_flight,
                });
            }
        }

        state.torn_down = true;
        state.slots.clear();
        let created = std::mem::take(&mut state.created);
        drop(state);

        let mut destroyed = 0_usize;
        for tracked in created.into_iter().rev() {
            match tracked {
                Tracked::Singleton(instance) => {
                    self.destroy(instance.component(), instance.object(), Some(&instance));
                    destroyed += 1;
                }
                Tracked::Dependent {
                    component,
                    instance,
                    object,
                } => {
                    if let Some(object) = object.upgrade() {
                        let instance = instance.upgrade();
                        self.destroy(component, &object, instance.as_deref());
                        destroyed += 1;
                    }
                }
            }
        }

        info!(destroyed, "实例注册表已关闭");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

fn closed(component: &ComponentId) -> DependencyError {
    DependencyError::RegistryClosed {
        component: component.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    struct Orange;

    fn registry() -> InstanceRegistry {
        InstanceRegistry::new(None, Duration::from_millis(200))
    }

    fn orange_instance(scope: Scope) -> DependencyResult<Arc<Instance>> {
        Ok(Arc::new(Instance::constructed(
            ComponentId::of::<Orange>(),
            scope,
            Arc::new(Orange),
        )))
    }

    #[test]
    fn test_singleton_identity() {
        let registry = registry();
        let id = ComponentId::of::<Orange>();

        let first = registry
            .get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton))
            .unwrap();
        let second = registry
            .get_or_create(&id, Scope::Singleton, &mut || panic!("should reuse"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.active_singletons(), 1);
        assert!(registry.singleton(&id).is_some());
    }

    #[test]
    fn test_dependent_instances_are_distinct() {
        let registry = registry();
        let id = ComponentId::of::<Orange>();

        let first = registry
            .get_or_create(&id, Scope::Dependent, &mut || orange_instance(Scope::Dependent))
            .unwrap();
        let second = registry
            .get_or_create(&id, Scope::Dependent, &mut || orange_instance(Scope::Dependent))
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.live_dependents(), 2);
        drop(first);
        assert_eq!(registry.live_dependents(), 1);
        assert!(registry.singleton(&id).is_none());
    }

    #[test]
    fn test_failed_creation_releases_claim() {
        let registry = registry();
        let id = ComponentId::of::<Orange>();

        let result = registry.get_or_create(&id, Scope::Singleton, &mut || {
            Err(DependencyError::lifecycle("boom"))
        });
        assert!(result.is_err());

        let instance = registry
            .get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton))
            .unwrap();
        assert_eq!(instance.component(), id);
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_same_thread_reentry_is_circular() {
        let registry = registry();
        let id = ComponentId::of::<Orange>();

        let result = registry.get_or_create(&id, Scope::Singleton, &mut || {
            registry.get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton))
        });
        assert!(matches!(
            result,
            Err(DependencyError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_concurrent_first_use_creates_once() {
        let registry = Arc::new(registry());
        let created = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let id = ComponentId::of::<Orange>();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let created = Arc::clone(&created);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry
                        .get_or_create(&id, Scope::Singleton, &mut || {
                            created.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            orange_instance(Scope::Singleton)
                        })
                        .unwrap()
                })
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn test_claim_group_is_all_or_nothing() {
        struct Blue;

        let registry = registry();
        let orange = ComponentId::of::<Orange>();
        let blue = ComponentId::of::<Blue>();

        let group = registry.claim_group(&[orange, blue]).unwrap();
        assert!(group.claims().values().all(|claim| matches!(claim, Claim::Owned)));
        assert_eq!(group.owned().len(), 2);

        let blue_instance = Arc::new(Instance::constructed(blue, Scope::Singleton, Arc::new(Blue)));
        group.publish(&[blue_instance]);
        assert_eq!(registry.active_singletons(), 1);

        let group = registry.claim_group(&[orange, blue]).unwrap();
        assert!(matches!(group.claims()[&orange], Claim::Owned));
        assert!(group.ready(&blue).is_some());
        assert_eq!(group.owned(), &[orange]);
    }

    #[test]
    fn test_slow_creation_is_awaited_without_timeout() {
        let registry = Arc::new(registry());
        let barrier = Arc::new(Barrier::new(2));
        let id = ComponentId::of::<Orange>();

        let slow = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                registry
                    .get_or_create(&id, Scope::Singleton, &mut || {
                        barrier.wait();
                        thread::sleep(Duration::from_millis(300));
                        orange_instance(Scope::Singleton)
                    })
                    .unwrap()
            })
        };

        barrier.wait();
        let waiting = registry
            .get_or_create(&id, Scope::Singleton, &mut || panic!("should wait for the claimant"))
            .unwrap();

        let created = slow.join().unwrap();
        assert!(Arc::ptr_eq(&created, &waiting));
    }

    #[test]
    fn test_configured_wait_timeout_is_reported() {
        let registry = Arc::new(InstanceRegistry::new(
            Some(Duration::from_millis(50)),
            Duration::from_millis(200),
        ));
        let barrier = Arc::new(Barrier::new(2));
        let id = ComponentId::of::<Orange>();

        let slow = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                registry.get_or_create(&id, Scope::Singleton, &mut || {
                    barrier.wait();
                    thread::sleep(Duration::from_millis(300));
                    orange_instance(Scope::Singleton)
                })
            })
        };

        barrier.wait();
        let result =
            registry.get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton));
        assert!(matches!(
            result,
            Err(DependencyError::CreationTimeout { .. })
        ));
        assert!(slow.join().unwrap().is_ok());
    }

    #[test]
    fn test_panicking_creation_releases_claim() {
        let registry = Arc::new(registry());
        let id = ComponentId::of::<Orange>();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.get_or_create(&id, Scope::Singleton, &mut || panic!("constructor failed"))
        }));
        assert!(unwound.is_err());
        assert_eq!(registry.in_flight(), 0);
        assert_eq!(registry.active_singletons(), 0);

        let other = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry.get_or_create(&id, Scope::Singleton, &mut || {
                    orange_instance(Scope::Singleton)
                })
            })
        };
        let from_other = other.join().unwrap().unwrap();

        let same_thread = registry
            .get_or_create(&id, Scope::Singleton, &mut || panic!("should reuse"))
            .unwrap();
        assert!(Arc::ptr_eq(&from_other, &same_thread));
    }

    #[test]
    fn test_teardown_during_creation_fails_nested_request() {
        struct Blue;

        let registry = Arc::new(registry());
        let barrier = Arc::new(Barrier::new(2));
        let orange = ComponentId::of::<Orange>();
        let blue = ComponentId::of::<Blue>();

        let creating = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut nested = None;
                let outer = registry.get_or_create(&orange, Scope::Singleton, &mut || {
                    barrier.wait();
                    while !registry.is_closed() {
                        thread::sleep(Duration::from_millis(5));
                    }
                    let result = registry.get_or_create(&blue, Scope::Singleton, &mut || {
                        Ok(Arc::new(Instance::constructed(blue, Scope::Singleton, Arc::new(Blue))))
                    });
                    let error = result.err();
                    let failure = error.as_ref().map_or_else(
                        || DependencyError::lifecycle("nested request succeeded"),
                        |e| DependencyError::lifecycle(e.to_string()),
                    );
                    nested = error;
                    Err(failure)
                });
                (outer, nested)
            })
        };

        barrier.wait();
        let teardown = registry.teardown();

        let (outer, nested) = creating.join().unwrap();
        assert!(teardown.is_ok());
        assert!(outer.is_err());
        assert!(matches!(nested, Some(DependencyError::RegistryClosed { .. })));
        assert_eq!(registry.active_singletons(), 0);
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_teardown_wakes_waiting_claimants() {
        let registry = Arc::new(registry());
        let id = ComponentId::of::<Orange>();
        let held = registry.claim_group(&[id]).unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry.get_or_create(&id, Scope::Singleton, &mut || {
                    orange_instance(Scope::Singleton)
                })
            })
        };
        while registry.in_flight() == 0 {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(registry.teardown().is_ok());
        assert!(matches!(
            waiter.join().unwrap(),
            Err(DependencyError::RegistryClosed { .. })
        ));
        drop(held);
        assert_eq!(registry.active_singletons(), 0);
    }

    #[test]
    fn test_teardown_closes_registry_and_runs_hooks_once() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let registry = registry().with_destroy_hook(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let id = ComponentId::of::<Orange>();

        let singleton = registry
            .get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton))
            .unwrap();
        let dependent = registry
            .get_or_create(&id, Scope::Dependent, &mut || orange_instance(Scope::Dependent))
            .unwrap();

        registry.teardown().unwrap();
        registry.teardown().unwrap();

        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(singleton.state(), InstanceState::Destroyed);
        assert_eq!(dependent.state(), InstanceState::Destroyed);
        assert!(registry.is_closed());

        let result =
            registry.get_or_create(&id, Scope::Singleton, &mut || orange_instance(Scope::Singleton));
        assert!(matches!(result, Err(DependencyError::RegistryClosed { .. })));
    }

    #[test]
    fn test_teardown_times_out_while_creation_in_flight() {
        let registry = registry();
        let id = ComponentId::of::<Orange>();

        let guard = registry.begin(&id).unwrap();
        assert!(matches!(
            registry.teardown(),
            Err(DependencyError::ShutdownTimeout { in_flight: 1 })
        ));
        drop(guard);
        assert!(registry.teardown().is_ok());
    }
}
