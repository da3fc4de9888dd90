//! The store: module registration, the init protocol, and the lifecycle
//! operations (`reset`/`cleanup`) built on top of the dispatcher, registry,
//! and middleware chain.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::accessor::StoreAccessor;
use crate::action::{Action, BoxedAction, DynAction};
use crate::cell::{ReactiveCell, StateSubscription};
use crate::dispatcher::{spawn_worker, ActionHandler, Dispatcher};
use crate::error::{ReaktivError, Result};
use crate::external::{ExternalApplyOutcome, ExternalApplyReport};
use crate::logic::Logic;
use crate::middleware::{compose, AllStates, BoxFuture, Middleware, MiddlewareContext};
use crate::module::{MaybeRegisterTypes, Module, State};
use crate::observer::{emit, LogicEvent, LogicEventMeta};
use crate::persistence::{decode, PersistedSnapshot, PersistenceBackend, PersistenceManager, TypeRegistry};
use crate::registry::{ModuleInfo, ModuleRegistry};

/// Single lock serializing every state commit: reducer application, direct
/// `load_state` writes, and `apply_external_states` writes all take this
/// lock for the duration of one commit. Never held across an `.await` that
/// isn't part of the commit itself.
pub(crate) type StateMutationLock = AsyncMutex<()>;

#[async_trait::async_trait]
impl PersistenceBackend for Arc<dyn PersistenceBackend> {
    async fn save(&self, bytes: Vec<u8>) -> Result<()> {
        (**self).save(bytes).await
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        (**self).load().await
    }

    async fn has_persisted_state(&self) -> Result<bool> {
        (**self).has_persisted_state().await
    }
}

type Chain = Arc<dyn Fn(BoxedAction, MiddlewareContext) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// Shared state behind every [`StoreAccessor`]/[`Store`] clone.
pub(crate) struct StoreInner {
    pub(crate) registry: ModuleRegistry,
    dispatcher: Arc<Dispatcher>,
    init_rx: watch::Receiver<bool>,
    tracker: TaskTracker,
    cancel: AsyncMutex<CancellationToken>,
    reset_generation: AtomicU64,
    persistence: Option<PersistenceManager<Arc<dyn PersistenceBackend>>>,
    handle: Option<tokio::runtime::Handle>,
    chain: Chain,
    pub(crate) type_registry: Arc<TypeRegistry>,
}

impl StoreInner {
    pub(crate) fn dispatch_boxed(&self, action: BoxedAction) -> Result<()> {
        self.dispatcher.enqueue(action)
    }

    pub(crate) async fn wait_for_init(&self) {
        let mut rx = self.init_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    fn all_states_snapshot(&self) -> Result<AllStates> {
        let mut snapshot = AllStates::new();
        for info in self.registry.all() {
            snapshot.insert(info.state_type_name, (info.encode_state)()?);
        }
        Ok(snapshot)
    }

    fn accessor(self: &Arc<Self>) -> StoreAccessor {
        StoreAccessor {
            inner: self.clone(),
        }
    }

    fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match &self.handle {
            Some(handle) => {
                self.tracker.spawn_on(future, handle);
            }
            None => {
                self.tracker.spawn(future);
            }
        }
    }
}

/// A running reaktiv store: a registry of modules dispatched through a
/// priority queue and an optional middleware chain.
///
/// Cheaply `Clone` — every clone shares the same underlying runtime.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Borrow the capability handle given to logic and middleware. Useful
    /// for wiring a store into code that only needs to dispatch/select,
    /// not the lifecycle operations below.
    pub fn accessor(&self) -> StoreAccessor {
        self.inner.accessor()
    }

    /// Enqueue `action` for processing. Non-blocking.
    pub fn dispatch<A: Action>(&self, action: A) -> Result<()> {
        self.inner.dispatch_boxed(Box::new(action))
    }

    /// Await the init barrier, then subscribe to `S`'s committed values.
    pub async fn select_state<S: State>(&self) -> Result<StateSubscription<S>> {
        self.inner.wait_for_init().await;
        self.select_state_now::<S>()
    }

    /// Non-suspending variant of [`Store::select_state`].
    pub fn select_state_now<S: State>(&self) -> Result<StateSubscription<S>> {
        self.accessor().select_state_now::<S>()
    }

    /// Await the init barrier, then return the constructed logic handle.
    pub async fn select_logic<L: Send + Sync + 'static>(&self) -> Result<Arc<L>> {
        self.inner.wait_for_init().await;
        self.accessor().select_logic::<L>().await
    }

    /// Encode every module's current state and write it to the configured
    /// persistence backend. Fails with `NoPersistenceConfigured` if none
    /// was given to the builder.
    pub async fn save_state(&self) -> Result<()> {
        let manager = self
            .inner
            .persistence
            .as_ref()
            .ok_or(ReaktivError::NoPersistenceConfigured)?;
        let mut snapshot = PersistedSnapshot::new();
        for info in self.inner.registry.all() {
            snapshot.insert(info.state_type_name.to_string(), (info.encode_state)()?);
        }
        manager.save(&snapshot).await
    }

    /// Load the persisted snapshot, writing each value directly into its
    /// module's cell under the mutation lock (bypassing reducers). An
    /// unrecognized top-level key fails the whole call fast; no partial
    /// load is applied in that case.
    pub async fn load_state(&self) -> Result<()> {
        let manager = self
            .inner
            .persistence
            .as_ref()
            .ok_or(ReaktivError::NoPersistenceConfigured)?;
        let Some(snapshot) = manager.load().await? else {
            return Ok(());
        };
        for key in snapshot.keys() {
            if self.inner.registry.by_state_type_name(key).is_none() {
                return Err(ReaktivError::SerializationError(format!(
                    "unrecognized persisted state key {key:?}"
                )));
            }
        }
        for (key, value) in snapshot {
            let info = self
                .inner
                .registry
                .by_state_type_name(&key)
                .expect("checked above");
            (info.load_state)(value).await?;
        }
        Ok(())
    }

    /// Query the backend without decoding.
    pub async fn has_persisted_state(&self) -> Result<bool> {
        let manager = self
            .inner
            .persistence
            .as_ref()
            .ok_or(ReaktivError::NoPersistenceConfigured)?;
        manager.has_persisted_state().await
    }

    /// Apply an externally supplied state snapshot. Per-entry outcomes are
    /// reported rather than short-circuiting on the first failure: a type
    /// mismatch or unknown key for one module does not block the others.
    pub async fn apply_external_states(
        &self,
        states: std::collections::HashMap<String, serde_json::Value>,
    ) -> ExternalApplyReport {
        let mut report = ExternalApplyReport::new();
        for (key, value) in states {
            let outcome = match self.inner.registry.by_state_type_name(&key) {
                Some(info) => (info.apply_external)(value).await,
                None => ExternalApplyOutcome::UnknownKey,
            };
            report.insert(key, outcome);
        }
        report
    }

    /// Cancel all outstanding spawned logic tasks and restart the
    /// two-queue worker. Module states are left untouched; only in-flight
    /// task-scoped work is interrupted.
    pub async fn reset(&self) {
        let generation = self.inner.reset_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "store reset");

        let new_cancel = {
            let mut guard = self.inner.cancel.lock().await;
            let old = std::mem::replace(&mut *guard, CancellationToken::new());
            old.cancel();
            guard.clone()
        };

        let handler = make_action_handler(self.inner.clone());
        spawn_worker(
            &self.inner.tracker,
            self.inner.handle.as_ref(),
            self.inner.dispatcher.clone(),
            handler,
            new_cancel,
        );
    }

    /// Cancel the full store scope and close both priority queues. Further
    /// `dispatch` calls fail with `StoreClosed`. Idempotent.
    pub async fn cleanup(&self) {
        self.inner.cancel.lock().await.cancel();
        self.inner.dispatcher.close();
        self.inner.tracker.close();
    }
}

fn make_action_handler(inner: Arc<StoreInner>) -> ActionHandler {
    Arc::new(move |action: BoxedAction| {
        let inner = inner.clone();
        Box::pin(async move {
            let all_states = inner.all_states_snapshot()?;
            let ctx = MiddlewareContext::new(all_states, inner.accessor());
            (inner.chain)(action, ctx).await.map(|_| ())
        })
    })
}

/// The chain's terminal closure: resolve the module owning `action`,
/// commit the reducer under the mutation lock, spawn the module's logic
/// fire-and-forget, and return the post-commit state encoded as JSON.
///
/// Built against a `Weak<StoreInner>` because it has to exist before
/// `StoreInner` itself does — the chain is one of `StoreInner`'s own
/// fields, assembled inside `Arc::new_cyclic`.
fn base_handler(weak: Weak<StoreInner>) -> Chain {
    Arc::new(move |action: BoxedAction, _ctx: MiddlewareContext| {
        let weak = weak.clone();
        Box::pin(async move {
            let inner = weak.upgrade().ok_or(ReaktivError::StoreClosed)?;
            let tag = action.module_tag();
            let info = inner.registry.by_tag(tag)?.clone();
            (info.dispatch_action)(action.as_any()).await?;
            let logic_future = (info.spawn_logic)(action.as_any());
            inner.spawn(logic_future);
            (info.encode_state)()
        })
    })
}

/// Fluent construction DSL for a [`Store`]. Modules, middleware, and an
/// optional persistence backend and runtime handle are gathered here; the
/// init protocol (lock the registry, register each module, construct
/// logic, release, flip the init barrier, start the worker) runs in
/// [`StoreBuilder::build`].
pub struct StoreBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    type_registrations: Vec<Box<dyn FnOnce(&mut TypeRegistry)>>,
    registrations: Vec<
        Box<dyn FnOnce(&mut ModuleRegistry, &Arc<StateMutationLock>, &Arc<TypeRegistry>) -> Result<()>>,
    >,
    finishers: Vec<Box<dyn FnOnce(&StoreAccessor)>>,
    persistence: Option<Arc<dyn PersistenceBackend>>,
    handle: Option<tokio::runtime::Handle>,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
            type_registrations: Vec::new(),
            registrations: Vec::new(),
            finishers: Vec::new(),
            persistence: None,
            handle: None,
        }
    }

    /// Register a module. `Module::create_logic` runs later, in
    /// `StoreBuilder::build`'s second init pass, once a `StoreAccessor`
    /// exists — before that, this module's state is already selectable,
    /// just not its logic. If the module also implements
    /// [`crate::module::TypeRegistrar`], its declared tags are folded into
    /// the store's type registry; nothing further is required to opt in.
    pub fn module<M>(mut self, module: M) -> Self
    where
        M: Module,
    {
        let module = Arc::new(module);
        let logic_cell: Arc<OnceLock<Arc<dyn Any + Send + Sync>>> = Arc::new(OnceLock::new());

        let type_reg_module = module.clone();
        self.type_registrations.push(Box::new(move |registry| {
            let m: &M = type_reg_module.as_ref();
            (&m).maybe_register_types(registry);
        }));

        let reg_module = module.clone();
        let reg_logic_cell = logic_cell.clone();
        self.registrations.push(Box::new(move |registry, lock, type_registry| {
            register_module(registry, lock, reg_module, reg_logic_cell, type_registry.clone())
        }));

        self.finishers.push(Box::new(move |accessor| {
            let logic = module.create_logic(accessor.clone());
            let _ = logic_cell.set(Arc::new(logic) as Arc<dyn Any + Send + Sync>);
        }));

        self
    }

    /// Append a middleware to the chain. Middlewares run in the order
    /// added, outermost first.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Configure a persistence backend for `save_state`/`load_state`/
    /// `has_persisted_state`. Without one, those calls fail with
    /// `NoPersistenceConfigured`.
    pub fn persistence(mut self, backend: impl PersistenceBackend) -> Self {
        self.persistence = Some(Arc::new(backend));
        self
    }

    /// Spawn the store's worker and every module's logic invocations onto
    /// this runtime handle instead of the ambient one.
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Run the init protocol and start the worker: lock the mutation lock,
    /// register every module's `ModuleInfo` (state now selectable),
    /// release the lock, construct every module's logic against the now-
    /// complete accessor, flip the init barrier, and start the worker.
    pub async fn build(self) -> Result<Store> {
        let mut type_registry = TypeRegistry::new();
        for register_types in self.type_registrations {
            register_types(&mut type_registry);
        }
        let type_registry = Arc::new(type_registry);

        let mutation_lock = Arc::new(StateMutationLock::new(()));
        let mut registry = ModuleRegistry::new();

        {
            let _guard = mutation_lock.lock().await;
            for register in self.registrations {
                register(&mut registry, &mutation_lock, &type_registry)?;
            }
        }

        let (init_tx, init_rx) = watch::channel(false);
        let middlewares = self.middlewares;
        let persistence = self
            .persistence
            .map(PersistenceManager::<Arc<dyn PersistenceBackend>>::new);

        let inner = Arc::new_cyclic(|weak| StoreInner {
            registry,
            dispatcher: Arc::new(Dispatcher::new()),
            init_rx,
            tracker: TaskTracker::new(),
            cancel: AsyncMutex::new(CancellationToken::new()),
            reset_generation: AtomicU64::new(0),
            persistence,
            handle: self.handle,
            chain: compose(middlewares, base_handler(weak.clone())),
            type_registry,
        });

        let accessor = inner.accessor();
        for finish in self.finishers {
            finish(&accessor);
        }

        let cancel = inner.cancel.lock().await.clone();
        let handler = make_action_handler(inner.clone());
        spawn_worker(
            &inner.tracker,
            inner.handle.as_ref(),
            inner.dispatcher.clone(),
            handler,
            cancel,
        );

        let _ = init_tx.send(true);

        Ok(Store { inner })
    }
}

/// If `value` carries a top-level `"type"` discriminator string and
/// `union_name` has any tags registered in `type_registry`, reject tags
/// that aren't among them. A module that never registered anything under
/// `union_name` sees no behavior change — `None` every time.
fn check_registered_tag(
    type_registry: &TypeRegistry,
    union_name: &'static str,
    value: &serde_json::Value,
) -> Option<String> {
    if !type_registry.has_registrations(union_name) {
        return None;
    }
    let tag = value.get("type")?.as_str()?;
    if type_registry.is_known(union_name, tag) {
        None
    } else {
        Some(format!("unregistered type tag {tag:?} for {union_name}"))
    }
}

/// Build one module's `ModuleInfo` and register it. Split out of
/// `StoreBuilder::module` because it needs to be generic over `M` at the
/// point the closure runs, not at the point it is captured.
fn register_module<M: Module>(
    registry: &mut ModuleRegistry,
    lock: &Arc<StateMutationLock>,
    module: Arc<M>,
    logic_cell: Arc<OnceLock<Arc<dyn Any + Send + Sync>>>,
    type_registry: Arc<TypeRegistry>,
) -> Result<()> {
    let cell: Arc<ReactiveCell<M::State>> = Arc::new(ReactiveCell::new(module.initial_state()));
    let state_type_name = std::any::type_name::<M::State>();

    let dispatch_module = module.clone();
    let dispatch_cell = cell.clone();
    let dispatch_lock = lock.clone();
    let dispatch_action: Box<dyn Fn(&dyn Any) -> BoxFuture<'static, Result<()>> + Send + Sync> =
        Box::new(move |action_any| {
            let module = dispatch_module.clone();
            let cell = dispatch_cell.clone();
            let lock = dispatch_lock.clone();
            let action = action_any
                .downcast_ref::<M::Action>()
                .expect("dispatch_action only ever called with this module's own action type")
                .clone();
            Box::pin(async move {
                let _guard = lock.lock().await;
                let current = cell.get();
                let next = module.reduce(&current, &action);
                cell.set(next);
                Ok(())
            })
        });

    let spawn_logic_cell = logic_cell.clone();
    let spawn_logic: Box<dyn Fn(&dyn Any) -> BoxFuture<'static, ()> + Send + Sync> =
        Box::new(move |action_any| {
            let logic_cell = spawn_logic_cell.clone();
            let action = action_any
                .downcast_ref::<M::Action>()
                .expect("spawn_logic only ever called with this module's own action type")
                .clone();
            Box::pin(async move {
                let Some(logic_any) = logic_cell.get() else {
                    return;
                };
                let Ok(logic) = logic_any.clone().downcast::<M::Logic>() else {
                    return;
                };
                let meta = LogicEventMeta {
                    logic_type: std::any::type_name::<M::Logic>(),
                    method: "handle",
                    params: vec![format!("{action:?}")],
                    correlation_id: Uuid::new_v4(),
                    timestamp: Utc::now(),
                    location: None,
                };
                emit(LogicEvent::Start(meta.clone()));
                let start = Instant::now();
                match logic.handle(&action).await {
                    Ok(()) => emit(LogicEvent::Complete {
                        meta,
                        result_summary: "ok".to_string(),
                        duration: start.elapsed(),
                    }),
                    Err(e) => emit(LogicEvent::Fail {
                        meta,
                        exception_type: e.variant_name().to_string(),
                        exception_message: e.to_string(),
                        stack: None,
                        duration: start.elapsed(),
                    }),
                }
            })
        });

    let encode_cell = cell.clone();
    let encode_state: Box<dyn Fn() -> Result<serde_json::Value> + Send + Sync> =
        Box::new(move || {
            serde_json::to_value(encode_cell.get())
                .map_err(|e| ReaktivError::SerializationError(e.to_string()))
        });

    let load_cell = cell.clone();
    let load_lock = lock.clone();
    let load_type_registry = type_registry.clone();
    let load_state: Box<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<()>> + Send + Sync> =
        Box::new(move |value| {
            let cell = load_cell.clone();
            let lock = load_lock.clone();
            let type_registry = load_type_registry.clone();
            Box::pin(async move {
                if let Some(reason) = check_registered_tag(&type_registry, state_type_name, &value) {
                    return Err(ReaktivError::SerializationError(reason));
                }
                let decoded: M::State = decode(value)?;
                let _guard = lock.lock().await;
                cell.set(decoded);
                Ok(())
            })
        });

    let external_module = module.clone();
    let external_cell = cell.clone();
    let external_lock = lock.clone();
    let external_type_registry = type_registry.clone();
    let apply_external: Box<
        dyn Fn(serde_json::Value) -> BoxFuture<'static, ExternalApplyOutcome> + Send + Sync,
    > = Box::new(move |value| {
        let module = external_module.clone();
        let cell = external_cell.clone();
        let lock = external_lock.clone();
        let type_registry = external_type_registry.clone();
        Box::pin(async move {
            if let Some(reason) = check_registered_tag(&type_registry, state_type_name, &value) {
                return ExternalApplyOutcome::TypeMismatch { reason };
            }
            let incoming: M::State = match decode(value) {
                Ok(v) => v,
                Err(e) => {
                    return ExternalApplyOutcome::TypeMismatch {
                        reason: e.to_string(),
                    }
                }
            };
            let _guard = lock.lock().await;
            let current = cell.get();
            let committed = module.merge_external(&current, incoming);
            cell.set(committed);
            ExternalApplyOutcome::Applied
        })
    });

    let info = ModuleInfo {
        module_tag: module.module_tag(),
        state_type_name,
        logic_type_name: std::any::type_name::<M::Logic>(),
        state_type_id: TypeId::of::<M::State>(),
        logic_type_id: TypeId::of::<M::Logic>(),
        dispatch_action,
        cell,
        logic: logic_cell,
        spawn_logic,
        encode_state,
        load_state,
        apply_external,
    };

    registry.register(info)
}
