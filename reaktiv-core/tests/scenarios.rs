//! End-to-end scenarios against the public `reaktiv_core` surface: the five
//! literal-value acceptance scenarios, plus a handful of the universal
//! properties that are naturally expressed as an integration test rather
//! than a unit test on a single module.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reaktiv_core::observer::LogicEvent;
use reaktiv_core::testing::RecordingObserver;
use reaktiv_core::{
    deregister, register, Action, ExternalApplyOutcome, Logic, Middleware, MiddlewareContext,
    Module, NoopLogic, PersistenceBackend, Priority, ReaktivError, Result, Store, StoreAccessor,
    StoreBuilder, TypeRegistrar, TypeRegistry,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------
// Counter module, shared by several scenarios below.
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct CounterState {
    count: i32,
}

#[derive(Clone, Debug)]
enum CounterAction {
    Inc,
}

impl Action for CounterAction {
    fn name(&self) -> &'static str {
        "Inc"
    }
    fn module_tag(&self) -> &'static str {
        "Counter"
    }
}

struct CounterModule;

impl Module for CounterModule {
    type State = CounterState;
    type Action = CounterAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "Counter"
    }
    fn initial_state(&self) -> Self::State {
        CounterState { count: 0 }
    }
    fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
        CounterState {
            count: state.count + 1,
        }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

#[tokio::test]
async fn counter_single_step() {
    let store = StoreBuilder::new()
        .module(CounterModule)
        .build()
        .await
        .expect("build store");

    let mut sub = store.select_state::<CounterState>().await.expect("select");
    assert_eq!(sub.next().await, CounterState { count: 0 });

    store.dispatch(CounterAction::Inc).expect("dispatch");
    assert_eq!(sub.next().await, CounterState { count: 1 });
}

// ---------------------------------------------------------------------
// Priority preemption: Logger module appending tags to a list.
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct LoggerState {
    entries: Vec<String>,
}

#[derive(Clone, Debug)]
enum LoggerAction {
    Append { tag: String, priority: Priority },
}

impl Action for LoggerAction {
    fn name(&self) -> &'static str {
        "Append"
    }
    fn module_tag(&self) -> &'static str {
        "Logger"
    }
    fn priority(&self) -> Priority {
        match self {
            LoggerAction::Append { priority, .. } => *priority,
        }
    }
}

struct LoggerModule;

impl Module for LoggerModule {
    type State = LoggerState;
    type Action = LoggerAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "Logger"
    }
    fn initial_state(&self) -> Self::State {
        LoggerState { entries: vec![] }
    }
    fn reduce(&self, state: &Self::State, action: &Self::Action) -> Self::State {
        let LoggerAction::Append { tag, .. } = action;
        let mut entries = state.entries.clone();
        entries.push(tag.clone());
        LoggerState { entries }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

fn normal(tag: &str) -> LoggerAction {
    LoggerAction::Append {
        tag: tag.to_string(),
        priority: Priority::Normal,
    }
}

fn high(tag: &str) -> LoggerAction {
    LoggerAction::Append {
        tag: tag.to_string(),
        priority: Priority::High,
    }
}

#[tokio::test]
async fn priority_preemption_interleaves_a_high_action_between_two_normal_ones() {
    let store = StoreBuilder::new()
        .module(LoggerModule)
        .build()
        .await
        .expect("build store");

    let mut sub = store.select_state::<LoggerState>().await.expect("select");
    assert_eq!(sub.next().await, LoggerState { entries: vec![] });

    // "a" is dispatched and fully committed before "b"/"x" even reach the
    // queues, so the worker is genuinely idle, waiting on the channels,
    // when the next two dispatches land back to back.
    store.dispatch(normal("a")).expect("dispatch a");
    assert_eq!(
        sub.next().await,
        LoggerState {
            entries: vec!["a".into()]
        }
    );

    // Dispatched with no `.await` between them: both land in their queues
    // before the worker is scheduled again, so the biased high-first select
    // picks "x" ahead of the already-queued "b".
    store.dispatch(normal("b")).expect("dispatch b");
    store.dispatch(high("x")).expect("dispatch x");

    assert_eq!(
        sub.next().await,
        LoggerState {
            entries: vec!["a".into(), "x".into()]
        }
    );
    assert_eq!(
        sub.next().await,
        LoggerState {
            entries: vec!["a".into(), "x".into(), "b".into()]
        }
    );
}

// ---------------------------------------------------------------------
// Middleware short-circuit.
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
enum MixedAction {
    Debug,
    Inc,
}

impl Action for MixedAction {
    fn name(&self) -> &'static str {
        match self {
            MixedAction::Debug => "Debug",
            MixedAction::Inc => "Inc",
        }
    }
    fn module_tag(&self) -> &'static str {
        "Counter"
    }
}

struct DropDebugMiddleware;

#[async_trait]
impl Middleware for DropDebugMiddleware {
    async fn handle(
        &self,
        action: reaktiv_core::action::BoxedAction,
        _ctx: &MiddlewareContext,
        next: reaktiv_core::middleware::Next,
    ) -> Result<serde_json::Value> {
        if action.name() == "Debug" {
            return Ok(serde_json::Value::Null);
        }
        next(action).await
    }
}

struct MixedCounterModule;

impl Module for MixedCounterModule {
    type State = CounterState;
    type Action = MixedAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "Counter"
    }
    fn initial_state(&self) -> Self::State {
        CounterState { count: 0 }
    }
    fn reduce(&self, state: &Self::State, action: &Self::Action) -> Self::State {
        match action {
            MixedAction::Inc => CounterState {
                count: state.count + 1,
            },
            MixedAction::Debug => state.clone(),
        }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

#[tokio::test]
async fn middleware_short_circuit_drops_the_action_before_the_reducer_runs() {
    let store = StoreBuilder::new()
        .module(MixedCounterModule)
        .middleware(DropDebugMiddleware)
        .build()
        .await
        .expect("build store");

    let mut sub = store.select_state::<CounterState>().await.expect("select");
    assert_eq!(sub.next().await, CounterState { count: 0 });

    store.dispatch(MixedAction::Debug).expect("dispatch debug");
    store.dispatch(MixedAction::Inc).expect("dispatch inc");

    // The dropped `Debug` never reaches the reducer, so the only commit
    // observed is the one caused by `Inc`.
    assert_eq!(sub.next().await, CounterState { count: 1 });
}

// ---------------------------------------------------------------------
// Persistence round-trip, against an in-memory backend.
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct UserState {
    name: String,
}

#[derive(Clone, Debug)]
enum UserAction {
    SetName(String),
}

impl Action for UserAction {
    fn name(&self) -> &'static str {
        "SetName"
    }
    fn module_tag(&self) -> &'static str {
        "User"
    }
}

struct UserModule;

impl Module for UserModule {
    type State = UserState;
    type Action = UserAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "User"
    }
    fn initial_state(&self) -> Self::State {
        UserState {
            name: "".to_string(),
        }
    }
    fn reduce(&self, _state: &Self::State, action: &Self::Action) -> Self::State {
        let UserAction::SetName(name) = action;
        UserState { name: name.clone() }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

#[derive(Default, Clone)]
struct InMemoryBackend {
    bytes: Arc<Mutex<Option<Vec<u8>>>>,
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn save(&self, bytes: Vec<u8>) -> Result<()> {
        *self.bytes.lock().expect("backend poisoned") = Some(bytes);
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.bytes.lock().expect("backend poisoned").clone())
    }

    async fn has_persisted_state(&self) -> Result<bool> {
        Ok(self.bytes.lock().expect("backend poisoned").is_some())
    }
}

#[tokio::test]
async fn persistence_round_trips_every_registered_module() {
    let backend = InMemoryBackend::default();

    let writer = StoreBuilder::new()
        .module(CounterModule)
        .module(UserModule)
        .persistence(backend.clone())
        .build()
        .await
        .expect("build writer store");

    writer.dispatch(UserAction::SetName("bob".into())).expect("dispatch");
    let mut counter_sub = writer
        .select_state::<CounterState>()
        .await
        .expect("select counter");
    assert_eq!(counter_sub.next().await, CounterState { count: 0 });
    for _ in 0..3 {
        writer.dispatch(CounterAction::Inc).expect("dispatch inc");
        counter_sub.next().await;
    }
    let mut user_sub = writer.select_state::<UserState>().await.expect("select user");
    assert_eq!(user_sub.next().await.name, "bob");

    writer.save_state().await.expect("save");

    let reader = StoreBuilder::new()
        .module(CounterModule)
        .module(UserModule)
        .persistence(backend)
        .build()
        .await
        .expect("build reader store");
    reader.load_state().await.expect("load");

    let counter: CounterState = reader
        .select_state_now::<CounterState>()
        .expect("select counter")
        .current();
    let user: UserState = reader
        .select_state_now::<UserState>()
        .expect("select user")
        .current();

    assert_eq!(counter, CounterState { count: 3 });
    assert_eq!(user, UserState { name: "bob".into() });
}

// ---------------------------------------------------------------------
// External override with a merge hook.
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct NavigationState {
    routes: Vec<String>,
    graph_defs: String,
}

#[derive(Clone, Debug)]
enum NavigationAction {
    Noop,
}

impl Action for NavigationAction {
    fn name(&self) -> &'static str {
        "Noop"
    }
    fn module_tag(&self) -> &'static str {
        "Navigation"
    }
}

struct NavigationModule;

impl Module for NavigationModule {
    type State = NavigationState;
    type Action = NavigationAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "Navigation"
    }
    fn initial_state(&self) -> Self::State {
        NavigationState {
            routes: vec!["/home".to_string()],
            graph_defs: "local-graph".to_string(),
        }
    }
    fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
        state.clone()
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }

    fn merge_external(&self, local: &Self::State, incoming: Self::State) -> Self::State {
        NavigationState {
            routes: incoming.routes,
            graph_defs: local.graph_defs.clone(),
        }
    }
}

#[tokio::test]
async fn external_override_preserves_local_state_the_merge_hook_protects() {
    let store = StoreBuilder::new()
        .module(NavigationModule)
        .build()
        .await
        .expect("build store");

    let mut sub = store
        .select_state::<NavigationState>()
        .await
        .expect("select");
    assert_eq!(
        sub.next().await,
        NavigationState {
            routes: vec!["/home".into()],
            graph_defs: "local-graph".into(),
        }
    );

    let incoming = NavigationState {
        routes: vec!["/remote-a".into(), "/remote-b".into()],
        graph_defs: "remote-graph".into(),
    };
    let mut states = HashMap::new();
    states.insert(
        std::any::type_name::<NavigationState>().to_string(),
        serde_json::to_value(&incoming).unwrap(),
    );

    let report = store.apply_external_states(states).await;
    assert_eq!(
        report.get(std::any::type_name::<NavigationState>()),
        Some(&ExternalApplyOutcome::Applied)
    );

    assert_eq!(
        sub.next().await,
        NavigationState {
            routes: vec!["/remote-a".into(), "/remote-b".into()],
            graph_defs: "local-graph".into(),
        }
    );
}

#[tokio::test]
async fn external_override_of_an_unknown_key_is_reported_and_ignored() {
    let store = StoreBuilder::new()
        .module(NavigationModule)
        .build()
        .await
        .expect("build store");

    let mut states = HashMap::new();
    states.insert("not-a-registered-state".to_string(), serde_json::json!({}));
    let report = store.apply_external_states(states).await;
    assert_eq!(
        report.get("not-a-registered-state"),
        Some(&ExternalApplyOutcome::UnknownKey)
    );
}

// ---------------------------------------------------------------------
// Duplicate registration failure.
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
enum OtherCounterAction {
    Inc,
}

impl Action for OtherCounterAction {
    fn name(&self) -> &'static str {
        "Inc"
    }
    fn module_tag(&self) -> &'static str {
        "OtherCounter"
    }
}

struct OtherCounterModule;

impl Module for OtherCounterModule {
    type State = CounterState;
    type Action = OtherCounterAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "OtherCounter"
    }
    fn initial_state(&self) -> Self::State {
        CounterState { count: 100 }
    }
    fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
        CounterState {
            count: state.count + 1,
        }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

#[tokio::test]
async fn two_modules_sharing_a_state_type_fail_to_build() {
    let result = StoreBuilder::new()
        .module(CounterModule)
        .module(OtherCounterModule)
        .build()
        .await;

    match result {
        Err(ReaktivError::DuplicateStateRegistration { state_type }) => {
            assert!(state_type.contains("CounterState"));
        }
        other => panic!("expected DuplicateStateRegistration, got {other:?}"),
    }
}

// ---------------------------------------------------------------------
// Idempotent cleanup.
// ---------------------------------------------------------------------

#[tokio::test]
async fn cleanup_is_idempotent() {
    let store: Store = StoreBuilder::new()
        .module(CounterModule)
        .build()
        .await
        .expect("build store");

    store.cleanup().await;
    store.cleanup().await;

    match store.dispatch(CounterAction::Inc) {
        Err(ReaktivError::StoreClosed) => {}
        other => panic!("expected StoreClosed after cleanup, got {other:?}"),
    }
}

// ---------------------------------------------------------------------
// TypeRegistrar: opt-in tag validation on external apply.
// ---------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct TaggedState {
    value: i32,
}

#[derive(Clone, Debug)]
enum TaggedAction {
    Noop,
}

impl Action for TaggedAction {
    fn name(&self) -> &'static str {
        "Noop"
    }
    fn module_tag(&self) -> &'static str {
        "Tagged"
    }
}

struct TaggedModule;

impl Module for TaggedModule {
    type State = TaggedState;
    type Action = TaggedAction;
    type Logic = NoopLogic;

    fn module_tag(&self) -> &'static str {
        "Tagged"
    }
    fn initial_state(&self) -> Self::State {
        TaggedState { value: 0 }
    }
    fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
        state.clone()
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        NoopLogic
    }
}

impl TypeRegistrar for TaggedModule {
    fn register_types(&self, registry: &mut TypeRegistry) {
        registry.register(std::any::type_name::<TaggedState>(), "Known");
    }
}

#[tokio::test]
async fn external_apply_rejects_a_tag_the_module_never_registered() {
    let store = StoreBuilder::new()
        .module(TaggedModule)
        .build()
        .await
        .expect("build store");

    let mut states = HashMap::new();
    states.insert(
        std::any::type_name::<TaggedState>().to_string(),
        serde_json::json!({"type": "Unknown", "value": 5}),
    );
    let report = store.apply_external_states(states).await;
    match report.get(std::any::type_name::<TaggedState>()) {
        Some(ExternalApplyOutcome::TypeMismatch { reason }) => {
            assert!(reason.contains("Unknown"));
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn external_apply_accepts_a_tag_the_module_registered() {
    let store = StoreBuilder::new()
        .module(TaggedModule)
        .build()
        .await
        .expect("build store");

    let mut states = HashMap::new();
    states.insert(
        std::any::type_name::<TaggedState>().to_string(),
        serde_json::json!({"type": "Known", "value": 5}),
    );
    let report = store.apply_external_states(states).await;
    assert_eq!(
        report.get(std::any::type_name::<TaggedState>()),
        Some(&ExternalApplyOutcome::Applied)
    );

    let current = store
        .select_state_now::<TaggedState>()
        .expect("select")
        .current();
    assert_eq!(current, TaggedState { value: 5 });
}

// ---------------------------------------------------------------------
// Logic failures are reported through the observer interface, without
// rolling back the commit that triggered them.
// ---------------------------------------------------------------------

struct FailingLogic;

#[async_trait]
impl Logic<CounterAction> for FailingLogic {
    async fn handle(&self, _action: &CounterAction) -> Result<()> {
        Err(ReaktivError::LogicFailed("boom".to_string()))
    }
}

struct FailingCounterModule;

impl Module for FailingCounterModule {
    type State = CounterState;
    type Action = CounterAction;
    type Logic = FailingLogic;

    fn module_tag(&self) -> &'static str {
        "Counter"
    }
    fn initial_state(&self) -> Self::State {
        CounterState { count: 0 }
    }
    fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
        CounterState {
            count: state.count + 1,
        }
    }
    fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic {
        FailingLogic
    }
}

#[tokio::test]
async fn a_failing_logic_handler_emits_fail_without_rolling_back_the_commit() {
    let observer = Arc::new(RecordingObserver::new());
    let handle = register(observer.clone());

    let store = StoreBuilder::new()
        .module(FailingCounterModule)
        .build()
        .await
        .expect("build store");

    let mut sub = store.select_state::<CounterState>().await.expect("select");
    assert_eq!(sub.next().await, CounterState { count: 0 });

    store.dispatch(CounterAction::Inc).expect("dispatch");
    // The reducer already committed by the time logic runs, so the commit
    // stands regardless of what logic does with the action afterward.
    assert_eq!(sub.next().await, CounterState { count: 1 });

    let saw_fail = |events: &[LogicEvent]| {
        events.iter().any(|e| {
            if let LogicEvent::Fail {
                exception_message, ..
            } = e
            {
                exception_message.contains("boom")
            } else {
                false
            }
        })
    };
    for _ in 0..100 {
        if saw_fail(&observer.events()) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(saw_fail(&observer.events()), "expected a Fail event mentioning the logic error");

    deregister(&handle);
}
