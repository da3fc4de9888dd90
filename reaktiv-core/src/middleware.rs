//! Middleware chain: user-supplied interceptors composed right-to-left
//! around the reducer+logic base handler.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::accessor::StoreAccessor;
use crate::action::BoxedAction;
use crate::error::Result;

/// A boxed future returned by [`Middleware::handle`] and by the chain's
/// composed entry point.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Snapshot of every module's current committed state, keyed by state
/// type name, as JSON — the `get_all_states` argument passed into every
/// middleware invocation.
pub type AllStates = HashMap<&'static str, serde_json::Value>;

/// Read-only context handed to every middleware invocation.
pub struct MiddlewareContext {
    all_states: AllStates,
    accessor: StoreAccessor,
}

impl MiddlewareContext {
    pub(crate) fn new(all_states: AllStates, accessor: StoreAccessor) -> Self {
        Self {
            all_states,
            accessor,
        }
    }

    /// A snapshot of every module's current state, taken just before this
    /// middleware invocation began.
    pub fn get_all_states(&self) -> &AllStates {
        &self.all_states
    }

    /// The store accessor, for middlewares that need to dispatch a
    /// different action or select other modules' state/logic.
    pub fn accessor(&self) -> &StoreAccessor {
        &self.accessor
    }
}

/// Advances the chain toward the base handler with the given action,
/// resolving to the post-commit state of that action's owning module
/// (encoded as JSON, since different modules own different state types).
///
/// A middleware that wants a *different* action processed should dispatch
/// it independently via `ctx.accessor().dispatch(...)` — that re-enters
/// the full pipeline as its own, separately-prioritized action — and then
/// decide separately whether to call `next` with the action it was given,
/// to let the original proceed. See `DESIGN.md` for why this crate models
/// "pass a different action" as an explicit re-dispatch rather than an
/// argument substitution.
pub type Next = Arc<dyn Fn(BoxedAction) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// An interceptor around the reducer+logic base handler.
///
/// Middlewares are composed right-to-left at store-build time (cached,
/// since the middleware list is fixed at build). A middleware that does
/// not call `next` short-circuits the action: no reducer runs, no logic
/// is scheduled.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Intercept `action`. Call `next(action)` to continue the chain.
    async fn handle(
        &self,
        action: BoxedAction,
        ctx: &MiddlewareContext,
        next: Next,
    ) -> Result<serde_json::Value>;
}

/// Compose a fixed list of middlewares into a single entry point, right-to-
/// left around `base`. The returned closure is what the dispatcher invokes
/// for every action; it is built once at store-build time and reused for
/// every dispatch (the middleware list cannot change afterward).
pub(crate) fn compose(
    middlewares: Vec<Arc<dyn Middleware>>,
    base: Arc<
        dyn Fn(BoxedAction) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync,
    >,
) -> impl Fn(BoxedAction, MiddlewareContext) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync
{
    move |action: BoxedAction, ctx: MiddlewareContext| {
        let ctx = Arc::new(ctx);
        let chain = build_chain(middlewares.clone(), base.clone(), ctx.clone());
        chain(action)
    }
}

fn build_chain(
    middlewares: Vec<Arc<dyn Middleware>>,
    base: Arc<
        dyn Fn(BoxedAction) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync,
    >,
    ctx: Arc<MiddlewareContext>,
) -> Next {
    let mut next: Next = Arc::new(move |action| base(action));
    for mw in middlewares.into_iter().rev() {
        let inner_next = next.clone();
        let ctx = ctx.clone();
        next = Arc::new(move |action: BoxedAction| {
            let mw = mw.clone();
            let inner_next = inner_next.clone();
            let ctx = ctx.clone();
            Box::pin(async move { mw.handle(action, &ctx, inner_next).await })
        });
    }
    next
}

/// A middleware that logs every action before it reaches the base
/// handler.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        action: BoxedAction,
        ctx: &MiddlewareContext,
        next: Next,
    ) -> Result<serde_json::Value> {
        tracing::debug!(action = action.name(), module = action.module_tag(), "dispatching action");
        let result = next(action).await;
        if let Err(ref err) = result {
            tracing::warn!(error = %err, "action processing failed");
        }
        result
    }
}
