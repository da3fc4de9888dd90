//! Logic: the asynchronous side-effect handler invoked after each commit.

use async_trait::async_trait;

use crate::action::Action;
use crate::error::Result;

/// A module's side-effect handler. Constructed once, at store init, via
/// [`crate::module::Module::create_logic`]; invoked fire-and-forget after
/// every commit of an action belonging to the owning module.
///
/// Logic tasks are spawned independently per dispatched action and
/// complete independently of one another and of the dispatcher; a logic
/// task that dispatches new actions has those re-enter the queue with no
/// synchronous coupling back to the action that triggered it.
///
/// A failing `handle` does not roll back the commit that triggered it —
/// the reducer already ran — it is only reported through the observer
/// interface as [`crate::observer::LogicEvent::Fail`].
#[async_trait]
pub trait Logic<A: Action>: Send + Sync + 'static {
    /// Handle one committed action.
    async fn handle(&self, action: &A) -> Result<()>;
}

/// A logic that does nothing — the default for modules with no side
/// effects to perform.
pub struct NoopLogic;

#[async_trait]
impl<A: Action> Logic<A> for NoopLogic {
    async fn handle(&self, _action: &A) -> Result<()> {
        Ok(())
    }
}
