//! The named-event capability consumed by the asset pipeline.
//!
//! The process event bus itself lives outside this workspace. The
//! pipeline only needs two operations from it: subscribing a handler
//! to a named event and firing a named event. Hosts adapt their bus
//! by implementing [`EventBus`].

use std::sync::Arc;

/// Handler invoked when a subscribed event fires. Runs on whatever
/// thread the bus fires from.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Minimal named-event surface of the host's event bus.
pub trait EventBus: Send + Sync {
    /// Registers `handler` to run every time `event` fires.
    fn subscribe(&self, event: &str, handler: EventHandler);

    /// Fires the named event, running all handlers subscribed to it.
    fn fire(&self, event: &str);
}
