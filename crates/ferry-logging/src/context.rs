//! Node context injection for multi-node logging
//!
//! The simulator drives many routers from one thread. This module keeps the
//! identity of the node currently being driven in thread-local storage so
//! spans opened while handling its events can be attributed to it.

use std::cell::RefCell;

use ferry_core::PeerIdentity;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// The node's endpoint identifier in short form
    pub node_id: String,
    /// Unique instance ID for this router session
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Creating the guard sets the node context for the current thread. Dropping
/// it restores whatever context was active before.
///
/// # Example
///
/// ```ignore
/// use ferry_logging::NodeContextGuard;
/// use ferry_core::SimulationIdentity;
///
/// let node = SimulationIdentity::new('A').unwrap();
/// let _guard = NodeContextGuard::new(&node);
///
/// tracing::info!("Forwarding bundle");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Create a new node context guard with a fresh instance ID
    pub fn new<I: PeerIdentity>(identity: &I) -> Self {
        Self::with_instance_id(identity, Uuid::new_v4())
    }

    /// Create a guard with a specific instance ID
    ///
    /// Lets the simulator keep one instance ID per node for a whole run.
    pub fn with_instance_id<I: PeerIdentity>(identity: &I, instance_id: Uuid) -> Self {
        let new_ctx = NodeContextData {
            node_id: identity.short_id(),
            instance_id,
        };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(new_ctx));

        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node ID (if set)
    pub fn current_node_id() -> Option<String> {
        Self::current().map(|ctx| ctx.node_id)
    }

    /// Get the current instance ID (if set)
    pub fn current_instance_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.instance_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with the given node as logging context
///
/// # Example
///
/// ```ignore
/// with_node_context!(&node, {
///     tracing::info!("Forwarding bundle");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($identity:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($identity);
        $body
    }};
}
