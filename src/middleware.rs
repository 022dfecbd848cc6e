//! Middleware contract.
//!
//! Endpoints carry an ordered middleware chain resolved from their
//! `_middleware` marker. Priority is ascending declaration order: the first
//! middleware declared runs first on the way in and last on the way out.

use std::sync::Arc;
use std::time::Duration;

use crate::handler::{HandlerRequest, HandlerResponse};

/// A pluggable request/response hook.
pub trait Middleware: Send + Sync {
    /// Runs before the handler. Returning a response short-circuits the chain.
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }

    /// Runs after the handler with the elapsed handler latency.
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}

/// One middleware bound to an endpoint, with its declaration-order priority.
#[derive(Clone)]
pub struct MiddlewareRef {
    /// Name the middleware was declared under in the marker file
    pub name: String,
    /// Ascending priority equal to declaration order (0 runs first)
    pub priority: usize,
    /// The middleware implementation
    pub inner: Arc<dyn Middleware>,
}

impl std::fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRef")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}
