//! Handler invocation types and the lazily-resolved handler slot.
//!
//! Endpoint generation never loads handler code. Each generated endpoint
//! carries a [`HandlerSlot`] that remembers where its handler lives
//! (file path + per-method export name) and resolves it through the injected
//! [`HandlerResolver`](crate::resolve::HandlerResolver) on first invocation.
//! Resolution failures are sticky: a handler that could not be found stays
//! failed until the endpoint is regenerated.

use crate::matcher::ParamVec;
use crate::resolve::HandlerResolver;
use http::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Request data passed to an endpoint handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// Path parameters extracted by the matcher
    pub path_params: ParamVec,
    /// Query string parameters supplied by the caller
    pub query_params: ParamVec,
    /// Request body parsed as JSON, if present
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics: with duplicate parameter names at
    /// different path depths, the deepest occurrence is returned.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name ("last write wins").
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Response data returned from an endpoint handler.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON response body
    pub body: Value,
}

impl HandlerResponse {
    /// A `200 OK` JSON response.
    #[must_use]
    pub fn ok_json(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// An endpoint handler function.
pub type HandlerFn = Arc<dyn Fn(HandlerRequest) -> HandlerResponse + Send + Sync>;

/// Resolution state of a handler binding.
///
/// An explicit sum type rather than a thunk so callers can distinguish
/// "not yet resolved" from "resolution failed" from "resolved" without
/// relying on error flow.
#[derive(Clone)]
pub enum HandlerBinding {
    /// Not yet resolved; holds the source location to resolve from
    Pending {
        /// Route file that declared the endpoint
        file_path: PathBuf,
        /// Export name for the endpoint's HTTP method
        export_name: String,
    },
    /// Successfully resolved
    Resolved(HandlerFn),
    /// Resolution failed; the message is sticky
    Failed(String),
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerBinding::Pending {
                file_path,
                export_name,
            } => f
                .debug_struct("Pending")
                .field("file_path", file_path)
                .field("export_name", export_name)
                .finish(),
            HandlerBinding::Resolved(_) => f.write_str("Resolved"),
            HandlerBinding::Failed(msg) => f.debug_tuple("Failed").field(msg).finish(),
        }
    }
}

/// Lazily-bound handler reference stored on a generated endpoint.
///
/// Thread-safe: concurrent invocations race to resolve, and whichever
/// finishes first wins; the loser observes the resolved state.
pub struct HandlerSlot {
    resolver: Option<Arc<dyn HandlerResolver>>,
    state: Mutex<HandlerBinding>,
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .state
            .lock()
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|_| "<poisoned>".to_string());
        f.debug_struct("HandlerSlot").field("state", &state).finish()
    }
}

impl Clone for HandlerSlot {
    fn clone(&self) -> Self {
        let binding = self
            .state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone());
        Self {
            resolver: self.resolver.clone(),
            state: Mutex::new(binding),
        }
    }
}

impl HandlerSlot {
    /// A slot that resolves lazily through `resolver` on first invocation.
    #[must_use]
    pub fn pending(
        resolver: Arc<dyn HandlerResolver>,
        file_path: PathBuf,
        export_name: impl Into<String>,
    ) -> Self {
        Self {
            resolver: Some(resolver),
            state: Mutex::new(HandlerBinding::Pending {
                file_path,
                export_name: export_name.into(),
            }),
        }
    }

    /// A slot that is already resolved (used by tests and manual registration).
    #[must_use]
    pub fn resolved(handler: HandlerFn) -> Self {
        Self {
            resolver: None,
            state: Mutex::new(HandlerBinding::Resolved(handler)),
        }
    }

    /// Current binding state.
    #[must_use]
    pub fn binding(&self) -> HandlerBinding {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Resolve the handler, performing the lazy lookup if still pending.
    ///
    /// # Errors
    ///
    /// Returns a "handler not found" error when the resolver cannot locate
    /// the export; the failure is recorded and repeated calls return the
    /// same error without consulting the resolver again.
    pub fn resolve(&self) -> anyhow::Result<HandlerFn> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (file_path, export_name) = match &*state {
            HandlerBinding::Resolved(handler) => return Ok(Arc::clone(handler)),
            HandlerBinding::Failed(message) => return Err(anyhow::anyhow!("{message}")),
            HandlerBinding::Pending {
                file_path,
                export_name,
            } => (file_path.clone(), export_name.clone()),
        };

        let resolved = self
            .resolver
            .as_ref()
            .and_then(|r| r.resolve(&file_path, &export_name));

        match resolved {
            Some(handler) => {
                *state = HandlerBinding::Resolved(Arc::clone(&handler));
                Ok(handler)
            }
            None => {
                let message = format!(
                    "handler not found: {} in {}",
                    export_name,
                    file_path.display()
                );
                warn!(
                    export_name = %export_name,
                    file_path = %file_path.display(),
                    "Handler resolution failed"
                );
                *state = HandlerBinding::Failed(message.clone());
                Err(anyhow::anyhow!(message))
            }
        }
    }

    /// Resolve and invoke the handler in one step.
    ///
    /// # Errors
    ///
    /// See [`HandlerSlot::resolve`].
    pub fn invoke(&self, req: HandlerRequest) -> anyhow::Result<HandlerResponse> {
        let handler = self.resolve()?;
        Ok(handler(req))
    }
}
