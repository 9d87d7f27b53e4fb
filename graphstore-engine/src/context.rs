use tracing::Span;
use uuid::Uuid;

/// Per-call trace context. Every engine operation runs inside the span it
/// produces, so log lines from the lock manager, stores and hooks carry the
/// request id.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: String,
    label: Option<String>,
}

impl Context {
    /// A context with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            label: None,
        }
    }

    /// A context continuing an existing request.
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            label: None,
        }
    }

    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!(
            "graph",
            request_id = %self.request_id,
            label = self.label.as_deref().unwrap_or(""),
            operation,
        )
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
