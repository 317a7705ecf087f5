use dispatchx_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure that crosses a crate boundary is classified by one of these
/// kinds. Each kind maps to a stable code used in logs, dispatch records and
/// tool-call responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    NotFound,

    // Context resolution
    AmbiguousTenant,
    AmbiguousAsset,
    AssetNotOwned,
    ContextUnresolved,

    // Availability
    /// Non-fatal: an internal dispatch is deferred
    NoSlotAvailable,
    CalendarUnavailable,

    // Routing / execution
    RouterBlocked,
    /// Email or calendar provider failure during execution
    Transport,
    /// Idempotency hit; callers receive the prior outcome instead
    DuplicateRequest,

    // Lifecycle
    InvalidTransition,
    /// Attempted mutation of a terminal dispatch record
    RecordImmutable,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Timeout,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AmbiguousTenant => "ERR_AMBIGUOUS_TENANT",
            ExErrorKind::AmbiguousAsset => "ERR_AMBIGUOUS_ASSET",
            ExErrorKind::AssetNotOwned => "ERR_ASSET_NOT_OWNED",
            ExErrorKind::ContextUnresolved => "ERR_CONTEXT_UNRESOLVED",
            ExErrorKind::NoSlotAvailable => "ERR_NO_SLOT_AVAILABLE",
            ExErrorKind::CalendarUnavailable => "ERR_CALENDAR_UNAVAILABLE",
            ExErrorKind::RouterBlocked => "ERR_ROUTER_BLOCKED",
            ExErrorKind::Transport => "ERR_TRANSPORT",
            ExErrorKind::DuplicateRequest => "ERR_DUPLICATE_REQUEST",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::RecordImmutable => "ERR_RECORD_IMMUTABLE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus the
/// context needed to reconcile a failure by hand (operation, entity id,
/// correlation ids, candidate list for ambiguity errors).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add candidate ids (carried by the ambiguity kinds)
    pub fn with_candidates(mut self, ids: Vec<String>) -> Self {
        self.candidates = Some(ids);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Get candidate ids, if any
    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by the pure decision layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Tenant hint matched more than one tenant
    #[error("Tenant hint '{hint}' is ambiguous: {candidates:?}")]
    AmbiguousTenant {
        hint: String,
        candidates: Vec<String>,
    },

    /// Tenant hint matched nothing
    #[error("No tenant matches '{hint}'")]
    TenantNotFound { hint: String },

    /// Asset hint does not resolve to an asset owned by the tenant
    #[error("Asset '{asset_hint}' does not belong to tenant {tenant_id}")]
    AssetNotOwned {
        tenant_id: String,
        asset_hint: String,
    },

    /// Asset hint matched several assets owned by the tenant
    #[error("Asset hint '{asset_hint}' is ambiguous for tenant {tenant_id}: {candidates:?}")]
    AmbiguousAsset {
        tenant_id: String,
        asset_hint: String,
        candidates: Vec<String>,
    },

    /// Router was asked to decide without a resolved context
    #[error("Context unresolved: {reason}")]
    ContextUnresolved { reason: String },

    /// Router cannot decide because availability is unknown
    #[error("Router blocked: {reason}")]
    RouterBlocked { reason: String },

    /// Lifecycle guard rejected a state change
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Input failed validation
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A persisted enum column held an unknown value
    #[error("Unknown {field} value: {value}")]
    UnknownVariant { field: String, value: String },
}

impl From<DispatchError> for ExError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AmbiguousTenant { hint, candidates } => {
                ExError::new(ExErrorKind::AmbiguousTenant)
                    .with_op("resolve_tenant")
                    .with_message(format!("tenant hint '{}' matches several tenants", hint))
                    .with_candidates(candidates)
            }
            DispatchError::TenantNotFound { hint } => ExError::new(ExErrorKind::ContextUnresolved)
                .with_op("resolve_tenant")
                .with_message(format!("no tenant matches '{}'", hint)),
            DispatchError::AssetNotOwned {
                tenant_id,
                asset_hint,
            } => ExError::new(ExErrorKind::AssetNotOwned)
                .with_op("resolve_asset")
                .with_entity_id(tenant_id)
                .with_message(format!("asset '{}' is not owned by the tenant", asset_hint)),
            DispatchError::AmbiguousAsset {
                tenant_id,
                asset_hint,
                candidates,
            } => ExError::new(ExErrorKind::AmbiguousAsset)
                .with_op("resolve_asset")
                .with_entity_id(tenant_id)
                .with_message(format!("asset hint '{}' matches several assets", asset_hint))
                .with_candidates(candidates),
            DispatchError::ContextUnresolved { reason } => {
                ExError::new(ExErrorKind::ContextUnresolved)
                    .with_op("decide")
                    .with_message(reason)
            }
            DispatchError::RouterBlocked { reason } => ExError::new(ExErrorKind::RouterBlocked)
                .with_op("decide")
                .with_message(reason),
            DispatchError::InvalidTransition { from, to } => {
                ExError::new(ExErrorKind::InvalidTransition)
                    .with_op("advance_state")
                    .with_message(format!("{} -> {}", from, to))
            }
            DispatchError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }
            DispatchError::UnknownVariant { field, value } => {
                ExError::new(ExErrorKind::Serialization)
                    .with_op("parse_column")
                    .with_message(format!("unknown {} value '{}'", field, value))
            }
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
