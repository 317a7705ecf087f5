//! Correlation ids
//!
//! A dispatch request crosses several async boundaries (store, calendar,
//! email). These ids travel with it so every log line and error can be tied
//! back to the originating call.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Adopt an id minted elsewhere
            pub fn from_string(id: String) -> Self {
                Self(id)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id! {
    /// One inbound call into the engine; minted per request unless the caller
    /// already has one
    RequestId
}

correlation_id! {
    /// Caller-side session id (a voice call, a CLI invocation), shared by
    /// every request made within it
    TraceId
}

/// Ids attached to one engine call
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: Option<TraceId>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_context_gets_its_own_request_id() {
        let a = RequestContext::new();
        let b = RequestContext::new();

        assert_ne!(a.request_id, b.request_id);
        assert!(a.trace_id.is_none());
    }

    #[test]
    fn test_trace_id_is_kept_verbatim() {
        let ctx = RequestContext::new().with_trace_id(TraceId::from("voice-session-7"));

        assert_eq!(ctx.trace_id.map(|t| t.to_string()), Some("voice-session-7".to_string()));
    }

    #[test]
    fn test_ids_serialize_as_bare_strings() {
        let id = RequestId::from("req-1");

        assert_eq!(serde_json::to_string(&id).unwrap(), r#""req-1""#);
        let back: RequestId = serde_json::from_str(r#""req-1""#).unwrap();
        assert_eq!(back, id);
    }
}
