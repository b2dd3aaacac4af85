//! UI/backend events and error modeling for the main window controller.

use client_core::GatewayCache;
use shared::domain::{Snowflake, UserSummary};

pub enum UiEvent {
    StoredSessionLoaded {
        last_selected_guild: Option<Snowflake>,
        previous_build: Option<String>,
        seen_onboarding: bool,
    },
    CurrentUserReady {
        user: UserSummary,
        cache: GatewayCache,
    },
    SessionResumed,
    SessionInvalidated {
        resumable: bool,
    },
    CacheUpdated(GatewayCache),
    ReleaseNotesLoaded {
        body: String,
    },
    ReleaseNotesUnavailable,
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
    Persistence,
    General,
}

pub fn classify_connect_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Gateway unreachable; check URL/network and retry.".to_string()
    } else {
        format!("Gateway error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("session expired")
            || message_lower.contains("invalid token")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unauthorized_as_auth_error() {
        let err = UiError::from_message(UiErrorContext::Connect, "gateway returned 401");
        assert_eq!(err.category(), UiErrorCategory::Auth);
        assert!(err.requires_reauth());
    }

    #[test]
    fn classifies_connection_refused_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::Connect,
            "failed to connect gateway websocket: connection refused",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.requires_reauth());
    }

    #[test]
    fn unknown_messages_keep_their_context() {
        let err = UiError::from_message(UiErrorContext::Persistence, "sqlite went sideways");
        assert_eq!(err.category(), UiErrorCategory::Unknown);
        assert_eq!(err.context(), UiErrorContext::Persistence);
    }

    #[test]
    fn connect_failure_hint_mentions_network_for_dns_errors() {
        let hint = classify_connect_failure("dns error: no such host");
        assert!(hint.contains("check URL/network"));
    }

    #[test]
    fn connect_failure_hint_passes_other_messages_through() {
        let hint = classify_connect_failure("gateway url must start with http://");
        assert_eq!(hint, "Gateway error: gateway url must start with http://");
    }
}
