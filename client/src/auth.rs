//! Bearer credentials.
//!
//! The token is shared between the HTTP client and whoever logs the user in.
//! A `401` from the API clears it; the application must then re-authenticate.

use std::sync::{Arc, PoisonError, RwLock};

/// Shared, clearable bearer token.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    /// Credentials holding `token`.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Current token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a fresh token after login.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the token.
    pub fn clear(&self) {
        let previous = self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::warn!("Bearer token cleared, re-authentication required");
        }
    }

    /// `Authorization` header value, if signed in.
    pub fn header_value(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {token}"))
    }
}
