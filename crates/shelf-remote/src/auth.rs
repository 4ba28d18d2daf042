//! Bearer-token authentication collaborator.
//!
//! Login itself (OAuth device flow) happens elsewhere; this type only holds
//! the resulting handle and token.

use std::fmt;

use shelf_core::{AuthProvider, User};

/// Handle + bearer token, or signed out.
#[derive(Clone, Default)]
pub struct TokenAuth {
    session: Option<(User, String)>,
}

impl TokenAuth {
    pub fn new(handle: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            session: Some((User::new(handle), token.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Read `SHELF_GITHUB_USER` and `SHELF_GITHUB_TOKEN`. Missing or empty
    /// values leave the session signed out.
    pub fn from_env() -> Self {
        let handle = std::env::var("SHELF_GITHUB_USER").unwrap_or_default();
        let token = std::env::var("SHELF_GITHUB_TOKEN").unwrap_or_default();
        if handle.trim().is_empty() || token.trim().is_empty() {
            return Self::signed_out();
        }
        Self::new(handle.trim(), token.trim())
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth")
            .field("user", &self.session.as_ref().map(|(u, _)| &u.handle))
            .field("token", &self.session.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthProvider for TokenAuth {
    fn current_user(&self) -> Option<User> {
        self.session.as_ref().map(|(user, _)| user.clone())
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        match self.session {
            Some((_, ref token)) => vec![("Authorization".to_string(), format!("Bearer {}", token))],
            None => Vec::new(),
        }
    }
}
