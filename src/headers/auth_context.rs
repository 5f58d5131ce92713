use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock};

/// Supplies the token of the user on whose behalf the current request runs.
pub trait AuthContext: Debug + Send + Sync {
    /// `None` when no user token is available.
    fn user_token(&self) -> Option<String>;
}

/// Auth context holding a replaceable user token.
#[derive(Clone, Default)]
pub struct StaticAuthContext {
    token: Arc<RwLock<Option<String>>>,
}

impl StaticAuthContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Arc::new(RwLock::new(Some(token.into()))) }
    }

    pub fn set_user_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl Debug for StaticAuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_token = self.user_token().is_some();
        f.debug_struct("StaticAuthContext").field("has_token", &has_token).finish()
    }
}

impl AuthContext for StaticAuthContext {
    fn user_token(&self) -> Option<String> {
        self.token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .filter(|token| !token.is_empty())
    }
}
