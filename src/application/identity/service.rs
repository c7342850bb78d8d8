//! Login against the user collection

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{DomainError, DomainResult, RepositoryProvider, User};

pub struct AuthService {
    repos: Arc<dyn RepositoryProvider>,
}

impl AuthService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Check an id/password pair and return the account.
    pub async fn login(&self, id: &str, password: &str) -> DomainResult<User> {
        let Some(user) = self.repos.users().find_by_id(id.trim()).await? else {
            debug!(user_id = id, "Login for unknown user");
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if user.password != password {
            debug!(user_id = id, "Login with wrong password");
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(user)
    }
}
