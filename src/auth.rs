//! Credential verification.
//!
//! Checks an email/password pair against the stored bcrypt hash. Sessions and
//! route protection live elsewhere; this only answers "who is this".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway::QueryError;
use crate::storage::DashboardStore;

/// Shortest password accepted before the store is consulted.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Login form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The identity returned after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] QueryError),

    #[error("Password verification failed: {0}")]
    Hash(String),
}

/// Verifies credentials against the users table.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn DashboardStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn DashboardStore>) -> Self {
        Self { store }
    }

    pub async fn verify(&self, credentials: &Credentials) -> Result<AuthenticatedUser, AuthError> {
        if !is_valid_email(&credentials.email)
            || credentials.password.chars().count() < MIN_PASSWORD_LEN
        {
            debug!("Credentials rejected before lookup");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .find_user_by_email(&credentials.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // bcrypt verification is CPU-bound.
        let password = credentials.password.clone();
        let hash = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .map_err(|e| AuthError::Hash(e.to_string()))?;

        if !matches {
            warn!(email = %credentials.email, "Invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthenticatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}

/// Syntactic email check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockDashboardStore;
    use crate::storage::seed::{SEED_USER, SEED_USER_PASSWORD};

    async fn verifier() -> CredentialVerifier {
        let hash = bcrypt::hash(SEED_USER_PASSWORD, 4).unwrap();
        let store = MockDashboardStore::seeded(&hash).await;
        CredentialVerifier::new(Arc::new(store))
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("user@nextmail.com"));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@nextmail.com"));
        assert!(!is_valid_email("user@nextmail"));
        assert!(!is_valid_email("user@@nextmail.com"));
        assert!(!is_valid_email("user @nextmail.com"));
        assert!(!is_valid_email("user@nextmail..com"));
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let user = verifier()
            .await
            .verify(&credentials(SEED_USER.2, SEED_USER_PASSWORD))
            .await
            .unwrap();

        assert_eq!(user.id, SEED_USER.0);
        assert_eq!(user.email, SEED_USER.2);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let result = verifier()
            .await
            .verify(&credentials(SEED_USER.2, "654321"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_stored_hash_is_not_compared_as_plaintext() {
        let hash = bcrypt::hash(SEED_USER_PASSWORD, 4).unwrap();
        let store = MockDashboardStore::seeded(&hash).await;
        let verifier = CredentialVerifier::new(Arc::new(store));

        let result = verifier.verify(&credentials(SEED_USER.2, &hash)).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let result = verifier()
            .await
            .verify(&credentials("nobody@nextmail.com", SEED_USER_PASSWORD))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_short_password_skips_store() {
        let store = MockDashboardStore::new();
        store.set_fail_on_read(true).await;
        let verifier = CredentialVerifier::new(Arc::new(store));

        let result = verifier.verify(&credentials(SEED_USER.2, "12345")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
