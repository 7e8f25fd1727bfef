use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use domdash_core::auth::{AuthOutcome, Authenticator};
use domdash_util::LoginCredentials;

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Accepts a single configured account.
///
/// The password is compared by SHA-256 digest; both comparisons run in
/// constant time.
pub struct StaticCredentials {
    username: String,
    password_sha256: [u8; 32],
}

impl StaticCredentials {
    pub fn new(credentials: LoginCredentials) -> Self {
        Self {
            username: credentials.username,
            password_sha256: credentials.password_sha256,
        }
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        let digest = Sha256::digest(password.as_bytes());
        let username_matches = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_matches = digest.as_slice().ct_eq(&self.password_sha256);

        if bool::from(username_matches & password_matches) {
            AuthOutcome::Success
        } else {
            AuthOutcome::failure(INVALID_CREDENTIALS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_credentials() -> LoginCredentials {
        let mut password_sha256 = [0u8; 32];
        password_sha256.copy_from_slice(&Sha256::digest(b"demo"));
        LoginCredentials {
            username: "demo".to_string(),
            password_sha256,
        }
    }

    #[tokio::test]
    async fn accepts_configured_account() {
        let authenticator = StaticCredentials::new(demo_credentials());
        assert_eq!(
            authenticator.authenticate("demo", "demo").await,
            AuthOutcome::Success
        );
    }

    #[tokio::test]
    async fn rejects_wrong_password_or_username() {
        let authenticator = StaticCredentials::new(demo_credentials());

        let outcome = authenticator.authenticate("demo", "wrong").await;
        assert_eq!(outcome.error_message(), Some(INVALID_CREDENTIALS));

        let outcome = authenticator.authenticate("admin", "demo").await;
        assert!(!outcome.is_success());

        let outcome = authenticator.authenticate("dem", "demo").await;
        assert!(!outcome.is_success());
    }
}
