use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::LockError;

/// Lifetime of a login token unless configured otherwise.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Validates login credentials and the session tokens issued for them.
pub trait CredentialValidator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<String, LockError>;
    fn validate(&self, token: &str) -> bool;
}

/// A single access/secret key pair. Tokens expire `token_ttl` after issue;
/// expired ones are dropped on the next login.
#[derive(Debug)]
pub struct StaticCredentials {
    access_key: String,
    secret_key: String,
    token_ttl: Duration,
    tokens: RwLock<HashMap<String, Instant>>,
}

impl StaticCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    fn live(&self, issued: Instant) -> bool {
        issued.elapsed() < self.token_ttl
    }
}

impl CredentialValidator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Result<String, LockError> {
        if username != self.access_key || password != self.secret_key {
            return Err(LockError::Unauthenticated);
        }
        let token = uuid::Uuid::new_v4().to_string();
        let mut tokens = self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tokens.retain(|_, issued| self.live(*issued));
        tokens.insert(token.clone(), Instant::now());
        Ok(token)
    }

    fn validate(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .is_some_and(|issued| self.live(*issued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_tokens_for_matching_keys_only() {
        let creds = StaticCredentials::new("access", "secret");
        assert_eq!(
            creds.authenticate("access", "wrong"),
            Err(LockError::Unauthenticated)
        );

        let token = creds.authenticate("access", "secret").unwrap();
        assert!(creds.validate(&token));
        assert!(!creds.validate("not-a-token"));

        let other = creds.authenticate("access", "secret").unwrap();
        assert_ne!(token, other);
        assert!(creds.validate(&token));
    }

    #[test]
    fn tokens_expire_and_are_pruned_on_login() {
        let creds =
            StaticCredentials::new("access", "secret").with_token_ttl(Duration::from_millis(100));
        let first = creds.authenticate("access", "secret").unwrap();
        assert!(creds.validate(&first));

        std::thread::sleep(Duration::from_millis(150));
        assert!(!creds.validate(&first));

        let second = creds.authenticate("access", "secret").unwrap();
        assert!(creds.validate(&second));
        let tokens = creds.tokens.read().unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains_key(&second));
    }

    #[test]
    fn repeated_logins_do_not_accumulate_expired_tokens() {
        let creds = StaticCredentials::new("a", "s").with_token_ttl(Duration::ZERO);
        for _ in 0..1000 {
            creds.authenticate("a", "s").unwrap();
        }
        assert_eq!(creds.tokens.read().unwrap().len(), 1);
    }
}
