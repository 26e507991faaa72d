//! Bearer credentials for partner APIs.
//!
//! Token retrieval itself lives outside this crate; the fetcher only asks a
//! [`CredentialProvider`] for an opaque token when a request needs one.

use async_trait::async_trait;

use crate::error::{SourceError, SourceResult};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token.
    async fn bearer_token(&self) -> SourceResult<String>;
}

/// A fixed token, e.g. from configuration.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from an environment variable.
    pub fn from_env(var: &str) -> SourceResult<Self> {
        let token = std::env::var(var)
            .map_err(|_| SourceError::Credential(format!("{} is not set", var)))?;
        if token.trim().is_empty() {
            return Err(SourceError::Credential(format!("{} is empty", var)));
        }
        Ok(Self(token))
    }
}

// Never print the token itself
impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn bearer_token(&self) -> SourceResult<String> {
        Ok(self.0.clone())
    }
}
