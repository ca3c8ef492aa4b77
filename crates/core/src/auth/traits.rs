use async_trait::async_trait;
use thiserror::Error;

use super::types::Credential;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Source of the credential attached to each outbound upload.
///
/// Asked once per transfer, so implementations may refresh tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credential, or `None` for anonymous requests.
    async fn credential(&self) -> Result<Option<Credential>, AuthError>;

    /// Name of this credential method
    fn method_name(&self) -> &'static str;
}
