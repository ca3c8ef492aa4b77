use async_trait::async_trait;

use super::{AuthError, Credential, CredentialProvider};

/// Sends uploads without an `Authorization` header.
#[derive(Debug, Default)]
pub struct NoCredential;

impl NoCredential {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialProvider for NoCredential {
    async fn credential(&self) -> Result<Option<Credential>, AuthError> {
        Ok(None)
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
