//! Static bearer token.

use async_trait::async_trait;

use super::{AuthError, Credential, CredentialProvider};

/// Attaches the same bearer token to every upload.
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticBearer {
    async fn credential(&self) -> Result<Option<Credential>, AuthError> {
        Ok(Some(Credential::Bearer(self.token.clone())))
    }

    fn method_name(&self) -> &'static str {
        "bearer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_bearer_returns_token() {
        let provider = StaticBearer::new("tok-123");
        let cred = provider.credential().await.unwrap().unwrap();
        assert_eq!(cred.header_value(), "Bearer tok-123");
    }
}
