mod bearer;
mod none;
mod traits;
mod types;

pub use bearer::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::config::AuthConfig;

/// Factory function to create a credential provider from config
pub fn create_credential_provider(
    config: &AuthConfig,
) -> Result<Arc<dyn CredentialProvider>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Arc::new(NoCredential::new())),
        AuthMethod::Bearer => {
            let token = config.token.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "token must be set when using bearer auth method".to_string(),
                )
            })?;
            Ok(Arc::new(StaticBearer::new(token)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMethod;

    #[test]
    fn test_create_provider_none() {
        let config = AuthConfig {
            method: AuthMethod::None,
            token: None,
        };
        let provider = create_credential_provider(&config).unwrap();
        assert_eq!(provider.method_name(), "none");
    }

    #[test]
    fn test_create_provider_bearer() {
        let config = AuthConfig {
            method: AuthMethod::Bearer,
            token: Some("secret".to_string()),
        };
        let provider = create_credential_provider(&config).unwrap();
        assert_eq!(provider.method_name(), "bearer");
    }

    #[test]
    fn test_create_provider_bearer_missing_token() {
        let config = AuthConfig {
            method: AuthMethod::Bearer,
            token: None,
        };
        let result = create_credential_provider(&config);
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }
}
