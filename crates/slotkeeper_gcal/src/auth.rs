// File: crates/slotkeeper_gcal/src/auth.rs
use async_trait::async_trait;
use slotkeeper_common::GatewayError;
use slotkeeper_config::GcalConfig;
use std::path::Path;
use yup_oauth2::{
    authenticator::DefaultAuthenticator, read_service_account_key, ServiceAccountAuthenticator,
};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Supplies bearer tokens for Calendar API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, GatewayError>;
}

/// Service-account credentials; tokens are cached and refreshed by yup-oauth2.
pub struct ServiceAccountTokens {
    authenticator: DefaultAuthenticator,
}

impl ServiceAccountTokens {
    pub async fn from_key_file(key_path: &Path) -> Result<Self, GatewayError> {
        let sa_key = read_service_account_key(key_path)
            .await
            .map_err(|e| GatewayError::Auth(format!("{}: {}", key_path.display(), e)))?;

        let authenticator = ServiceAccountAuthenticator::builder(sa_key)
            .build()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        Ok(Self { authenticator })
    }

    pub async fn from_config(config: &GcalConfig) -> Result<Self, GatewayError> {
        let key_path = config
            .key_path
            .as_deref()
            .ok_or_else(|| GatewayError::Auth("Missing key_path in GcalConfig".to_string()))?;
        Self::from_key_file(Path::new(key_path)).await
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokens {
    async fn bearer_token(&self) -> Result<String, GatewayError> {
        let token = self
            .authenticator
            .token(&[CALENDAR_SCOPE])
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Auth("token response without access token".to_string()))
    }
}

/// A fixed token, for local emulators and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, GatewayError> {
        Ok(self.0.clone())
    }
}
