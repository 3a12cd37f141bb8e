//! Identity provider API service

use crate::client::{auth_token, clear_auth_token, execute, execute_empty, request, set_auth_token};
use crate::config::AuthConfig;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tablebook_core::{Identity, IdentityProvider, Result, SessionError};

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: Option<String>,
}

/// Identity provider reached through the backend's auth routes
#[derive(Clone, Debug, Default)]
pub struct IdentityService;

impl IdentityService {
    pub fn new() -> Self {
        Self
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityProvider for IdentityService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let req = request(Method::POST, AuthConfig::SIGN_IN_PATH)
            .json(&SignInRequest { email, password });
        let identity: Identity = execute(req).await.map_err(|e| {
            if e.is_auth_expired() {
                SessionError::sign_in("Invalid email or password")
            } else {
                SessionError::sign_in(e.to_string())
            }
        })?;
        set_auth_token(identity.id_token.as_deref());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = auth_token();
        let result = execute_empty(request(Method::POST, AuthConfig::SIGN_OUT_PATH)).await;
        // The credential is dropped locally whatever the provider answered
        if let Some(token) = token {
            clear_auth_token(&token);
        }
        result.map_err(|e| SessionError::sign_out(e.to_string()))
    }

    async fn refresh_token(&self) -> Result<Option<String>> {
        let response: RefreshResponse = execute(request(Method::POST, AuthConfig::REFRESH_PATH))
            .await
            .map_err(|e| SessionError::internal(format!("Token refresh failed: {e}")))?;
        if let Some(token) = &response.id_token {
            set_auth_token(Some(token));
        }
        Ok(response.id_token)
    }
}
