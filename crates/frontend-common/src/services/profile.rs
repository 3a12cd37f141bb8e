//! Backend profile API service

use crate::client::{execute, request};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tablebook_core::{ProfileService, Result, SessionError, UserProfile, ValidationStatus};

#[derive(Debug, Deserialize)]
struct StatusResponse {
    is_valid: bool,
}

/// Extended user profiles held by the reservation backend
#[derive(Clone, Debug, Default)]
pub struct ProfileApiService;

impl ProfileApiService {
    pub fn new() -> Self {
        Self
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileService for ProfileApiService {
    async fn fetch_profile(&self, uid: &str) -> Result<UserProfile> {
        execute(request(Method::GET, &format!("/users/{uid}")))
            .await
            .map_err(|e| SessionError::profile_fetch(e.to_string()))
    }

    async fn validation_status(&self, uid: &str) -> Result<ValidationStatus> {
        let status: StatusResponse = execute(request(Method::GET, &format!("/users/{uid}/status")))
            .await
            .map_err(|e| SessionError::profile_fetch(e.to_string()))?;
        Ok(ValidationStatus::from_valid(status.is_valid))
    }
}
