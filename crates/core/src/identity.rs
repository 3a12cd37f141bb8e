//! External collaborators: the identity provider and the backend profile service

use crate::error::Result;
use crate::session::{Identity, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sign-in, sign-out and credential refresh
#[cfg_attr(test, mockall::automock)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Refresh the current credential; `None` when nobody is signed in
    async fn refresh_token(&self) -> Result<Option<String>>;
}

/// Whether the backend still allows the account to stay signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Blocked,
}

impl ValidationStatus {
    pub fn from_valid(is_valid: bool) -> Self {
        if is_valid {
            Self::Valid
        } else {
            Self::Blocked
        }
    }
}

/// Backend lookup of the extended user profile
#[cfg_attr(test, mockall::automock)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProfileService: Send + Sync {
    async fn fetch_profile(&self, uid: &str) -> Result<UserProfile>;

    async fn validation_status(&self, uid: &str) -> Result<ValidationStatus>;
}
