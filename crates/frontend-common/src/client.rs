//! HTTP client configuration and request helpers

use crate::config::AuthConfig;
use once_cell::sync::Lazy;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use thiserror::Error;
use web_sys::window;

/// Shared client instance
static CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// Bearer token attached to authenticated requests
static AUTH_TOKEN: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    /// Whether the backend rejected the credentials
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Get the base URL for API calls
fn get_base_url() -> String {
    let origin = window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    format!("{origin}{}", AuthConfig::API_PREFIX)
}

/// Update the token used for authenticated requests
pub fn set_auth_token(token: Option<&str>) {
    if let Ok(mut guard) = AUTH_TOKEN.lock() {
        *guard = token.map(str::to_string);
    }
}

/// Drop `token` unless a newer sign-in has already replaced it
pub fn clear_auth_token(token: &str) {
    if let Ok(mut guard) = AUTH_TOKEN.lock() {
        if guard.as_deref() == Some(token) {
            *guard = None;
        }
    }
}

/// Current bearer token, if any
pub fn auth_token() -> Option<String> {
    AUTH_TOKEN.lock().ok().and_then(|guard| guard.clone())
}

/// Build a request against the backend, authenticated when a token is set
pub fn request(method: Method, path: &str) -> RequestBuilder {
    let builder = CLIENT.request(method, format!("{}{path}", get_base_url()));
    match auth_token() {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Send a request and decode a JSON body
pub async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json::<T>().await?)
}

/// Send a request whose body is ignored
pub async fn execute_empty(request: RequestBuilder) -> Result<(), ClientError> {
    check_status(request.send().await?).await?;
    Ok(())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
