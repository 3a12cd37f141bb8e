//! Authenticated session store and logout reasons

use crate::error::{Result, SessionError};
use crate::identity::{IdentityProvider, ProfileService};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Identity as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Role assigned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    /// Whether the role may open the back-office
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Extended profile held by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Cleared by an administrator to block the account
    #[serde(default = "default_true")]
    pub is_valid: bool,
}

fn default_true() -> bool {
    true
}

/// Signed-in user: provider identity plus the backend profile when known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl AuthenticatedUser {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            profile: None,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    /// Canonical role check. Users without a loaded profile are customers.
    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }

    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.first_name.as_deref())
            .or(self.identity.display_name.as_deref())
            .unwrap_or(&self.identity.email)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user signed out
    Manual,
    /// Idle countdown reached zero
    Inactive,
    /// The backend reports the account as blocked
    Blocked,
}

impl LogoutReason {
    /// User-facing notice for forced logouts
    pub fn notice(self) -> Option<LogoutNotice> {
        match self {
            Self::Manual => None,
            Self::Inactive | Self::Blocked => Some(LogoutNotice { reason: self }),
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Inactive => write!(f, "inactive"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Toast shown after a forced logout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutNotice {
    pub reason: LogoutReason,
}

impl LogoutNotice {
    pub const INACTIVE_MESSAGE: &'static str =
        "Your session has expired due to inactivity. Please sign in again.";
    pub const BLOCKED_MESSAGE: &'static str =
        "Your account has been blocked by an administrator.";

    pub fn title(&self) -> &'static str {
        match self.reason {
            LogoutReason::Blocked => "Account blocked",
            LogoutReason::Inactive | LogoutReason::Manual => "Session expired",
        }
    }

    pub fn message(&self) -> &'static str {
        match self.reason {
            LogoutReason::Blocked => Self::BLOCKED_MESSAGE,
            LogoutReason::Inactive | LogoutReason::Manual => Self::INACTIVE_MESSAGE,
        }
    }
}

/// Holds the current signed-in user, if any
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    current: Option<AuthenticatedUser>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, user: AuthenticatedUser) {
        info!(uid = %user.uid(), "User authenticated");
        self.current = Some(user);
    }

    /// Attach or replace the backend profile. Ignored when signed out.
    pub fn set_profile(&mut self, profile: UserProfile) -> bool {
        match self.current.as_mut() {
            Some(user) => {
                user.profile = Some(profile);
                true
            }
            None => false,
        }
    }

    /// Store a refreshed provider token. Ignored when signed out.
    pub fn set_token(&mut self, token: String) -> bool {
        match self.current.as_mut() {
            Some(user) => {
                user.identity.id_token = Some(token);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&AuthenticatedUser> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Drop local session state
    pub fn clear(&mut self) -> Option<AuthenticatedUser> {
        self.current.take()
    }

    /// Clear the session for `reason` and return the notice to raise, if any
    pub fn end(&mut self, reason: LogoutReason) -> Option<LogoutNotice> {
        if let Some(user) = self.clear() {
            info!(uid = %user.uid(), %reason, "Session ended");
        }
        reason.notice()
    }
}

/// Ask the identity provider to end its session.
///
/// Hosts clear local state with [`SessionStore::end`] first; a failure here is
/// only logged and returned.
pub async fn sign_out<P>(provider: &P, reason: LogoutReason) -> Result<()>
where
    P: IdentityProvider + ?Sized,
{
    let result = provider.sign_out().await;
    if let Err(e) = &result {
        warn!(%reason, "Identity provider sign-out failed after local session was cleared: {e}");
    }
    result
}

/// Sign in and enrich the identity with the backend profile.
///
/// A profile lookup failure still yields a user without a profile. A profile
/// marked invalid is signed out again and refused with [`SessionError::Blocked`].
pub async fn authenticate<I, P>(
    identity: &I,
    profiles: &P,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser>
where
    I: IdentityProvider + ?Sized,
    P: ProfileService + ?Sized,
{
    let signed_in = identity.sign_in(email, password).await?;
    match profiles.fetch_profile(&signed_in.uid).await {
        Ok(profile) if !profile.is_valid => {
            warn!(uid = %signed_in.uid, "Sign-in refused, account is blocked");
            if let Err(e) = identity.sign_out().await {
                warn!("Sign-out after blocked sign-in failed: {e}");
            }
            Err(SessionError::Blocked)
        }
        Ok(profile) => Ok(AuthenticatedUser::new(signed_in).with_profile(profile)),
        Err(e) => {
            warn!(uid = %signed_in.uid, "Profile lookup failed, continuing without profile: {e}");
            Ok(AuthenticatedUser::new(signed_in))
        }
    }
}
