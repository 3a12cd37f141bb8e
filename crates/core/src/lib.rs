//! Tablebook session core: idle-logout monitor and authenticated session state

pub mod activity;
pub mod config;
pub mod error;
pub mod identity;
pub mod monitor;
pub mod revalidate;
pub mod session;
pub mod validation;

#[cfg(feature = "runtime")]
pub mod supervisor;
#[cfg(all(feature = "runtime", not(target_arch = "wasm32")))]
pub mod tracing;

#[cfg(all(test, feature = "runtime"))]
mod tests;

pub use activity::{ActivityEvent, ActivitySource, ChannelActivitySource, Subscription};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use identity::{IdentityProvider, ProfileService, ValidationStatus};
pub use monitor::{ActivityMonitor, Command, MonitorState};
pub use revalidate::RevalidationOutcome;
pub use session::{
    AuthenticatedUser, Identity, LogoutNotice, LogoutReason, Role, SessionStore, UserProfile,
};
pub use validation::ValidateConfig;

#[cfg(feature = "runtime")]
pub use supervisor::{SessionSupervisor, SessionView, SupervisorHandle};
