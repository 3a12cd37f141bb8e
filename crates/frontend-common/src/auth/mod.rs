//! Authentication module

pub mod context;

// Re-export commonly used items
pub use context::{
    use_auth, use_is_authenticated, use_logout, use_session_services, use_sign_in, AuthAction,
    AuthContext, AuthContextData, AuthProvider, SessionServices,
};
