//! Global authentication context and provider

use crate::client::{auth_token, clear_auth_token, set_auth_token};
use crate::components::{InactivityModal, LogoutNoticeToast};
use crate::config::{timer_millis, AuthConfig};
use crate::hooks::use_activity_monitor;
use crate::services::{IdentityService, ProfileApiService};
use gloo::timers::callback::{Interval, Timeout};
use std::cell::Cell;
use std::rc::Rc;
use tablebook_core::revalidate::{revalidate, RevalidationOutcome};
use tablebook_core::session::{authenticate, sign_out};
use tablebook_core::{
    AuthenticatedUser, IdentityProvider, LogoutNotice, LogoutReason, ProfileService,
    SessionConfig, SessionError, UserProfile,
};
use tracing::{debug, info, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::Storage;
use yew::prelude::*;

/// Collaborators the session layer talks to
#[derive(Clone)]
pub struct SessionServices {
    pub identity: Rc<dyn IdentityProvider>,
    pub profiles: Rc<dyn ProfileService>,
    pub config: SessionConfig,
}

impl SessionServices {
    pub fn new(
        identity: Rc<dyn IdentityProvider>,
        profiles: Rc<dyn ProfileService>,
        config: SessionConfig,
    ) -> Self {
        Self {
            identity,
            profiles,
            config,
        }
    }
}

impl Default for SessionServices {
    fn default() -> Self {
        Self::new(
            Rc::new(IdentityService::new()),
            Rc::new(ProfileApiService::new()),
            AuthConfig::session(),
        )
    }
}

impl PartialEq for SessionServices {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.identity, &other.identity)
            && Rc::ptr_eq(&self.profiles, &other.profiles)
            && self.config == other.config
    }
}

/// Authentication context data
#[derive(Clone, Debug, PartialEq)]
pub struct AuthContextData {
    pub user: Option<AuthenticatedUser>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Seconds left on the idle countdown while the warning is visible
    pub warning: Option<u32>,
    /// Set after a forced logout until dismissed
    pub notice: Option<LogoutNotice>,
}

/// Authentication context actions
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Login(AuthenticatedUser),
    SetProfile(UserProfile),
    TokenRefreshed(String),
    Logout(LogoutReason),
    SetLoading(bool),
    SetError(String),
    ShowWarning(u32),
    HideWarning,
    DismissNotice,
}

/// Authentication context
pub type AuthContext = UseReducerHandle<AuthContextData>;

impl Default for AuthContextData {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true, // Start with loading to check sessionStorage
            error: None,
            warning: None,
            notice: None,
        }
    }
}

impl AuthContextData {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Next state for `action`, or `None` when nothing changes
    fn transition(&self, action: AuthAction) -> Option<Self> {
        match action {
            AuthAction::Login(user) => Some(Self {
                user: Some(user),
                is_loading: false,
                error: None,
                warning: None,
                notice: None,
            }),
            AuthAction::SetProfile(profile) => {
                let user = self.user.as_ref().filter(|u| u.uid() == profile.id)?;
                Some(Self {
                    user: Some(user.clone().with_profile(profile)),
                    ..self.clone()
                })
            }
            AuthAction::TokenRefreshed(token) => {
                let mut user = self.user.clone()?;
                user.identity.id_token = Some(token);
                Some(Self {
                    user: Some(user),
                    ..self.clone()
                })
            }
            AuthAction::Logout(reason) => Some(Self {
                user: None,
                is_loading: false,
                error: None,
                warning: None,
                notice: reason.notice().or(self.notice),
            }),
            AuthAction::SetLoading(is_loading) => Some(Self {
                is_loading,
                ..self.clone()
            }),
            AuthAction::SetError(error) => Some(Self {
                is_loading: false,
                error: Some(error),
                ..self.clone()
            }),
            AuthAction::ShowWarning(remaining) => {
                self.user.as_ref()?;
                Some(Self {
                    warning: Some(remaining),
                    ..self.clone()
                })
            }
            AuthAction::HideWarning => {
                self.warning?;
                Some(Self {
                    warning: None,
                    ..self.clone()
                })
            }
            AuthAction::DismissNotice => {
                self.notice?;
                Some(Self {
                    notice: None,
                    ..self.clone()
                })
            }
        }
    }
}

impl Reducible for AuthContextData {
    type Action = AuthAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let persists = matches!(
            action,
            AuthAction::Login(_)
                | AuthAction::SetProfile(_)
                | AuthAction::TokenRefreshed(_)
                | AuthAction::Logout(_)
        );
        match self.transition(action) {
            Some(next) => {
                if persists {
                    store_user(next.user.as_ref());
                }
                Rc::new(next)
            }
            None => self,
        }
    }
}

/// Get sessionStorage
fn get_session_storage() -> Option<Storage> {
    web_sys::window().and_then(|w| w.session_storage().ok().flatten())
}

/// Mirror the signed-in user into the HTTP client and sessionStorage.
///
/// On logout the bearer token stays until the sign-out request has used it.
fn store_user(user: Option<&AuthenticatedUser>) {
    if let Some(user) = user {
        set_auth_token(user.identity.id_token.as_deref());
    }

    let Some(storage) = get_session_storage() else {
        return;
    };
    match user {
        Some(user) => match serde_json::to_string(user) {
            Ok(serialized) => {
                let _ = storage.set_item(AuthConfig::AUTH_STATE_KEY, &serialized);
            }
            Err(e) => warn!("Failed to persist session: {e}"),
        },
        None => {
            let _ = storage.remove_item(AuthConfig::AUTH_STATE_KEY);
        }
    }
}

fn load_stored_user() -> Option<AuthenticatedUser> {
    let stored = get_session_storage()?
        .get_item(AuthConfig::AUTH_STATE_KEY)
        .ok()
        .flatten()?;
    match serde_json::from_str(&stored) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Discarding unreadable stored session: {e}");
            None
        }
    }
}

/// Clear local state, then tell the identity provider in the background
pub(crate) fn end_session(
    services: &SessionServices,
    dispatcher: &UseReducerDispatcher<AuthContextData>,
    reason: LogoutReason,
) {
    let token = auth_token();
    info!(%reason, "Session ended");
    dispatcher.dispatch(AuthAction::Logout(reason));

    // A provider that never answers must not keep the credential alive
    if let Some(token) = token {
        Timeout::new(timer_millis(services.config.sign_out_timeout()), move || {
            clear_auth_token(&token);
        })
        .forget();
    }
    let identity = services.identity.clone();
    spawn_local(async move {
        let _ = sign_out(identity.as_ref(), reason).await;
    });
}

/// Background polls bound to one signed-in user; dropping stops them
struct SessionPolls {
    _revalidation: Interval,
    _refresh: Interval,
    alive: Rc<Cell<bool>>,
}

impl SessionPolls {
    fn start(
        uid: String,
        services: &SessionServices,
        dispatcher: UseReducerDispatcher<AuthContextData>,
        on_logout: Callback<LogoutReason>,
    ) -> Self {
        let alive = Rc::new(Cell::new(true));

        let revalidation = {
            let profiles = services.profiles.clone();
            let alive = alive.clone();
            Interval::new(
                timer_millis(services.config.revalidation_interval()),
                move || {
                    let profiles = profiles.clone();
                    let uid = uid.clone();
                    let alive = alive.clone();
                    let on_logout = on_logout.clone();
                    spawn_local(async move {
                        let outcome = revalidate(profiles.as_ref(), &uid).await;
                        if let RevalidationOutcome::ForceLogout(reason) = outcome {
                            if alive.get() {
                                on_logout.emit(reason);
                            }
                        }
                    });
                },
            )
        };

        let refresh = {
            let identity = services.identity.clone();
            let alive = alive.clone();
            Interval::new(AuthConfig::TOKEN_REFRESH_INTERVAL_MS, move || {
                let identity = identity.clone();
                let alive = alive.clone();
                let dispatcher = dispatcher.clone();
                spawn_local(async move {
                    match identity.refresh_token().await {
                        Ok(Some(token)) if alive.get() => {
                            debug!("Credential refreshed");
                            dispatcher.dispatch(AuthAction::TokenRefreshed(token));
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Credential refresh failed: {e}"),
                    }
                });
            })
        };

        Self {
            _revalidation: revalidation,
            _refresh: refresh,
            alive,
        }
    }
}

impl Drop for SessionPolls {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

/// Auth provider props
#[derive(Properties, PartialEq)]
pub struct AuthProviderProps {
    #[prop_or_default]
    pub children: Children,
    #[prop_or_default]
    pub services: SessionServices,
}

/// Auth provider component
#[function_component(AuthProvider)]
pub fn auth_provider(props: &AuthProviderProps) -> Html {
    let auth = use_reducer(AuthContextData::default);
    let services = props.services.clone();

    let on_logout = {
        let services = services.clone();
        let dispatcher = auth.dispatcher();
        Callback::from(move |reason: LogoutReason| {
            end_session(&services, &dispatcher, reason);
        })
    };

    // Load the session from sessionStorage on mount and refresh its profile
    {
        let dispatcher = auth.dispatcher();
        let services = services.clone();
        use_effect_with((), move |_| match load_stored_user() {
            Some(user) => {
                debug!(uid = %user.uid(), "Restored stored session");
                let uid = user.uid().to_string();
                dispatcher.dispatch(AuthAction::Login(user));
                spawn_local(async move {
                    match services.profiles.fetch_profile(&uid).await {
                        Ok(profile) if !profile.is_valid => {
                            end_session(&services, &dispatcher, LogoutReason::Blocked);
                        }
                        Ok(profile) => dispatcher.dispatch(AuthAction::SetProfile(profile)),
                        Err(e) => warn!(%uid, "Profile lookup failed, keeping stored profile: {e}"),
                    }
                });
            }
            None => dispatcher.dispatch(AuthAction::SetLoading(false)),
        });
    }

    let uid = auth.user.as_ref().map(|u| u.uid().to_string());

    let on_continue = use_activity_monitor(
        services.config.clone(),
        uid.is_some(),
        auth.dispatcher(),
        on_logout.clone(),
    );

    // Re-validation and credential refresh run only while someone is signed in
    {
        let services = services.clone();
        let dispatcher = auth.dispatcher();
        use_effect_with(uid, move |uid| {
            let polls = uid
                .clone()
                .map(|uid| SessionPolls::start(uid, &services, dispatcher, on_logout));
            move || drop(polls)
        });
    }

    html! {
        <ContextProvider<SessionServices> context={services}>
            <ContextProvider<AuthContext> context={auth.clone()}>
                if let Some(remaining) = auth.warning {
                    <InactivityModal {remaining} {on_continue} />
                }
                <LogoutNoticeToast />
                {props.children.clone()}
            </ContextProvider<AuthContext>>
        </ContextProvider<SessionServices>>
    }
}

/// Hook to use auth context
#[hook]
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
        .expect("AuthContext not found. Make sure to wrap your component with AuthProvider")
}

/// Hook to reach the injected session collaborators
#[hook]
pub fn use_session_services() -> SessionServices {
    use_context::<SessionServices>()
        .expect("SessionServices not found. Make sure to wrap your component with AuthProvider")
}

/// Hook to check if authenticated
#[hook]
pub fn use_is_authenticated() -> bool {
    let auth = use_auth();
    auth.is_authenticated()
}

/// Manual sign-out; local state is cleared even if the provider call fails
#[hook]
pub fn use_logout() -> Callback<()> {
    let auth = use_auth();
    let services = use_session_services();
    Callback::from(move |_| {
        end_session(&services, &auth.dispatcher(), LogoutReason::Manual);
    })
}

/// Sign in with email and password, then load the backend profile
#[hook]
pub fn use_sign_in() -> Callback<(String, String)> {
    let auth = use_auth();
    let services = use_session_services();
    Callback::from(move |(email, password): (String, String)| {
        let dispatcher = auth.dispatcher();
        let services = services.clone();
        dispatcher.dispatch(AuthAction::SetLoading(true));
        spawn_local(async move {
            let result = authenticate(
                services.identity.as_ref(),
                services.profiles.as_ref(),
                &email,
                &password,
            )
            .await;
            match result {
                Ok(user) => {
                    info!(uid = %user.uid(), "Signed in");
                    dispatcher.dispatch(AuthAction::Login(user));
                }
                Err(SessionError::Blocked) => {
                    dispatcher.dispatch(AuthAction::Logout(LogoutReason::Blocked));
                }
                Err(e) => {
                    warn!("Sign-in failed: {e}");
                    dispatcher.dispatch(AuthAction::SetError(e.to_string()));
                }
            }
        });
    })
}
