//! Tokio host for the session layer
//!
//! One task owns the session store, the activity monitor and its timers, so no
//! other component can start or stop them. Callers talk to it through a
//! [`SupervisorHandle`]; the UI observes it through a `watch` channel of
//! [`SessionView`] snapshots and a stream of [`LogoutNotice`]s.

use crate::activity::{ActivityEvent, ActivitySource, Subscription};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::identity::{IdentityProvider, ProfileService};
use crate::monitor::{ActivityMonitor, Command, MonitorState};
use crate::revalidate::{revalidate, RevalidationOutcome};
use crate::session::{
    authenticate, sign_out, AuthenticatedUser, LogoutNotice, LogoutReason, SessionStore,
};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// Snapshot of the session published to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub user: Option<AuthenticatedUser>,
    pub monitor: MonitorState,
    /// Countdown value while the inactivity warning is open
    pub warning: Option<u32>,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            user: None,
            monitor: MonitorState::Inactive,
            warning: None,
        }
    }
}

/// Requests handled by the supervisor task
#[derive(Debug)]
pub enum SupervisorCommand {
    Login {
        user: AuthenticatedUser,
        reply: oneshot::Sender<()>,
    },
    Logout {
        reply: oneshot::Sender<Result<()>>,
    },
    Continue,
    TokenRefreshed(String),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Result of one re-validation round, tagged with the session it was for
type Revalidation = (u64, RevalidationOutcome);

/// Owner of all session state
pub struct SessionSupervisor {
    config: SessionConfig,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileService>,
    activity: Arc<dyn ActivitySource>,

    store: SessionStore,
    monitor: ActivityMonitor,
    warning: Option<u32>,
    /// Bumped on every login
    session_id: u64,

    idle: Option<(Pin<Box<Sleep>>, u64)>,
    countdown: Option<(Interval, u64)>,
    subscription: Option<Subscription>,
    activity_rx: Option<mpsc::UnboundedReceiver<ActivityEvent>>,
    revalidation: Option<AbortOnDrop>,

    commands: mpsc::UnboundedReceiver<SupervisorCommand>,
    outcomes_tx: mpsc::UnboundedSender<Revalidation>,
    outcomes_rx: mpsc::UnboundedReceiver<Revalidation>,
    view_tx: watch::Sender<SessionView>,
    notice_tx: mpsc::UnboundedSender<LogoutNotice>,
}

impl SessionSupervisor {
    /// Spawn the supervisor task on the current tokio runtime
    pub fn spawn(
        config: SessionConfig,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileService>,
        activity: Arc<dyn ActivitySource>,
    ) -> (SupervisorHandle, mpsc::UnboundedReceiver<LogoutNotice>) {
        let (supervisor, handle, notices) = Self::new(config, identity, profiles, activity);
        tokio::spawn(supervisor.run());
        (handle, notices)
    }

    fn new(
        config: SessionConfig,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileService>,
        activity: Arc<dyn ActivitySource>,
    ) -> (
        Self,
        SupervisorHandle,
        mpsc::UnboundedReceiver<LogoutNotice>,
    ) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(SessionView::default());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let supervisor = Self {
            monitor: ActivityMonitor::new(config.clone()),
            config,
            identity: identity.clone(),
            profiles: profiles.clone(),
            activity,
            store: SessionStore::new(),
            warning: None,
            session_id: 0,
            idle: None,
            countdown: None,
            subscription: None,
            activity_rx: None,
            revalidation: None,
            commands,
            outcomes_tx,
            outcomes_rx,
            view_tx,
            notice_tx: notice_tx.clone(),
        };
        let handle = SupervisorHandle {
            commands: commands_tx,
            view: view_rx,
            notices: notice_tx,
            identity,
            profiles,
        };
        (supervisor, handle, notice_rx)
    }

    async fn run(mut self) {
        debug!("Session supervisor started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SupervisorCommand::Shutdown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some(event) = next_activity(&mut self.activity_rx) => {
                    let commands = self.monitor.record_activity(event);
                    self.execute(commands);
                }
                generation = idle_fired(&mut self.idle) => {
                    self.idle = None;
                    let commands = self.monitor.idle_elapsed(generation);
                    self.execute(commands);
                }
                generation = countdown_ticked(&mut self.countdown) => {
                    let commands = self.monitor.tick(generation);
                    self.execute(commands);
                }
                Some((session_id, outcome)) = self.outcomes_rx.recv() => {
                    self.apply_revalidation(session_id, outcome);
                }
            }
        }
        debug!("Session supervisor stopped");
    }

    fn handle_command(&mut self, command: SupervisorCommand) {
        match command {
            SupervisorCommand::Login { user, reply } => {
                self.begin_session(user);
                let _ = reply.send(());
            }
            SupervisorCommand::Logout { reply } => {
                self.end_session(LogoutReason::Manual, Some(reply));
            }
            SupervisorCommand::Continue => {
                let commands = self.monitor.continue_session();
                self.execute(commands);
            }
            SupervisorCommand::TokenRefreshed(token) => {
                if self.store.set_token(token) {
                    self.publish();
                }
            }
            // Handled by the run loop
            SupervisorCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn begin_session(&mut self, user: AuthenticatedUser) {
        if self.store.is_authenticated() {
            debug!("Replacing existing session");
            self.release_session_resources();
        }

        let uid = user.uid().to_string();
        self.store.login(user);
        self.session_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscription = Some(self.activity.subscribe(tx));
        self.activity_rx = Some(rx);
        self.revalidation = Some(self.spawn_revalidation(self.session_id, uid));

        let commands = self.monitor.start();
        self.apply(commands);
        self.publish();
    }

    fn spawn_revalidation(&self, session_id: u64, uid: String) -> AbortOnDrop {
        let profiles = self.profiles.clone();
        let outcomes = self.outcomes_tx.clone();
        let period = self.config.revalidation_interval();

        AbortOnDrop(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let outcome = revalidate(profiles.as_ref(), &uid).await;
                if outcomes.send((session_id, outcome)).is_err() {
                    break;
                }
            }
        }))
    }

    fn apply_revalidation(&mut self, session_id: u64, outcome: RevalidationOutcome) {
        if session_id != self.session_id || !self.store.is_authenticated() {
            debug!(session_id, "Dropping re-validation result for a previous session");
            return;
        }
        if let RevalidationOutcome::ForceLogout(reason) = outcome {
            warn!(session_id, %reason, "Backend rejected session, forcing logout");
            self.end_session(reason, None);
        }
    }

    /// Run monitor commands. Logout goes through the shared logout path.
    fn execute(&mut self, commands: Vec<Command>) {
        let mut logout = None;
        for command in commands {
            match command {
                Command::Logout(reason) => logout = Some(reason),
                other => self.apply_one(other),
            }
        }
        self.publish();
        if let Some(reason) = logout {
            self.end_session(reason, None);
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            if let Command::Logout(reason) = command {
                warn!(%reason, "Unexpected logout request while applying timers");
                continue;
            }
            self.apply_one(command);
        }
    }

    fn apply_one(&mut self, command: Command) {
        match command {
            Command::CancelTimers => {
                self.idle = None;
                self.countdown = None;
            }
            Command::ArmIdle { after, generation } => {
                self.idle = Some((Box::pin(sleep(after)), generation));
            }
            Command::ArmCountdown { period, generation } => {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.countdown = Some((interval, generation));
            }
            Command::ShowWarning { remaining } => self.warning = Some(remaining),
            Command::HideWarning => self.warning = None,
            Command::Logout(_) => {}
        }
    }

    /// Stop timers, listeners and re-validation without touching the store
    fn release_session_resources(&mut self) {
        let commands = self.monitor.stop();
        self.apply(commands);
        self.idle = None;
        self.countdown = None;
        self.warning = None;
        self.subscription = None;
        self.activity_rx = None;
        self.revalidation = None;
    }

    /// Shared logout path for manual, inactivity and blocked logouts.
    ///
    /// Local state is cleared and published first. The provider sign-out runs
    /// on its own task, bounded by the configured timeout, and its result goes
    /// to `reply` when there is one.
    fn end_session(&mut self, reason: LogoutReason, reply: Option<oneshot::Sender<Result<()>>>) {
        if !self.store.is_authenticated() {
            debug!(%reason, "Logout requested without a session");
            if let Some(reply) = reply {
                let _ = reply.send(Err(SessionError::Inactive));
            }
            return;
        }
        self.release_session_resources();

        if let Some(notice) = self.store.end(reason) {
            info!(%reason, "Forced logout");
            let _ = self.notice_tx.send(notice);
        }
        self.publish();

        let identity = self.identity.clone();
        let limit = self.config.sign_out_timeout();
        tokio::spawn(async move {
            let result = match timeout(limit, sign_out(identity.as_ref(), reason)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%reason, "Identity provider did not acknowledge sign-out in {limit:?}");
                    Err(SessionError::sign_out(format!(
                        "no answer within {}s",
                        limit.as_secs()
                    )))
                }
            };
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        });
    }

    fn teardown(&mut self) {
        self.release_session_resources();
        self.publish();
    }

    fn publish(&self) {
        self.view_tx.send_replace(SessionView {
            user: self.store.current().cloned(),
            monitor: self.monitor.state(),
            warning: self.warning,
        });
    }
}

async fn next_activity(
    rx: &mut Option<mpsc::UnboundedReceiver<ActivityEvent>>,
) -> Option<ActivityEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn idle_fired(idle: &mut Option<(Pin<Box<Sleep>>, u64)>) -> u64 {
    match idle {
        Some((sleep, generation)) => {
            sleep.as_mut().await;
            *generation
        }
        None => std::future::pending().await,
    }
}

async fn countdown_ticked(countdown: &mut Option<(Interval, u64)>) -> u64 {
    match countdown {
        Some((interval, generation)) => {
            interval.tick().await;
            *generation
        }
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`SessionSupervisor`]
#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<SupervisorCommand>,
    view: watch::Receiver<SessionView>,
    notices: mpsc::UnboundedSender<LogoutNotice>,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileService>,
}

impl SupervisorHandle {
    /// Authenticate with the identity provider and enrich with the backend profile.
    ///
    /// A profile lookup failure still signs the user in without a profile; a
    /// profile marked invalid is refused with [`SessionError::Blocked`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthenticatedUser> {
        let user = match authenticate(
            self.identity.as_ref(),
            self.profiles.as_ref(),
            email,
            password,
        )
        .await
        {
            Ok(user) => user,
            Err(SessionError::Blocked) => {
                if let Some(notice) = LogoutReason::Blocked.notice() {
                    let _ = self.notices.send(notice);
                }
                return Err(SessionError::Blocked);
            }
            Err(e) => return Err(e),
        };
        self.login(user.clone()).await?;
        Ok(user)
    }

    /// Start a session for an already authenticated user
    pub async fn login(&self, user: AuthenticatedUser) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Login { user, reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Explicit logout. The session is cleared even if the provider fails or
    /// never answers; [`SessionError::Inactive`] when nobody is signed in.
    pub async fn logout(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Logout { reply })?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// The "continue session" action of the warning dialog
    pub fn continue_session(&self) -> Result<()> {
        self.send(SupervisorCommand::Continue)
    }

    /// Ask the identity provider for a fresh credential and store it
    pub async fn refresh_token(&self) -> Result<Option<String>> {
        let token = self.identity.refresh_token().await?;
        if let Some(token) = &token {
            self.send(SupervisorCommand::TokenRefreshed(token.clone()))?;
        }
        Ok(token)
    }

    /// Stop the supervisor; timers are cleared without signing out
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Shutdown { reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Latest session snapshot
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Subscribe to session snapshots
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    fn send(&self, command: SupervisorCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}
