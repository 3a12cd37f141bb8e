//! Session activity monitor
//!
//! An I/O-free state machine enforcing the idle-logout policy. Callers feed it
//! activity, timer expirations and user decisions; every transition returns the
//! [`Command`]s the host must execute, in order. Hosts own the actual timers
//! (tokio in [`crate::supervisor`], gloo in the browser).
//!
//! ```text
//!   Inactive --start--> Active --idle_elapsed--> Warning --tick to 0--> Expired
//!                        ^  |                      |
//!                        +--+ activity             | activity / continue
//!                        +-------------------------+
//! ```
//!
//! Any state returns to `Inactive` on [`ActivityMonitor::stop`].

use crate::activity::ActivityEvent;
use crate::config::SessionConfig;
use crate::session::LogoutReason;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MonitorState {
    /// No authenticated session
    Inactive,
    /// Session running, idle clock armed
    Active,
    /// Countdown visible, session still valid
    Warning { remaining: u32 },
    /// Countdown reached zero; logout has been requested
    Expired,
}

impl MonitorState {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Active | Self::Warning { .. })
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drop every armed timer
    CancelTimers,
    /// Arm the one-shot idle timer; report back via `idle_elapsed(generation)`
    ArmIdle { after: Duration, generation: u64 },
    /// Arm the periodic countdown; the first tick fires one `period` from now
    ArmCountdown { period: Duration, generation: u64 },
    ShowWarning { remaining: u32 },
    HideWarning,
    Logout(LogoutReason),
}

/// Idle-logout state machine
#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    config: SessionConfig,
    state: MonitorState,
    generation: u64,
}

impl ActivityMonitor {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: MonitorState::Inactive,
            generation: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Generation of the currently armed timers
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Countdown value while the warning is open
    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            MonitorState::Warning { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Begin monitoring a freshly authenticated session
    pub fn start(&mut self) -> Vec<Command> {
        match self.state {
            MonitorState::Inactive | MonitorState::Expired => {
                info!(
                    warning_after_secs = self.config.warning_delay().as_secs(),
                    "Session activity monitor started"
                );
                self.enter(MonitorState::Active)
            }
            MonitorState::Active | MonitorState::Warning { .. } => Vec::new(),
        }
    }

    /// Qualifying activity resets the idle clock and closes any warning
    pub fn record_activity(&mut self, event: ActivityEvent) -> Vec<Command> {
        match self.state {
            MonitorState::Active => {
                trace!(%event, "Activity reset idle timer");
                self.enter(MonitorState::Active)
            }
            MonitorState::Warning { remaining } => {
                debug!(%event, remaining, "Activity during warning, session resumed");
                self.enter(MonitorState::Active)
            }
            MonitorState::Inactive | MonitorState::Expired => Vec::new(),
        }
    }

    /// The user chose to keep the session alive
    pub fn continue_session(&mut self) -> Vec<Command> {
        match self.state {
            MonitorState::Warning { .. } | MonitorState::Active => {
                debug!("Session continued by user");
                self.enter(MonitorState::Active)
            }
            MonitorState::Inactive | MonitorState::Expired => Vec::new(),
        }
    }

    /// The idle timer armed with `generation` fired
    pub fn idle_elapsed(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.generation || self.state != MonitorState::Active {
            trace!(generation, current = self.generation, "Ignoring stale idle timer");
            return Vec::new();
        }
        info!(
            countdown = self.config.countdown_start,
            "Idle limit approaching, showing warning"
        );
        self.enter(MonitorState::Warning {
            remaining: self.config.countdown_start,
        })
    }

    /// The countdown armed with `generation` ticked
    pub fn tick(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.generation {
            trace!(generation, current = self.generation, "Ignoring stale countdown tick");
            return Vec::new();
        }
        let MonitorState::Warning { remaining } = self.state else {
            return Vec::new();
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            info!("Countdown finished, session expired for inactivity");
            return self.enter(MonitorState::Expired);
        }
        self.state = MonitorState::Warning { remaining };
        vec![Command::ShowWarning { remaining }]
    }

    /// Tear down monitoring (logout, forced logout or unmount)
    pub fn stop(&mut self) -> Vec<Command> {
        if self.state == MonitorState::Inactive {
            return Vec::new();
        }
        debug!(state = ?self.state, "Session activity monitor stopped");
        self.enter(MonitorState::Inactive)
    }

    fn enter(&mut self, next: MonitorState) -> Vec<Command> {
        let was_warning = matches!(self.state, MonitorState::Warning { .. });
        self.state = next;
        self.arm_for(next, was_warning)
    }

    /// Single place timers are armed. Always cancels before arming.
    fn arm_for(&mut self, state: MonitorState, was_warning: bool) -> Vec<Command> {
        self.generation += 1;
        let generation = self.generation;

        let mut commands = vec![Command::CancelTimers];
        if was_warning {
            commands.push(Command::HideWarning);
        }
        match state {
            MonitorState::Inactive => {}
            MonitorState::Active => commands.push(Command::ArmIdle {
                after: self.config.warning_delay(),
                generation,
            }),
            MonitorState::Warning { remaining } => {
                commands.push(Command::ShowWarning { remaining });
                commands.push(Command::ArmCountdown {
                    period: self.config.tick_period(),
                    generation,
                });
            }
            MonitorState::Expired => commands.push(Command::Logout(LogoutReason::Inactive)),
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled_config() -> SessionConfig {
        SessionConfig::new(Duration::from_secs(10), Duration::from_secs(4), 3).unwrap()
    }

    /// Virtual-time host executing monitor commands the way a real driver does
    struct Simulation {
        monitor: ActivityMonitor,
        now: Duration,
        idle: Option<(Duration, u64)>,
        countdown: Option<(Duration, Duration, u64)>,
        warning: Option<u32>,
        warnings_opened: usize,
        logouts: Vec<LogoutReason>,
    }

    impl Simulation {
        fn new(config: SessionConfig) -> Self {
            Self {
                monitor: ActivityMonitor::new(config),
                now: Duration::ZERO,
                idle: None,
                countdown: None,
                warning: None,
                warnings_opened: 0,
                logouts: Vec::new(),
            }
        }

        fn start(&mut self) {
            let commands = self.monitor.start();
            self.apply(commands);
        }

        fn activity(&mut self, event: ActivityEvent) {
            let commands = self.monitor.record_activity(event);
            self.apply(commands);
        }

        fn continue_session(&mut self) {
            let commands = self.monitor.continue_session();
            self.apply(commands);
        }

        fn logout(&mut self) {
            let commands = self.monitor.stop();
            self.apply(commands);
        }

        fn live_timers(&self) -> usize {
            usize::from(self.idle.is_some()) + usize::from(self.countdown.is_some())
        }

        fn advance(&mut self, by: Duration) {
            let target = self.now + by;
            loop {
                let idle_at = self.idle.map(|(at, _)| at).filter(|at| *at <= target);
                let tick_at = self.countdown.map(|(at, _, _)| at).filter(|at| *at <= target);
                match (idle_at, tick_at) {
                    (None, None) => break,
                    (Some(idle), tick) if tick.map_or(true, |t| idle <= t) => {
                        let (at, generation) = self.idle.take().unwrap();
                        self.now = at;
                        let commands = self.monitor.idle_elapsed(generation);
                        self.apply(commands);
                    }
                    _ => {
                        let (at, period, generation) = self.countdown.unwrap();
                        self.now = at;
                        self.countdown = Some((at + period, period, generation));
                        let commands = self.monitor.tick(generation);
                        self.apply(commands);
                    }
                }
            }
            self.now = target;
        }

        fn apply(&mut self, commands: Vec<Command>) {
            for command in commands {
                match command {
                    Command::CancelTimers => {
                        self.idle = None;
                        self.countdown = None;
                    }
                    Command::ArmIdle { after, generation } => {
                        assert!(self.idle.is_none(), "idle timer armed twice");
                        self.idle = Some((self.now + after, generation));
                    }
                    Command::ArmCountdown { period, generation } => {
                        assert!(self.countdown.is_none(), "countdown armed twice");
                        self.countdown = Some((self.now + period, period, generation));
                    }
                    Command::ShowWarning { remaining } => {
                        if self.warning.is_none() {
                            self.warnings_opened += 1;
                        }
                        self.warning = Some(remaining);
                    }
                    Command::HideWarning => self.warning = None,
                    Command::Logout(reason) => {
                        self.logouts.push(reason);
                        let commands = self.monitor.stop();
                        self.apply(commands);
                    }
                }
            }
        }
    }

    #[test]
    fn test_inactive_ignores_everything() {
        let mut monitor = ActivityMonitor::new(scaled_config());
        assert!(monitor.record_activity(ActivityEvent::Click).is_empty());
        assert!(monitor.continue_session().is_empty());
        assert!(monitor.idle_elapsed(0).is_empty());
        assert!(monitor.tick(0).is_empty());
        assert!(monitor.stop().is_empty());
        assert_eq!(monitor.state(), MonitorState::Inactive);
    }

    #[test]
    fn test_start_arms_idle_timer_after_cancel() {
        let mut monitor = ActivityMonitor::new(scaled_config());
        let commands = monitor.start();
        assert_eq!(
            commands,
            vec![
                Command::CancelTimers,
                Command::ArmIdle {
                    after: Duration::from_secs(6),
                    generation: 1,
                },
            ]
        );
        assert_eq!(monitor.state(), MonitorState::Active);

        // Starting twice does not re-arm
        assert!(monitor.start().is_empty());
    }

    #[test]
    fn test_every_arming_transition_cancels_first() {
        let mut monitor = ActivityMonitor::new(scaled_config());
        let mut batches = vec![monitor.start()];
        batches.push(monitor.record_activity(ActivityEvent::Scroll));
        let generation = monitor.generation();
        batches.push(monitor.idle_elapsed(generation));
        batches.push(monitor.continue_session());
        batches.push(monitor.stop());

        for batch in batches {
            assert_eq!(batch.first(), Some(&Command::CancelTimers), "{batch:?}");
        }
    }

    #[test]
    fn test_activity_spaced_below_warning_delay_never_warns() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        for i in 0..200 {
            sim.advance(Duration::from_millis(5_900));
            let event = ActivityEvent::ALL[i % ActivityEvent::ALL.len()];
            sim.activity(event);
            assert_eq!(sim.monitor.state(), MonitorState::Active);
        }
        assert_eq!(sim.warnings_opened, 0);
        assert!(sim.logouts.is_empty());
    }

    #[test]
    fn test_idle_enters_warning_with_full_countdown() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_millis(5_999));
        assert_eq!(sim.monitor.state(), MonitorState::Active);

        sim.advance(Duration::from_millis(1));
        assert_eq!(sim.monitor.state(), MonitorState::Warning { remaining: 3 });
        assert_eq!(sim.warning, Some(3));
    }

    #[test]
    fn test_default_countdown_starts_at_sixty() {
        let mut sim = Simulation::new(SessionConfig::default());
        sim.start();
        sim.advance(Duration::from_secs(29 * 60));
        assert_eq!(sim.warning, Some(60));
        assert_eq!(sim.monitor.remaining(), Some(60));
    }

    #[test]
    fn test_activity_during_warning_cancels_countdown() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(6));
        assert!(sim.warning.is_some());

        sim.activity(ActivityEvent::PointerMove);
        assert_eq!(sim.monitor.state(), MonitorState::Active);
        assert_eq!(sim.warning, None);
        assert!(sim.countdown.is_none());

        // Countdown must not keep running in the background
        sim.advance(Duration::from_millis(5_500));
        assert_eq!(sim.monitor.state(), MonitorState::Active);
        assert!(sim.logouts.is_empty());
    }

    #[test]
    fn test_countdown_to_zero_logs_out_once_as_inactive() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(6));
        sim.advance(Duration::from_secs(1));
        assert_eq!(sim.warning, Some(2));
        sim.advance(Duration::from_secs(1));
        assert_eq!(sim.warning, Some(1));
        assert!(sim.logouts.is_empty());

        sim.advance(Duration::from_secs(1));
        assert_eq!(sim.logouts, vec![LogoutReason::Inactive]);
        assert_eq!(sim.monitor.state(), MonitorState::Inactive);
        assert_eq!(sim.warning, None);
        assert_eq!(sim.live_timers(), 0);

        sim.advance(Duration::from_secs(60));
        assert_eq!(sim.logouts.len(), 1);
    }

    #[test]
    fn test_manual_logout_during_warning_cancels_countdown() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(7));
        assert_eq!(sim.warning, Some(2));

        sim.logout();
        assert_eq!(sim.monitor.state(), MonitorState::Inactive);
        assert_eq!(sim.warning, None);
        assert_eq!(sim.live_timers(), 0);

        sim.advance(Duration::from_secs(30));
        assert!(sim.logouts.is_empty());
    }

    #[test]
    fn test_scenario_idle_then_expire() {
        // idle budget 10s, lead 4s, countdown 3
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(6));
        assert_eq!(sim.monitor.state(), MonitorState::Warning { remaining: 3 });

        sim.advance(Duration::from_secs(3));
        assert_eq!(sim.logouts, vec![LogoutReason::Inactive]);
    }

    #[test]
    fn test_scenario_click_one_tick_into_warning() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(6));
        sim.advance(Duration::from_secs(1));
        assert_eq!(sim.warning, Some(2));

        sim.activity(ActivityEvent::Click);
        assert_eq!(sim.monitor.state(), MonitorState::Active);
        assert_eq!(sim.warning, None);

        sim.advance(Duration::from_secs(5));
        assert!(sim.logouts.is_empty());
        assert_eq!(sim.monitor.state(), MonitorState::Active);
    }

    #[test]
    fn test_continue_resets_full_idle_budget() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        sim.advance(Duration::from_secs(8));
        assert_eq!(sim.warning, Some(1));

        sim.continue_session();
        assert_eq!(sim.warning, None);
        sim.advance(Duration::from_millis(5_999));
        assert_eq!(sim.monitor.state(), MonitorState::Active);
        sim.advance(Duration::from_millis(1));
        assert_eq!(sim.monitor.state(), MonitorState::Warning { remaining: 3 });
        assert_eq!(sim.warnings_opened, 2);
    }

    #[test]
    fn test_never_more_than_one_timer_pair() {
        let mut sim = Simulation::new(scaled_config());
        sim.start();
        for step in 0..50u64 {
            sim.advance(Duration::from_millis(700 + step * 97));
            if step % 3 == 0 {
                sim.activity(ActivityEvent::KeyPress);
            }
            if step % 7 == 0 {
                sim.continue_session();
            }
            assert!(sim.live_timers() <= 1, "at most one timer per state");
        }
    }

    #[test]
    fn test_stale_generations_are_ignored() {
        let mut monitor = ActivityMonitor::new(scaled_config());
        monitor.start();
        let stale = monitor.generation();
        monitor.record_activity(ActivityEvent::Click);

        assert!(monitor.idle_elapsed(stale).is_empty());
        assert_eq!(monitor.state(), MonitorState::Active);

        let current = monitor.generation();
        monitor.idle_elapsed(current);
        let countdown_generation = monitor.generation();
        monitor.continue_session();
        assert!(monitor.tick(countdown_generation).is_empty());
    }

    #[test]
    fn test_restart_after_expiry() {
        let mut monitor = ActivityMonitor::new(scaled_config());
        monitor.start();
        monitor.idle_elapsed(monitor.generation());
        let generation = monitor.generation();
        monitor.tick(generation);
        monitor.tick(generation);
        let commands = monitor.tick(generation);
        assert!(commands.contains(&Command::Logout(LogoutReason::Inactive)));
        assert_eq!(monitor.state(), MonitorState::Expired);

        // Expired ignores further ticks and activity
        assert!(monitor.tick(generation).is_empty());
        assert!(monitor.record_activity(ActivityEvent::Click).is_empty());

        monitor.start();
        assert_eq!(monitor.state(), MonitorState::Active);
    }
}
