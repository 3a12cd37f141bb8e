//! Browser host for the idle-logout monitor
//!
//! Runs [`ActivityMonitor`] on gloo timers and window event listeners. Timer
//! callbacks only schedule work: the monitor may cancel the very timer that
//! fired, and a gloo handle must not be dropped from inside its own callback.

use crate::auth::{AuthAction, AuthContextData};
use crate::config::timer_millis;
use gloo::events::EventListener;
use gloo::timers::callback::{Interval, Timeout};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tablebook_core::{ActivityEvent, ActivityMonitor, Command, LogoutReason, SessionConfig};
use tracing::{debug, warn};
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

struct MonitorDriver {
    monitor: ActivityMonitor,
    idle: Option<Timeout>,
    countdown: Option<Interval>,
    listeners: Vec<EventListener>,
    dispatcher: UseReducerDispatcher<AuthContextData>,
    on_logout: Callback<LogoutReason>,
}

type SharedDriver = Rc<RefCell<MonitorDriver>>;

impl MonitorDriver {
    fn new(
        config: SessionConfig,
        dispatcher: UseReducerDispatcher<AuthContextData>,
        on_logout: Callback<LogoutReason>,
    ) -> Self {
        Self {
            monitor: ActivityMonitor::new(config),
            idle: None,
            countdown: None,
            listeners: Vec::new(),
            dispatcher,
            on_logout,
        }
    }
}

/// Feed one input to the monitor and run the commands it returns
fn drive(driver: &SharedDriver, input: impl FnOnce(&mut ActivityMonitor) -> Vec<Command>) {
    let commands = match driver.try_borrow_mut() {
        Ok(mut d) => input(&mut d.monitor),
        Err(_) => {
            warn!("Activity monitor busy, input dropped");
            return;
        }
    };
    for command in commands {
        execute(driver, command);
    }
}

fn execute(driver: &SharedDriver, command: Command) {
    match command {
        Command::CancelTimers => {
            let mut d = driver.borrow_mut();
            d.idle = None;
            d.countdown = None;
        }
        Command::ArmIdle { after, generation } => {
            let weak = Rc::downgrade(driver);
            let timeout = Timeout::new(timer_millis(after), move || {
                defer(weak, move |m| m.idle_elapsed(generation));
            });
            driver.borrow_mut().idle = Some(timeout);
        }
        Command::ArmCountdown { period, generation } => {
            let weak = Rc::downgrade(driver);
            let interval = Interval::new(timer_millis(period), move || {
                defer(weak.clone(), move |m| m.tick(generation));
            });
            driver.borrow_mut().countdown = Some(interval);
        }
        Command::ShowWarning { remaining } => {
            let dispatcher = driver.borrow().dispatcher.clone();
            dispatcher.dispatch(AuthAction::ShowWarning(remaining));
        }
        Command::HideWarning => {
            let dispatcher = driver.borrow().dispatcher.clone();
            dispatcher.dispatch(AuthAction::HideWarning);
        }
        Command::Logout(reason) => {
            let on_logout = driver.borrow().on_logout.clone();
            on_logout.emit(reason);
        }
    }
}

/// Run `input` once the current timer callback has returned
fn defer(
    weak: Weak<RefCell<MonitorDriver>>,
    input: impl FnOnce(&mut ActivityMonitor) -> Vec<Command> + 'static,
) {
    spawn_local(async move {
        if let Some(driver) = weak.upgrade() {
            drive(&driver, input);
        }
    });
}

fn attach_listeners(driver: &SharedDriver) {
    let Some(window) = web_sys::window() else {
        warn!("No window, activity tracking disabled");
        return;
    };
    let listeners = ActivityEvent::ALL
        .into_iter()
        .map(|event| {
            let weak = Rc::downgrade(driver);
            EventListener::new(&window, event.dom_event_name(), move |_| {
                if let Some(driver) = weak.upgrade() {
                    drive(&driver, |m| m.record_activity(event));
                }
            })
        })
        .collect();
    driver.borrow_mut().listeners = listeners;
}

/// Enforce the idle-logout policy while `active` is true.
///
/// The warning countdown is pushed into the auth context with
/// `ShowWarning`/`HideWarning`; expiry calls `on_logout` with
/// [`LogoutReason::Inactive`]. Returns the callback behind the
/// "Continue session" button.
#[hook]
pub fn use_activity_monitor(
    config: SessionConfig,
    active: bool,
    dispatcher: UseReducerDispatcher<AuthContextData>,
    on_logout: Callback<LogoutReason>,
) -> Callback<()> {
    let driver = {
        let on_logout = on_logout.clone();
        use_mut_ref(move || MonitorDriver::new(config, dispatcher, on_logout))
    };

    // Keep the latest logout handler without re-arming anything
    if let Ok(mut d) = driver.try_borrow_mut() {
        d.on_logout = on_logout;
    }

    {
        let driver = driver.clone();
        use_effect_with(active, move |active| {
            if *active {
                debug!("Starting activity monitor");
                attach_listeners(&driver);
                drive(&driver, ActivityMonitor::start);
            }
            move || {
                drive(&driver, ActivityMonitor::stop);
                driver.borrow_mut().listeners.clear();
            }
        });
    }

    Callback::from(move |_| drive(&driver, ActivityMonitor::continue_session))
}
