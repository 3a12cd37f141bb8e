//! Toast explaining a forced logout

use crate::auth::{use_auth, AuthAction};
use crate::config::AuthConfig;
use gloo::timers::callback::Timeout;
use tablebook_core::LogoutReason;
use yew::prelude::*;

fn tone(reason: LogoutReason) -> &'static str {
    match reason {
        LogoutReason::Blocked => {
            "bg-red-50 dark:bg-red-900/30 text-red-700 dark:text-red-300 border-red-300"
        }
        LogoutReason::Inactive | LogoutReason::Manual => {
            "bg-yellow-50 dark:bg-yellow-900/30 text-yellow-800 dark:text-yellow-200 border-yellow-300"
        }
    }
}

/// Shows the pending logout notice and dismisses it after a while
#[function_component(LogoutNoticeToast)]
pub fn logout_notice_toast() -> Html {
    let auth = use_auth();

    {
        let dispatcher = auth.dispatcher();
        use_effect_with(auth.notice, move |notice| {
            let timeout = notice.map(|_| {
                Timeout::new(AuthConfig::NOTICE_DISMISS_MS, move || {
                    dispatcher.dispatch(AuthAction::DismissNotice);
                })
            });
            move || drop(timeout)
        });
    }

    let Some(notice) = auth.notice else {
        return html! {};
    };

    let on_close = {
        let dispatcher = auth.dispatcher();
        Callback::from(move |_: MouseEvent| dispatcher.dispatch(AuthAction::DismissNotice))
    };

    html! {
        <div class={classes!("fixed", "top-4", "right-4", "z-50", "max-w-sm", "rounded-lg",
                             "border", "p-4", "shadow-lg", tone(notice.reason))}
             role="status">
            <div class="flex items-start">
                <div class="flex-1">
                    <p class="font-semibold">{notice.title()}</p>
                    <p class="text-sm mt-1">{notice.message()}</p>
                </div>
                <button onclick={on_close} class="ml-4 text-sm opacity-70 hover:opacity-100"
                        aria-label="Dismiss">
                    {"×"}
                </button>
            </div>
        </div>
    }
}
