//! Idle-timeout warning modal

use yew::prelude::*;

#[derive(Properties, Clone, PartialEq)]
pub struct InactivityModalProps {
    /// Seconds left before the session is closed
    pub remaining: u32,
    pub on_continue: Callback<()>,
}

/// Render seconds as `m:ss`
pub(crate) fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Warning shown while the idle countdown runs
#[function_component(InactivityModal)]
pub fn inactivity_modal(props: &InactivityModalProps) -> Html {
    let on_click = {
        let on_continue = props.on_continue.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_continue.emit(());
        })
    };

    html! {
        <div class="fixed inset-0 bg-black bg-opacity-50 flex items-center justify-center z-50"
             role="alertdialog" aria-modal="true">
            <div class="bg-white dark:bg-gray-800 rounded-lg p-6 max-w-md w-full mx-4 shadow-xl">
                <div class="flex items-center mb-4">
                    <svg class="w-8 h-8 text-yellow-500 mr-3" fill="none" stroke="currentColor" viewBox="0 0 24 24">
                        <path stroke-linecap="round" stroke-linejoin="round" stroke-width="2"
                            d="M12 8v4l3 3m6-3a9 9 0 11-18 0 9 9 0 0118 0z" />
                    </svg>
                    <h2 class="text-xl font-bold text-gray-900 dark:text-white">
                        {"Are you still there?"}
                    </h2>
                </div>

                <p class="text-gray-600 dark:text-gray-300 mb-2">
                    {"You have been inactive for a while. For your security you will be signed out in"}
                </p>
                <p class="text-3xl font-mono font-bold text-center text-gray-900 dark:text-white mb-6"
                   aria-live="polite">
                    {format_countdown(props.remaining)}
                </p>

                <button
                    onclick={on_click}
                    class="w-full bg-blue-600 hover:bg-blue-700 text-white font-medium
                           py-3 px-4 rounded-lg transition-colors"
                >
                    {"Continue session"}
                </button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(60), "1:00");
        assert_eq!(format_countdown(59), "0:59");
        assert_eq!(format_countdown(5), "0:05");
        assert_eq!(format_countdown(0), "0:00");
    }
}
