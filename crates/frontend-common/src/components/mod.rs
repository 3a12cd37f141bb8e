mod inactivity_modal;
mod logout_notice;

pub use inactivity_modal::InactivityModal;
pub use logout_notice::LogoutNoticeToast;
