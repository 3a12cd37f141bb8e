//! Periodic profile re-validation policy

use crate::error::Result;
use crate::identity::{ProfileService, ValidationStatus};
use crate::session::LogoutReason;
use tracing::{debug, warn};

/// What to do after a re-validation round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// Leave the session as it is
    Keep,
    /// End the session with the given reason
    ForceLogout(LogoutReason),
}

/// Map a validation result to an outcome.
///
/// Transport or backend failures keep the session: only an explicit
/// `Blocked` answer logs the user out.
pub fn assess(result: &Result<ValidationStatus>) -> RevalidationOutcome {
    match result {
        Ok(ValidationStatus::Valid) => RevalidationOutcome::Keep,
        Ok(ValidationStatus::Blocked) => RevalidationOutcome::ForceLogout(LogoutReason::Blocked),
        Err(e) => {
            warn!("Profile re-validation failed, keeping session: {e}");
            RevalidationOutcome::Keep
        }
    }
}

/// Query the backend for `uid` and assess the answer
pub async fn revalidate<S>(service: &S, uid: &str) -> RevalidationOutcome
where
    S: ProfileService + ?Sized,
{
    debug!(uid, "Re-validating user profile");
    let result = service.validation_status(uid).await;
    assess(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::identity::MockProfileService;

    #[test]
    fn test_assess() {
        assert_eq!(assess(&Ok(ValidationStatus::Valid)), RevalidationOutcome::Keep);
        assert_eq!(
            assess(&Ok(ValidationStatus::Blocked)),
            RevalidationOutcome::ForceLogout(LogoutReason::Blocked)
        );
        assert_eq!(
            assess(&Err(SessionError::profile_fetch("503"))),
            RevalidationOutcome::Keep
        );
    }

    #[test]
    fn test_validation_status_from_flag() {
        assert_eq!(ValidationStatus::from_valid(true), ValidationStatus::Valid);
        assert_eq!(ValidationStatus::from_valid(false), ValidationStatus::Blocked);
    }

    #[tokio::test]
    async fn test_fetch_failure_never_logs_out() {
        let mut service = MockProfileService::new();
        service
            .expect_validation_status()
            .times(3)
            .returning(|_| Err(SessionError::profile_fetch("timeout")));

        for _ in 0..3 {
            assert_eq!(revalidate(&service, "uid-1").await, RevalidationOutcome::Keep);
        }
    }

    #[tokio::test]
    async fn test_blocked_forces_logout() {
        let mut service = MockProfileService::new();
        service
            .expect_validation_status()
            .withf(|uid| uid == "uid-7")
            .times(1)
            .returning(|_| Ok(ValidationStatus::Blocked));

        assert_eq!(
            revalidate(&service, "uid-7").await,
            RevalidationOutcome::ForceLogout(LogoutReason::Blocked)
        );
    }
}
