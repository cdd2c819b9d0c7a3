//! Privilege Checks
//!
//! Pure functions of the acting user. Every service call that needs them
//! receives the actor explicitly.

use kernel::error::app_error::{AppError, AppResult};

use crate::domain::entity::user::User;

/// The actor must be signed in
pub fn verify_signed_in(actor: &User) -> AppResult<()> {
    if !actor.is_signed_in() {
        return Err(AppError::unauthorized("Request requires authentication."));
    }
    Ok(())
}

/// The actor must be signed in and authorized (quiz passed and not banned, or admin)
pub fn verify_user_privilege(actor: &User) -> AppResult<()> {
    verify_signed_in(actor)?;
    if !actor.is_authorized() {
        return Err(AppError::forbidden("Request requires authorization."));
    }
    Ok(())
}

/// The actor must be signed in and an admin
pub fn verify_admin_privilege(actor: &User) -> AppResult<()> {
    verify_signed_in(actor)?;
    if !actor.is_admin() {
        return Err(AppError::forbidden("Request requires admin privilege."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::error::kind::ErrorKind;

    fn signed_in(quiz_passed: bool, banned: bool, admin: bool) -> User {
        User {
            id: "accounts.example.com/abc123".into(),
            quiz_passed,
            banned,
            admin,
            ..User::default()
        }
    }

    #[test]
    fn test_anonymous_is_unauthorized() {
        let anonymous = User::default();
        for result in [
            verify_signed_in(&anonymous),
            verify_user_privilege(&anonymous),
            verify_admin_privilege(&anonymous),
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        }
    }

    #[test]
    fn test_user_privilege() {
        assert!(verify_user_privilege(&signed_in(true, false, false)).is_ok());
        assert!(verify_user_privilege(&signed_in(false, true, true)).is_ok());

        let err = verify_user_privilege(&signed_in(false, false, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = verify_user_privilege(&signed_in(true, true, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_admin_privilege() {
        assert!(verify_admin_privilege(&signed_in(false, false, true)).is_ok());
        let err = verify_admin_privilege(&signed_in(true, false, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
