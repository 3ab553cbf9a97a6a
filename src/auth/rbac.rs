//! Role-based access control gate.
//!
//! Composes strictly after identity resolution: a request without a valid
//! identity must already have failed authentication before a role check can
//! run, so "unauthenticated" and "unauthorized" stay distinct outcomes.

use crate::auth::error::AuthError;
use crate::auth::models::{AuthenticatedUser, Role};

/// Pass the identity through if its role set intersects `allowed`.
///
/// The roles consulted are the issuance-time snapshot carried by the token,
/// not the live row; an administrative grant only takes effect on tokens
/// issued afterwards.
///
/// # Errors
/// Empty intersection yields an authorization error naming both the
/// required and the actual roles; with identity already established, that
/// disclosure is acceptable.
pub fn require_roles(
    authenticated: AuthenticatedUser,
    allowed: &[Role],
) -> Result<AuthenticatedUser, AuthError> {
    if authenticated
        .roles
        .iter()
        .any(|role| allowed.contains(role))
    {
        Ok(authenticated)
    } else {
        Err(AuthError::Authorization {
            required: allowed.to_vec(),
            actual: authenticated.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use chrono::Utc;

    fn identity(roles: Vec<Role>) -> AuthenticatedUser {
        let now = Utc::now();
        AuthenticatedUser {
            user: User {
                id: 1,
                username: "alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: String::new(),
                roles: roles.clone(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            roles,
            session_token: "opaque".to_string(),
        }
    }

    #[test]
    fn plain_user_cannot_reach_admin_work() {
        let err = require_roles(identity(vec![Role::User]), &[Role::Admin])
            .expect_err("must reject");
        match err {
            AuthError::Authorization { required, actual } => {
                assert_eq!(required, vec![Role::Admin]);
                assert_eq!(actual, vec![Role::User]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn any_overlap_is_enough() {
        let identity = identity(vec![Role::User, Role::Admin]);
        let passed = require_roles(identity, &[Role::Admin, Role::SuperAdmin])
            .expect("must pass");
        assert_eq!(passed.roles, vec![Role::User, Role::Admin]);
    }

    #[test]
    fn identity_passes_through_unchanged() {
        let passed =
            require_roles(identity(vec![Role::User]), &[Role::User]).expect("must pass");
        assert_eq!(passed.user.username, "alice");
        assert_eq!(passed.session_token, "opaque");
    }

    #[test]
    fn snapshot_roles_decide_not_the_live_row() {
        // Live row already has admin, but the token snapshot predates the
        // grant: the gate must still reject.
        let mut stale = identity(vec![Role::User]);
        stale.user.roles = vec![Role::User, Role::Admin];
        assert!(require_roles(stale, &[Role::Admin]).is_err());
    }

    #[test]
    fn empty_allowed_set_rejects_everyone() {
        assert!(require_roles(identity(vec![Role::SuperAdmin]), &[]).is_err());
    }
}
