//! Account lifecycle operations: registration, administrative updates,
//! activation, role grants, and password changes.
//!
//! These are use-case functions over the store interfaces, kept free of any
//! transport concern. "Delete" is a soft deactivation; rows are never
//! physically removed.

use crate::auth::crypto::CredentialHasher;
use crate::auth::error::{AuthError, Denial};
use crate::auth::models::{Role, User};
use crate::auth::repo::{CreateOutcome, UpdateOutcome, UserStore};
use chrono::Utc;
use regex::Regex;
use tracing::debug;

/// Input for [`register_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to `[user]` when absent.
    pub roles: Option<Vec<Role>>,
}

/// Partial administrative update; absent fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<Role>>,
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn duplicate_field(field: &str, value: &str) -> AuthError {
    AuthError::Validation(format!("{field} '{value}' is already in use"))
}

async fn load_user(users: &dyn UserStore, user_id: i64) -> Result<User, AuthError> {
    users
        .get_by_id(user_id)
        .await?
        .ok_or(AuthError::NotFound("user"))
}

async fn persist_update(
    users: &dyn UserStore,
    user_id: i64,
    user: &User,
) -> Result<User, AuthError> {
    match users.update(user_id, user).await? {
        UpdateOutcome::Updated(user) => Ok(user),
        UpdateOutcome::Missing => Err(AuthError::NotFound("user")),
        // The row changed under us between read and write.
        UpdateOutcome::Conflict => Err(AuthError::Validation(
            "username or email is already in use".to_string(),
        )),
    }
}

/// Register a new account.
///
/// Username and email are independently checked for uniqueness before the
/// insert; a constraint violation racing past the pre-checks degrades to
/// the same "already in use" error. New accounts start active with roles
/// defaulting to `[user]`.
///
/// # Errors
/// Validation errors for malformed or conflicting input; infrastructure
/// errors pass through.
pub async fn register_user(
    users: &dyn UserStore,
    hasher: &CredentialHasher,
    new_user: NewUser,
) -> Result<User, AuthError> {
    let NewUser {
        username,
        email,
        password,
        roles,
    } = new_user;

    if username.trim().is_empty() {
        return Err(AuthError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if !valid_email(&email) {
        return Err(AuthError::Validation(format!("invalid email: {email}")));
    }
    let roles = roles.unwrap_or_else(|| vec![Role::User]);
    if roles.is_empty() {
        return Err(AuthError::Validation(
            "user must have at least one role".to_string(),
        ));
    }

    if users.get_by_username(&username).await?.is_some() {
        return Err(duplicate_field("username", &username));
    }
    if users.get_by_email(&email).await?.is_some() {
        return Err(duplicate_field("email", &email));
    }

    let now = Utc::now();
    let user = User {
        id: 0,
        username,
        email,
        password_hash: hasher.hash_async(&password).await?,
        roles,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    match users.create(&user).await? {
        CreateOutcome::Created(user) => {
            debug!(user_id = user.id, "user registered");
            Ok(user)
        }
        CreateOutcome::Conflict => Err(AuthError::Validation(
            "username or email is already in use".to_string(),
        )),
    }
}

/// # Errors
/// Infrastructure errors only; an unknown id reads as `None`.
pub async fn get_user(users: &dyn UserStore, user_id: i64) -> Result<Option<User>, AuthError> {
    Ok(users.get_by_id(user_id).await?)
}

/// # Errors
/// Infrastructure errors only.
pub async fn list_users(
    users: &dyn UserStore,
    skip: i64,
    limit: i64,
    active: Option<bool>,
) -> Result<Vec<User>, AuthError> {
    Ok(users.list(skip, limit, active).await?)
}

/// Administrative partial update. Uniqueness is re-validated only for the
/// fields that actually change.
///
/// # Errors
/// Not-found for an unknown id, validation errors for conflicts or an empty
/// role set.
pub async fn update_user(
    users: &dyn UserStore,
    user_id: i64,
    patch: UserPatch,
) -> Result<User, AuthError> {
    let existing = load_user(users, user_id).await?;

    if let Some(username) = &patch.username {
        if *username != existing.username {
            if let Some(holder) = users.get_by_username(username).await? {
                if holder.id != user_id {
                    return Err(duplicate_field("username", username));
                }
            }
        }
    }
    if let Some(email) = &patch.email {
        if *email != existing.email {
            if !valid_email(email) {
                return Err(AuthError::Validation(format!("invalid email: {email}")));
            }
            if let Some(holder) = users.get_by_email(email).await? {
                if holder.id != user_id {
                    return Err(duplicate_field("email", email));
                }
            }
        }
    }
    if let Some(roles) = &patch.roles {
        if roles.is_empty() {
            return Err(AuthError::Validation(
                "user must have at least one role".to_string(),
            ));
        }
    }

    let updated = User {
        id: existing.id,
        username: patch.username.unwrap_or(existing.username),
        email: patch.email.unwrap_or(existing.email),
        password_hash: existing.password_hash,
        roles: patch.roles.unwrap_or(existing.roles),
        is_active: existing.is_active,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    persist_update(users, user_id, &updated).await
}

/// Soft-delete: mark the account inactive, keeping the row for audit and
/// referential history. Returns whether a row existed.
///
/// # Errors
/// Infrastructure errors only.
pub async fn soft_delete_user(users: &dyn UserStore, user_id: i64) -> Result<bool, AuthError> {
    Ok(users.soft_delete(user_id).await?)
}

/// Re-enable an account. A no-op if it is already active.
///
/// # Errors
/// Not-found for an unknown id.
pub async fn activate_user(users: &dyn UserStore, user_id: i64) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    if user.is_active {
        return Ok(user);
    }
    let updated = User {
        is_active: true,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

/// Disable an account. A no-op if it is already inactive.
///
/// Existing sessions are left untouched; revocation is a separate
/// operation. Resolution still cuts the account off at the live-active
/// check.
///
/// # Errors
/// Not-found for an unknown id.
pub async fn deactivate_user(users: &dyn UserStore, user_id: i64) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    if !user.is_active {
        return Ok(user);
    }
    let updated = User {
        is_active: false,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

/// Grant the admin role, keeping existing roles. Idempotent.
///
/// # Errors
/// Not-found for an unknown id.
pub async fn grant_admin(users: &dyn UserStore, user_id: i64) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    if user.roles.contains(&Role::Admin) {
        return Ok(user);
    }
    let mut roles = user.roles.clone();
    roles.push(Role::Admin);
    let updated = User {
        roles,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

/// Revoke the admin role. A no-op if the user does not hold it.
///
/// # Errors
/// Rejected with a validation error if revoking would leave the role set
/// empty; the stored roles are left unchanged in that case.
pub async fn revoke_admin(users: &dyn UserStore, user_id: i64) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    if !user.roles.contains(&Role::Admin) {
        return Ok(user);
    }
    let roles: Vec<Role> = user
        .roles
        .iter()
        .copied()
        .filter(|role| *role != Role::Admin)
        .collect();
    if roles.is_empty() {
        return Err(AuthError::Validation(
            "cannot revoke role 'admin': a user must keep at least one role".to_string(),
        ));
    }
    let updated = User {
        roles,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

/// Self-service password change; requires re-proving the current password.
///
/// # Errors
/// A wrong current password is a credential failure and surfaces as the
/// generic authentication error.
pub async fn change_password(
    users: &dyn UserStore,
    hasher: &CredentialHasher,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    if !hasher
        .verify_async(current_password, &user.password_hash)
        .await?
    {
        debug!(user_id, "password change rejected: current password mismatch");
        return Err(AuthError::Authentication(Denial::BadCredentials));
    }
    let updated = User {
        password_hash: hasher.hash_async(new_password).await?,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

/// Administrative password reset; no re-proof of the old password.
///
/// # Errors
/// Not-found for an unknown id.
pub async fn set_password(
    users: &dyn UserStore,
    hasher: &CredentialHasher,
    user_id: i64,
    new_password: &str,
) -> Result<User, AuthError> {
    let user = load_user(users, user_id).await?;
    let updated = User {
        password_hash: hasher.hash_async(new_password).await?,
        updated_at: Utc::now(),
        ..user
    };
    persist_update(users, user_id, &updated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryUserStore;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_params(8 * 1024, 1, 1).expect("params")
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            roles: None,
        }
    }

    async fn register(store: &MemoryUserStore, username: &str, email: &str) -> User {
        register_user(store, &hasher(), new_user(username, email))
            .await
            .expect("register")
    }

    #[tokio::test]
    async fn registration_defaults_and_hashing() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;

        assert!(user.id > 0);
        assert_eq!(user.roles, vec![Role::User]);
        assert!(user.is_active);
        assert_ne!(user.password_hash, "password123");
        assert!(hasher().verify("password123", &user.password_hash));
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let store = MemoryUserStore::new();
        register(&store, "alice", "alice@x.com").await;

        let err = register_user(&store, &hasher(), new_user("alice", "other@x.com"))
            .await
            .expect_err("duplicate username");
        assert!(matches!(err, AuthError::Validation(_)));

        let err = register_user(&store, &hasher(), new_user("bob", "alice@x.com"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let store = MemoryUserStore::new();

        assert!(matches!(
            register_user(&store, &hasher(), new_user("  ", "ok@x.com")).await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            register_user(&store, &hasher(), new_user("carol", "not-an-email")).await,
            Err(AuthError::Validation(_))
        ));

        let mut explicit_empty = new_user("carol", "carol@x.com");
        explicit_empty.roles = Some(Vec::new());
        assert!(matches!(
            register_user(&store, &hasher(), explicit_empty).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn explicit_roles_are_honored() {
        let store = MemoryUserStore::new();
        let mut input = new_user("root", "root@x.com");
        input.roles = Some(vec![Role::User, Role::SuperAdmin]);
        let user = register_user(&store, &hasher(), input).await.expect("register");
        assert_eq!(user.roles, vec![Role::User, Role::SuperAdmin]);
    }

    #[tokio::test]
    async fn update_changes_only_patched_fields() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;

        let updated = update_user(
            &store,
            user.id,
            UserPatch {
                email: Some("new@x.com".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .expect("update");

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(updated.roles, user.roles);
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn update_revalidates_uniqueness_only_for_changed_fields() {
        let store = MemoryUserStore::new();
        let alice = register(&store, "alice", "alice@x.com").await;
        register(&store, "bob", "bob@x.com").await;

        // Re-submitting the current username is not a conflict.
        assert!(update_user(
            &store,
            alice.id,
            UserPatch {
                username: Some("alice".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .is_ok());

        let err = update_user(
            &store,
            alice.id,
            UserPatch {
                username: Some("bob".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .expect_err("taken username");
        assert!(matches!(err, AuthError::Validation(_)));

        let err = update_user(
            &store,
            alice.id,
            UserPatch {
                email: Some("bob@x.com".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .expect_err("taken email");
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let store = MemoryUserStore::new();
        let err = update_user(&store, 999, UserPatch::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, AuthError::NotFound("user")));
    }

    #[tokio::test]
    async fn activation_round_trip_is_idempotent() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;

        let deactivated = deactivate_user(&store, user.id).await.expect("deactivate");
        assert!(!deactivated.is_active);
        // Repeating is a no-op, not an error.
        assert!(!deactivate_user(&store, user.id).await.expect("again").is_active);

        let activated = activate_user(&store, user.id).await.expect("activate");
        assert!(activated.is_active);
        assert!(activate_user(&store, user.id).await.expect("again").is_active);
    }

    #[tokio::test]
    async fn soft_delete_marks_inactive_and_keeps_row() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;

        assert!(soft_delete_user(&store, user.id).await.expect("delete"));
        let row = get_user(&store, user.id)
            .await
            .expect("lookup")
            .expect("still present");
        assert!(!row.is_active);

        assert!(!soft_delete_user(&store, 999).await.expect("missing"));
    }

    #[tokio::test]
    async fn grant_admin_is_idempotent() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;

        let granted = grant_admin(&store, user.id).await.expect("grant");
        assert_eq!(granted.roles, vec![Role::User, Role::Admin]);
        let again = grant_admin(&store, user.id).await.expect("grant again");
        assert_eq!(again.roles, vec![Role::User, Role::Admin]);
    }

    #[tokio::test]
    async fn revoking_the_only_role_is_rejected_and_leaves_store_unchanged() {
        let store = MemoryUserStore::new();
        let mut input = new_user("admin", "admin@x.com");
        input.roles = Some(vec![Role::Admin]);
        let user = register_user(&store, &hasher(), input).await.expect("register");

        let err = revoke_admin(&store, user.id).await.expect_err("sole role");
        assert!(matches!(err, AuthError::Validation(_)));

        let stored = get_user(&store, user.id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.roles, vec![Role::Admin]);
    }

    #[tokio::test]
    async fn revoke_admin_keeps_other_roles() {
        let store = MemoryUserStore::new();
        let user = register(&store, "alice", "alice@x.com").await;
        grant_admin(&store, user.id).await.expect("grant");

        let revoked = revoke_admin(&store, user.id).await.expect("revoke");
        assert_eq!(revoked.roles, vec![Role::User]);
        // Revoking again is a no-op.
        let again = revoke_admin(&store, user.id).await.expect("revoke again");
        assert_eq!(again.roles, vec![Role::User]);
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let store = MemoryUserStore::new();
        let hasher = hasher();
        let user = register(&store, "alice", "alice@x.com").await;

        let err = change_password(&store, &hasher, user.id, "wrong", "next-password")
            .await
            .expect_err("bad current password");
        assert!(matches!(
            err,
            AuthError::Authentication(Denial::BadCredentials)
        ));

        let updated = change_password(&store, &hasher, user.id, "password123", "next-password")
            .await
            .expect("change");
        assert!(hasher.verify("next-password", &updated.password_hash));
        assert!(!hasher.verify("password123", &updated.password_hash));
    }

    #[tokio::test]
    async fn set_password_needs_no_re_proof() {
        let store = MemoryUserStore::new();
        let hasher = hasher();
        let user = register(&store, "alice", "alice@x.com").await;

        let updated = set_password(&store, &hasher, user.id, "admin-chosen")
            .await
            .expect("set");
        assert!(hasher.verify("admin-chosen", &updated.password_hash));

        let err = set_password(&store, &hasher, 999, "whatever")
            .await
            .expect_err("missing user");
        assert!(matches!(err, AuthError::NotFound("user")));
    }

    #[tokio::test]
    async fn listing_supports_paging_and_active_filter() {
        let store = MemoryUserStore::new();
        let first = register(&store, "alice", "alice@x.com").await;
        register(&store, "bob", "bob@x.com").await;
        register(&store, "carol", "carol@x.com").await;
        deactivate_user(&store, first.id).await.expect("deactivate");

        let all = list_users(&store, 0, 100, None).await.expect("list");
        assert_eq!(all.len(), 3);

        let active = list_users(&store, 0, 100, Some(true)).await.expect("list");
        assert_eq!(active.len(), 2);
        let inactive = list_users(&store, 0, 100, Some(false)).await.expect("list");
        assert_eq!(inactive.len(), 1);

        let page = list_users(&store, 1, 1, None).await.expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "bob");
    }

    #[test]
    fn email_format_check() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }
}
