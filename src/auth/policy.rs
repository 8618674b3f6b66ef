//! Role and ownership checks.

use tracing::warn;

use crate::{error::AppError, users::repo_types::User};

pub fn ensure_admin(actor: &User) -> Result<(), AppError> {
    if actor.is_admin() {
        return Ok(());
    }
    warn!(actor_id = actor.id, "admin role required");
    Err(AppError::Forbidden)
}

/// Admins pass; everyone else may only touch their own record.
pub fn ensure_self_or_admin(actor: &User, target_id: i64) -> Result<(), AppError> {
    if actor.is_admin() || actor.id == target_id {
        return Ok(());
    }
    warn!(actor_id = actor.id, target_id, "access to another user's record denied");
    Err(AppError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    #[test]
    fn admin_bypasses_ownership() {
        let admin = User::fixture(1, Role::Admin);
        assert!(ensure_self_or_admin(&admin, 1).is_ok());
        assert!(ensure_self_or_admin(&admin, 99).is_ok());
        assert!(ensure_admin(&admin).is_ok());
    }

    #[test]
    fn user_reaches_only_own_record() {
        let user = User::fixture(7, Role::User);
        assert!(ensure_self_or_admin(&user, 7).is_ok());
        assert!(matches!(
            ensure_self_or_admin(&user, 8),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
    }
}
