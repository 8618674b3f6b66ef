use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        policy,
    },
    config::AdminSeed,
    crud::Filter,
    error::AppError,
    users::{
        dto::{RegisterRequest, UpdateUserRequest},
        repo::USERS,
        repo_types::{NewUser, Role, User, UserChanges},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name required"));
    }
    Ok(name.to_string())
}

async fn ensure_email_free(db: &PgPool, email: &str) -> Result<(), AppError> {
    if User::find_active_by_email(db, email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Duplicate("Email already registered".into()));
    }
    Ok(())
}

/// Registers a new account with the `user` role.
pub async fn register(db: &PgPool, req: RegisterRequest) -> Result<User, AppError> {
    create_with_role(db, req, Role::User).await
}

async fn create_with_role(
    db: &PgPool,
    req: RegisterRequest,
    role: Role,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    check_email(&email)?;
    check_password(&req.password)?;
    let name = check_name(&req.name)?;

    ensure_email_free(db, &email).await?;

    let password_hash = hash_password(&req.password)?;
    let user = USERS
        .create(
            db,
            NewUser {
                name,
                email,
                password_hash,
                role,
            },
        )
        .await?;

    info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
    Ok(user)
}

/// `Some(user)` when the credentials match an active account.
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let email = normalize_email(email);
    let Some(user) = User::find_active_by_email(db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Ok(None);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Ok(None);
    }

    info!(user_id = user.id, "user logged in");
    Ok(Some(user))
}

/// Admins see every active user; others see only themselves.
pub async fn list(
    db: &PgPool,
    actor: &User,
    skip: i64,
    limit: i64,
) -> Result<(Vec<User>, i64), AppError> {
    let filters = if actor.is_admin() {
        Vec::new()
    } else {
        vec![Filter::eq("id", actor.id)]
    };
    let users = USERS.get_many(db, skip, limit, &filters).await?;
    let total = USERS.count(db, &filters).await?;
    Ok((users, total))
}

pub async fn get(db: &PgPool, actor: &User, id: i64) -> Result<User, AppError> {
    policy::ensure_self_or_admin(actor, id)?;
    USERS
        .get(db, id, &[])
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn update(
    db: &PgPool,
    actor: &User,
    id: i64,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    policy::ensure_self_or_admin(actor, id)?;
    if req.role.is_some() {
        policy::ensure_admin(actor)?;
    }

    let mut changes = UserChanges {
        role: req.role,
        ..Default::default()
    };
    if let Some(name) = req.name {
        changes.name = Some(check_name(&name)?);
    }
    if let Some(email) = req.email {
        let email = normalize_email(&email);
        check_email(&email)?;
        if let Some(owner) = User::find_active_by_email(db, &email).await? {
            if owner.id != id {
                return Err(AppError::Duplicate("Email already registered".into()));
            }
        }
        changes.email = Some(email);
    }
    if let Some(password) = req.password {
        check_password(&password)?;
        changes.password_hash = Some(hash_password(&password)?);
    }

    let user = USERS
        .update(db, id, changes, &[])
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = user.id, actor_id = actor.id, "user updated");
    Ok(user)
}

pub async fn delete(db: &PgPool, actor: &User, id: i64) -> Result<(), AppError> {
    policy::ensure_self_or_admin(actor, id)?;
    USERS
        .soft_delete(db, id, &[])
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = id, actor_id = actor.id, "user deactivated");
    Ok(())
}

/// Creates the configured admin unless a user row already owns the email.
pub async fn ensure_admin(db: &PgPool, seed: &AdminSeed) -> Result<(), AppError> {
    let email = normalize_email(&seed.email);
    if User::find_active_by_email(db, &email).await?.is_some() {
        info!(email = %email, "admin account present");
        return Ok(());
    }
    if User::email_on_record(db, &email).await? {
        warn!(email = %email, "admin email belongs to a deactivated account; not seeding");
        return Ok(());
    }
    let req = RegisterRequest {
        name: seed.name.clone(),
        email,
        password: seed.password.clone(),
    };
    create_with_role(db, req, Role::Admin).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("ada example@x.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn password_and_name_checks() {
        assert!(check_password("12345678").is_ok());
        assert!(matches!(check_password("short"), Err(AppError::Validation(_))));
        assert_eq!(check_name("  Ada ").unwrap(), "Ada");
        assert!(check_name("   ").is_err());
    }

    #[tokio::test]
    async fn non_admin_cannot_read_someone_else() {
        let state = crate::state::AppState::fake();
        let actor = User::fixture(5, Role::User);
        let err = get(&state.db, &actor, 6).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn non_admin_cannot_change_own_role() {
        let state = crate::state::AppState::fake();
        let actor = User::fixture(5, Role::User);
        let req = UpdateUserRequest {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let err = update(&state.db, &actor, 5, req).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    // The tests below need a live PostgreSQL reachable through DATABASE_URL.

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn register_then_authenticate(db: PgPool) {
        let user = register(&db, register_req("ada@example.com", "Secur3P@ss")).await.unwrap();
        assert_eq!(user.role, Role::User);

        let found = authenticate(&db, "ADA@example.com", "Secur3P@ss").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let wrong = authenticate(&db, "ada@example.com", "nope-nope").await.unwrap();
        assert!(wrong.is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_email_is_rejected(db: PgPool) {
        register(&db, register_req("dup@example.com", "Secur3P@ss")).await.unwrap();
        let err = register(&db, register_req("dup@example.com", "Other-P@ss")).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn self_access_and_partial_update(db: PgPool) {
        let me = register(&db, register_req("me@example.com", "Secur3P@ss")).await.unwrap();
        let other = register(&db, register_req("other@example.com", "Secur3P@ss")).await.unwrap();

        assert_eq!(get(&db, &me, me.id).await.unwrap().id, me.id);
        assert!(matches!(get(&db, &me, other.id).await, Err(AppError::Forbidden)));

        let req = UpdateUserRequest {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = update(&db, &me, me.id, req).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, me.email);
        assert_eq!(updated.password_hash, me.password_hash);
        assert!(updated.update_time >= me.update_time);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn admin_seed_survives_deactivated_admin(db: PgPool) {
        let seed = AdminSeed {
            name: "root".into(),
            email: "root@example.com".into(),
            password: "Secur3P@ss".into(),
        };
        ensure_admin(&db, &seed).await.unwrap();
        let admin = User::find_active_by_email(&db, "root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());

        delete(&db, &admin, admin.id).await.unwrap();
        ensure_admin(&db, &seed).await.unwrap();
        ensure_admin(&db, &seed).await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind("root@example.com")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn deleted_user_can_no_longer_authenticate(db: PgPool) {
        let me = register(&db, register_req("gone@example.com", "Secur3P@ss")).await.unwrap();
        delete(&db, &me, me.id).await.unwrap();
        assert!(authenticate(&db, "gone@example.com", "Secur3P@ss").await.unwrap().is_none());
        assert!(matches!(get(&db, &me, me.id).await, Err(AppError::NotFound(_))));
    }
}
