use anyhow::Context;
use sqlx::PgPool;

use crate::crud::{CrudBase, Filter};
use crate::users::repo_types::User;

pub static USERS: CrudBase<User> = CrudBase::new();

impl User {
    /// Find an active user by email.
    pub async fn find_active_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        USERS.find_one(db, &[Filter::eq("email", email)]).await
    }

    /// Whether any row owns `email`, deactivated ones included.
    pub async fn email_on_record(db: &PgPool, email: &str) -> anyhow::Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(db)
            .await
            .context("check email on record")
    }
}
