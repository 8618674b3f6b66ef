use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef},
    Decode, FromRow, Postgres, Type,
};
use thiserror::Error;
use time::OffsetDateTime;

use crate::crud::{Assignment, Changeset, Record, SqlValue};

/// Account role, stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl From<Role> for SqlValue {
    fn from(role: Role) -> Self {
        SqlValue::Text(role.as_str().to_string())
    }
}

impl Type<Postgres> for Role {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub role: Role,
    pub status: bool,
    pub create_time: OffsetDateTime,
    pub update_time: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[cfg(test)]
    pub fn fixture(id: i64, role: Role) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            name: format!("user-{id}"),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            role,
            status: true,
            create_time: now,
            update_time: now,
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "password_hash",
        "role",
        "status",
        "create_time",
        "update_time",
    ];
}

/// Row to insert; the password is already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl Changeset for NewUser {
    fn into_assignments(self) -> anyhow::Result<Vec<Assignment>> {
        Ok(vec![
            ("name", self.name.into()),
            ("email", self.email.into()),
            ("password_hash", self.password_hash.into()),
            ("role", self.role.into()),
        ])
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl Changeset for UserChanges {
    fn into_assignments(self) -> anyhow::Result<Vec<Assignment>> {
        let mut out: Vec<Assignment> = Vec::new();
        if let Some(name) = self.name {
            out.push(("name", name.into()));
        }
        if let Some(email) = self.email {
            out.push(("email", email.into()));
        }
        if let Some(hash) = self.password_hash {
            out.push(("password_hash", hash.into()));
        }
        if let Some(role) = self.role {
            out.push(("role", role.into()));
        }
        Ok(out)
    }
}
