use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::policy,
    candidates::{
        dto::ListCandidatesQuery,
        repo::CANDIDATES,
        repo_types::{Candidate, CandidatePatch, NewCandidate},
    },
    crud::Filter,
    error::AppError,
    users::repo_types::User,
};

// Column widths from the candidate table.
const UUID_MAX: usize = 100;
const NAME_MAX: usize = 50;
const GENDER_MAX: usize = 10;
const AGE_MAX: usize = 10;
const EDUCATION_MAX: usize = 50;
const LOCATION_MAX: usize = 100;
const EXPECTATION_MAX: usize = 200;
const DETAIL_LINK_MAX: usize = 500;

fn check_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_uuid(uuid: &str) -> Result<(), AppError> {
    if uuid.trim().is_empty() {
        return Err(AppError::validation("uuid required"));
    }
    check_len("uuid", uuid, UUID_MAX)
}

fn validate_new(c: &NewCandidate) -> Result<(), AppError> {
    check_uuid(&c.uuid)?;
    check_len("name", &c.name, NAME_MAX)?;
    check_len("gender", &c.gender, GENDER_MAX)?;
    check_len("age", &c.age, AGE_MAX)?;
    check_len("education", &c.education, EDUCATION_MAX)?;
    check_len("location", &c.location, LOCATION_MAX)?;
    check_len("expectation", &c.expectation, EXPECTATION_MAX)?;
    check_len("detail_link", &c.detail_link, DETAIL_LINK_MAX)
}

fn validate_patch(p: &CandidatePatch) -> Result<(), AppError> {
    if let Some(uuid) = &p.uuid {
        check_uuid(uuid)?;
    }
    let limited = [
        ("name", &p.name, NAME_MAX),
        ("gender", &p.gender, GENDER_MAX),
        ("age", &p.age, AGE_MAX),
        ("education", &p.education, EDUCATION_MAX),
        ("location", &p.location, LOCATION_MAX),
        ("expectation", &p.expectation, EXPECTATION_MAX),
        ("detail_link", &p.detail_link, DETAIL_LINK_MAX),
    ];
    for (field, value, max) in limited {
        if let Some(v) = value {
            check_len(field, v, max)?;
        }
    }
    Ok(())
}

fn list_filters(q: &ListCandidatesQuery) -> Vec<Filter> {
    let mut filters = Vec::new();
    if let Some(uuid) = &q.uuid {
        filters.push(Filter::eq("uuid", uuid.as_str()));
    }
    if let Some(since) = q.extracted_since {
        filters.push(Filter::ge("extract_time", since));
    }
    if let Some(until) = q.extracted_until {
        filters.push(Filter::le("extract_time", until));
    }
    filters
}

pub async fn create(db: &PgPool, new: NewCandidate) -> Result<Candidate, AppError> {
    validate_new(&new)?;
    if Candidate::find_active_by_uuid(db, &new.uuid).await?.is_some() {
        warn!(uuid = %new.uuid, "candidate uuid already exists");
        return Err(AppError::Duplicate("UUID already exists".into()));
    }
    let candidate = CANDIDATES.create(db, new).await?;
    info!(candidate_id = candidate.id, uuid = %candidate.uuid, "candidate created");
    Ok(candidate)
}

pub async fn list(
    db: &PgPool,
    q: &ListCandidatesQuery,
) -> Result<(Vec<Candidate>, i64), AppError> {
    let (skip, limit) = q.window();
    let filters = list_filters(q);
    let rows = CANDIDATES.get_many(db, skip, limit, &filters).await?;
    let total = CANDIDATES.count(db, &filters).await?;
    Ok((rows, total))
}

pub async fn get(db: &PgPool, id: i64) -> Result<Candidate, AppError> {
    CANDIDATES
        .get(db, id, &[])
        .await?
        .ok_or_else(|| AppError::not_found("Candidate not found"))
}

pub async fn update(db: &PgPool, id: i64, patch: CandidatePatch) -> Result<Candidate, AppError> {
    validate_patch(&patch)?;
    if let Some(uuid) = &patch.uuid {
        if let Some(owner) = Candidate::find_active_by_uuid(db, uuid).await? {
            if owner.id != id {
                return Err(AppError::Duplicate("UUID already exists".into()));
            }
        }
    }
    let candidate = CANDIDATES
        .update(db, id, patch, &[])
        .await?
        .ok_or_else(|| AppError::not_found("Candidate not found"))?;
    info!(candidate_id = candidate.id, "candidate updated");
    Ok(candidate)
}

pub async fn delete(db: &PgPool, id: i64) -> Result<(), AppError> {
    CANDIDATES
        .soft_delete(db, id, &[])
        .await?
        .ok_or_else(|| AppError::not_found("Candidate not found"))?;
    info!(candidate_id = id, "candidate deleted");
    Ok(())
}

/// Physically removes the row, including soft-deleted ones. Admin only.
pub async fn purge(db: &PgPool, actor: &User, id: i64) -> Result<(), AppError> {
    policy::ensure_admin(actor)?;
    CANDIDATES.hard_delete(db, id, &[]).await?;
    info!(candidate_id = id, actor_id = actor.id, "candidate purged");
    Ok(())
}
