use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::candidates::repo_types::{Candidate, EducationDetail, WorkExperience};
use crate::pagination::Pagination;

#[derive(Debug, Serialize)]
pub struct CandidateOut {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub gender: String,
    pub age: String,
    pub education: String,
    pub education_detail: Vec<EducationDetail>,
    pub location: String,
    pub expectation: String,
    pub skills: Vec<String>,
    pub work_experiences: Vec<WorkExperience>,
    pub detail_link: String,
    pub detail_extracted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub extract_time: OffsetDateTime,
    pub status: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub update_time: OffsetDateTime,
}

impl From<Candidate> for CandidateOut {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id,
            uuid: c.uuid,
            name: c.name,
            gender: c.gender,
            age: c.age,
            education: c.education,
            education_detail: c.education_detail.0,
            location: c.location,
            expectation: c.expectation,
            skills: c.skills.0,
            work_experiences: c.work_experiences.0,
            detail_link: c.detail_link,
            detail_extracted: c.detail_extracted,
            extract_time: c.extract_time,
            status: c.status,
            create_time: c.create_time,
            update_time: c.update_time,
        }
    }
}

/// Query string of `GET /candidates`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListCandidatesQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub uuid: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub extracted_since: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub extracted_until: Option<OffsetDateTime>,
}

impl ListCandidatesQuery {
    pub fn window(&self) -> (i64, i64) {
        Pagination {
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(100),
        }
        .window()
    }
}
