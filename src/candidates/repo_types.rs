use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

use crate::crud::{Assignment, Changeset, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationDetail {
    pub school: String,
    pub period: String,
    pub degree: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub period: String,
    pub position: String,
    pub industry: String,
    pub subordinates: String,
    pub salary: String,
    pub job_category: String,
    pub responsibility: String,
}

/// Candidate (resume) record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub gender: String,
    pub age: String,
    pub education: String,
    pub education_detail: Json<Vec<EducationDetail>>,
    pub location: String,
    pub expectation: String,
    pub skills: Json<Vec<String>>,
    pub work_experiences: Json<Vec<WorkExperience>>,
    pub detail_link: String,
    pub detail_extracted: bool,
    pub extract_time: OffsetDateTime,
    pub status: bool,
    pub create_time: OffsetDateTime,
    pub update_time: OffsetDateTime,
}

impl Record for Candidate {
    const TABLE: &'static str = "candidate";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "uuid",
        "name",
        "gender",
        "age",
        "education",
        "education_detail",
        "location",
        "expectation",
        "skills",
        "work_experiences",
        "detail_link",
        "detail_extracted",
        "extract_time",
        "status",
        "create_time",
        "update_time",
    ];
}

fn default_true() -> bool {
    true
}

/// Ingested resume; also the body of `POST /candidates`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCandidate {
    pub uuid: String,
    pub name: String,
    pub gender: String,
    pub age: String,
    pub education: String,
    #[serde(default)]
    pub education_detail: Vec<EducationDetail>,
    pub location: String,
    pub expectation: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    pub detail_link: String,
    #[serde(default = "default_true")]
    pub detail_extracted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub extract_time: OffsetDateTime,
}

impl Changeset for NewCandidate {
    fn into_assignments(self) -> anyhow::Result<Vec<Assignment>> {
        Ok(vec![
            ("uuid", self.uuid.into()),
            ("name", self.name.into()),
            ("gender", self.gender.into()),
            ("age", self.age.into()),
            ("education", self.education.into()),
            ("education_detail", serde_json::to_value(self.education_detail)?.into()),
            ("location", self.location.into()),
            ("expectation", self.expectation.into()),
            ("skills", serde_json::to_value(self.skills)?.into()),
            ("work_experiences", serde_json::to_value(self.work_experiences)?.into()),
            ("detail_link", self.detail_link.into()),
            ("detail_extracted", self.detail_extracted.into()),
            ("extract_time", self.extract_time.into()),
        ])
    }
}

/// Body of `PUT /candidates/:id`; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CandidatePatch {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub education: Option<String>,
    pub education_detail: Option<Vec<EducationDetail>>,
    pub location: Option<String>,
    pub expectation: Option<String>,
    pub skills: Option<Vec<String>>,
    pub work_experiences: Option<Vec<WorkExperience>>,
    pub detail_link: Option<String>,
    pub detail_extracted: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub extract_time: Option<OffsetDateTime>,
}

impl Changeset for CandidatePatch {
    fn into_assignments(self) -> anyhow::Result<Vec<Assignment>> {
        let mut out: Vec<Assignment> = Vec::new();
        let text = [
            ("uuid", self.uuid),
            ("name", self.name),
            ("gender", self.gender),
            ("age", self.age),
            ("education", self.education),
            ("location", self.location),
            ("expectation", self.expectation),
            ("detail_link", self.detail_link),
        ];
        for (column, value) in text {
            if let Some(v) = value {
                out.push((column, v.into()));
            }
        }
        if let Some(v) = self.education_detail {
            out.push(("education_detail", serde_json::to_value(v)?.into()));
        }
        if let Some(v) = self.skills {
            out.push(("skills", serde_json::to_value(v)?.into()));
        }
        if let Some(v) = self.work_experiences {
            out.push(("work_experiences", serde_json::to_value(v)?.into()));
        }
        if let Some(v) = self.detail_extracted {
            out.push(("detail_extracted", v.into()));
        }
        if let Some(v) = self.extract_time {
            out.push(("extract_time", v.into()));
        }
        Ok(out)
    }
}
