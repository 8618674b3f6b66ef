use sqlx::PgPool;

use crate::candidates::repo_types::Candidate;
use crate::crud::{CrudBase, Filter};

pub static CANDIDATES: CrudBase<Candidate> = CrudBase::new();

impl Candidate {
    pub async fn find_active_by_uuid(
        db: &PgPool,
        uuid: &str,
    ) -> anyhow::Result<Option<Candidate>> {
        CANDIDATES.find_one(db, &[Filter::eq("uuid", uuid)]).await
    }
}
