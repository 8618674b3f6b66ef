use std::marker::PhantomData;

use anyhow::Context;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::value::{Assignment, Filter};

/// A soft-deletable table row.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Selected and returned columns, in `FromRow` order.
    const COLUMNS: &'static [&'static str];
}

/// Create or patch payload; yields only the fields that are present.
pub trait Changeset {
    fn into_assignments(self) -> anyhow::Result<Vec<Assignment>>;
}

/// CRUD accessor for one record type. Each call commits on its own.
pub struct CrudBase<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Default for CrudBase<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CrudBase<R> {
    pub const fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    pub async fn create(&self, db: &PgPool, fields: impl Changeset) -> anyhow::Result<R> {
        let mut qb = Self::insert_query(fields.into_assignments()?);
        debug!(sql = %qb.sql(), table = R::TABLE, "create");
        let row = qb
            .build_query_as::<R>()
            .fetch_one(db)
            .await
            .with_context(|| format!("insert into {}", R::TABLE))?;
        Ok(row)
    }

    pub async fn get(
        &self,
        db: &PgPool,
        id: i64,
        filters: &[Filter],
    ) -> anyhow::Result<Option<R>> {
        let mut qb = Self::select_by_id_query(id, filters);
        debug!(sql = %qb.sql(), table = R::TABLE, id, "get");
        let row = qb
            .build_query_as::<R>()
            .fetch_optional(db)
            .await
            .with_context(|| format!("select {} by id", R::TABLE))?;
        Ok(row)
    }

    pub async fn get_many(
        &self,
        db: &PgPool,
        skip: i64,
        limit: i64,
        filters: &[Filter],
    ) -> anyhow::Result<Vec<R>> {
        let mut qb = Self::select_page_query(skip, limit, filters);
        debug!(sql = %qb.sql(), table = R::TABLE, skip, limit, "get_many");
        let rows = qb
            .build_query_as::<R>()
            .fetch_all(db)
            .await
            .with_context(|| format!("select page of {}", R::TABLE))?;
        Ok(rows)
    }

    /// First active row matching `filters`.
    pub async fn find_one(&self, db: &PgPool, filters: &[Filter]) -> anyhow::Result<Option<R>> {
        let mut rows = self.get_many(db, 0, 1, filters).await?;
        Ok(rows.pop())
    }

    pub async fn update(
        &self,
        db: &PgPool,
        id: i64,
        fields: impl Changeset,
        filters: &[Filter],
    ) -> anyhow::Result<Option<R>> {
        let assignments = fields.into_assignments()?;
        if assignments.is_empty() {
            return self.get(db, id, filters).await;
        }
        let mut qb = Self::update_query(id, assignments, filters);
        debug!(sql = %qb.sql(), table = R::TABLE, id, "update");
        let row = qb
            .build_query_as::<R>()
            .fetch_optional(db)
            .await
            .with_context(|| format!("update {}", R::TABLE))?;
        Ok(row)
    }

    /// Flips `status` to false. Returns the row as it was deactivated.
    pub async fn soft_delete(
        &self,
        db: &PgPool,
        id: i64,
        filters: &[Filter],
    ) -> anyhow::Result<Option<R>> {
        let mut qb = Self::soft_delete_query(id, filters);
        debug!(sql = %qb.sql(), table = R::TABLE, id, "soft_delete");
        let row = qb
            .build_query_as::<R>()
            .fetch_optional(db)
            .await
            .with_context(|| format!("soft delete {}", R::TABLE))?;
        Ok(row)
    }

    /// Physically removes matching rows, active or not.
    pub async fn hard_delete(
        &self,
        db: &PgPool,
        id: i64,
        filters: &[Filter],
    ) -> anyhow::Result<()> {
        let mut qb = Self::hard_delete_query(id, filters);
        debug!(sql = %qb.sql(), table = R::TABLE, id, "hard_delete");
        let done = qb
            .build()
            .execute(db)
            .await
            .with_context(|| format!("delete from {}", R::TABLE))?;
        debug!(rows = done.rows_affected(), table = R::TABLE, "hard_delete done");
        Ok(())
    }

    pub async fn count(&self, db: &PgPool, filters: &[Filter]) -> anyhow::Result<i64> {
        let mut qb = Self::count_query(filters);
        let n = qb
            .build_query_scalar::<i64>()
            .fetch_one(db)
            .await
            .with_context(|| format!("count {}", R::TABLE))?;
        Ok(n)
    }

    // ---- statement builders ----

    fn columns() -> String {
        R::COLUMNS.join(", ")
    }

    fn select_active() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE status = TRUE",
            Self::columns(),
            R::TABLE
        ))
    }

    fn insert_query(assignments: Vec<Assignment>) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", R::TABLE));
        let (columns, values): (Vec<_>, Vec<_>) = assignments.into_iter().unzip();
        qb.push(columns.join(", ")).push(") VALUES (");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            value.push_bind(&mut qb);
        }
        qb.push(") RETURNING ").push(Self::columns());
        qb
    }

    fn select_by_id_query(id: i64, filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
        let mut qb = Self::select_active();
        qb.push(" AND id = ").push_bind(id);
        Filter::push_all(filters, &mut qb);
        qb
    }

    fn select_page_query(
        skip: i64,
        limit: i64,
        filters: &[Filter],
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = Self::select_active();
        Filter::push_all(filters, &mut qb);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(skip);
        qb
    }

    fn update_query(
        id: i64,
        assignments: Vec<Assignment>,
        filters: &[Filter],
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", R::TABLE));
        for (column, value) in assignments {
            qb.push(column).push(" = ");
            value.push_bind(&mut qb);
            qb.push(", ");
        }
        qb.push("update_time = now() WHERE status = TRUE AND id = ")
            .push_bind(id);
        Filter::push_all(filters, &mut qb);
        qb.push(" RETURNING ").push(Self::columns());
        qb
    }

    fn soft_delete_query(id: i64, filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET status = FALSE, update_time = now() WHERE status = TRUE AND id = ",
            R::TABLE
        ));
        qb.push_bind(id);
        Filter::push_all(filters, &mut qb);
        qb.push(" RETURNING ").push(Self::columns());
        qb
    }

    fn hard_delete_query(id: i64, filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", R::TABLE));
        qb.push_bind(id);
        Filter::push_all(filters, &mut qb);
        qb
    }

    fn count_query(filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} WHERE status = TRUE",
            R::TABLE
        ));
        Filter::push_all(filters, &mut qb);
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::SqlValue;

    #[derive(Debug, sqlx::FromRow)]
    #[allow(dead_code)]
    struct Widget {
        id: i64,
        label: String,
        status: bool,
    }

    impl Record for Widget {
        const TABLE: &'static str = "widget";
        const COLUMNS: &'static [&'static str] = &["id", "label", "status"];
    }

    type Widgets = CrudBase<Widget>;

    fn label(s: &str) -> Vec<Assignment> {
        vec![("label", SqlValue::from(s))]
    }

    #[test]
    fn insert_lists_present_columns_and_returns_all() {
        let qb = Widgets::insert_query(vec![("label", "a".into()), ("size", 3_i64.into())]);
        assert_eq!(
            qb.sql(),
            "INSERT INTO widget (label, size) VALUES ($1, $2) RETURNING id, label, status"
        );
    }

    #[test]
    fn get_is_scoped_to_active_rows() {
        let qb = Widgets::select_by_id_query(4, &[Filter::eq("label", "x")]);
        assert_eq!(
            qb.sql(),
            "SELECT id, label, status FROM widget WHERE status = TRUE AND id = $1 AND label = $2"
        );
    }

    #[test]
    fn page_is_scoped_to_active_rows_and_ordered() {
        let qb = Widgets::select_page_query(20, 10, &[]);
        assert_eq!(
            qb.sql(),
            "SELECT id, label, status FROM widget WHERE status = TRUE ORDER BY id LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn update_sets_only_given_columns_and_touches_update_time() {
        let qb = Widgets::update_query(9, label("b"), &[]);
        assert_eq!(
            qb.sql(),
            "UPDATE widget SET label = $1, update_time = now() \
             WHERE status = TRUE AND id = $2 RETURNING id, label, status"
        );
    }

    #[test]
    fn soft_delete_only_hits_active_rows() {
        let qb = Widgets::soft_delete_query(9, &[Filter::eq("label", "b")]);
        assert_eq!(
            qb.sql(),
            "UPDATE widget SET status = FALSE, update_time = now() \
             WHERE status = TRUE AND id = $1 AND label = $2 RETURNING id, label, status"
        );
    }

    #[test]
    fn hard_delete_ignores_status() {
        let qb = Widgets::hard_delete_query(9, &[]);
        assert_eq!(qb.sql(), "DELETE FROM widget WHERE id = $1");
        assert!(!qb.sql().contains("status"));
    }

    #[test]
    fn count_is_scoped_to_active_rows() {
        let qb = Widgets::count_query(&[Filter::ge("id", 2_i64)]);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM widget WHERE status = TRUE AND id >= $1"
        );
    }
}
