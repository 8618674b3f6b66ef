use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

/// A value that can be bound into a generated statement.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Json(serde_json::Value),
    Timestamp(OffsetDateTime),
}

impl SqlValue {
    pub(crate) fn push_bind(self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            SqlValue::Bool(v) => qb.push_bind(v),
            SqlValue::Int(v) => qb.push_bind(v),
            SqlValue::Text(v) => qb.push_bind(v),
            SqlValue::Json(v) => qb.push_bind(v),
            SqlValue::Timestamp(v) => qb.push_bind(v),
        };
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl From<OffsetDateTime> for SqlValue {
    fn from(v: OffsetDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// One `column = value` pair of an INSERT or UPDATE.
pub type Assignment = (&'static str, SqlValue);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cmp {
    Eq,
    Ge,
    Le,
}

impl Cmp {
    fn as_sql(self) -> &'static str {
        match self {
            Cmp::Eq => " = ",
            Cmp::Ge => " >= ",
            Cmp::Le => " <= ",
        }
    }
}

/// Extra predicate ANDed onto the implicit `status = TRUE`.
///
/// Column names are `'static` so they can only come from code, never from
/// request input.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    column: &'static str,
    cmp: Cmp,
    value: SqlValue,
}

impl Filter {
    fn new(column: &'static str, cmp: Cmp, value: impl Into<SqlValue>) -> Self {
        Self {
            column,
            cmp,
            value: value.into(),
        }
    }

    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::new(column, Cmp::Eq, value)
    }

    pub fn ge(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::new(column, Cmp::Ge, value)
    }

    pub fn le(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::new(column, Cmp::Le, value)
    }

    /// Appends ` AND <column> <op> $n` for each filter.
    pub(crate) fn push_all(filters: &[Filter], qb: &mut QueryBuilder<'static, Postgres>) {
        for f in filters {
            qb.push(" AND ").push(f.column).push(f.cmp.as_sql());
            f.value.clone().push_bind(qb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_render_in_order_with_numbered_placeholders() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t WHERE status = TRUE");
        let filters = [
            Filter::eq("uuid", "abc"),
            Filter::ge("id", 10_i64),
            Filter::eq("detail_extracted", false),
            Filter::le("id", 20_i64),
        ];
        Filter::push_all(&filters, &mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM t WHERE status = TRUE AND uuid = $1 AND id >= $2 \
             AND detail_extracted = $3 AND id <= $4"
        );
    }

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(SqlValue::from("x"), SqlValue::Text("x".into()));
        assert_eq!(SqlValue::from(7_i64), SqlValue::Int(7));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
        assert_eq!(
            SqlValue::from(serde_json::json!(["rust"])),
            SqlValue::Json(serde_json::json!(["rust"]))
        );
    }
}
