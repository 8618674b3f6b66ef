use axum::http::{HeaderMap, HeaderValue};
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

pub const TOTAL_COUNT: &str = "x-total-count";

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Pagination {
    /// `(skip, limit)` with negatives floored at zero and limit capped.
    pub fn window(self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(0, MAX_LIMIT))
    }
}

pub fn total_count_header(total: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT, HeaderValue::from(total));
    headers
}
