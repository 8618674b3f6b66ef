//! Generic CRUD access over soft-deletable tables.
//!
//! Every table handled here carries `id`, `status`, `create_time` and
//! `update_time`. Reads only ever see rows with `status = TRUE`.

mod base;
mod value;

pub use base::{Changeset, CrudBase, Record};
pub use value::{Assignment, Filter, SqlValue};
