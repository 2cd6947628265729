//! Result shaping for untrusted paging and ordering parameters.
//!
//! Callers hand over raw strings from a query string; the shaper parses them
//! leniently, resolves sort fields against the entity's whitelist, and turns
//! them into LIMIT/OFFSET/ORDER BY on a query descriptor. Bad input degrades
//! to defaults instead of failing the request.

pub mod order;
pub mod shape;
pub mod types;

pub use order::{parse_order_clauses, resolve_column};
pub use shape::{shape, shape_and_fetch};
pub use types::{OrderClause, PageParams, SortDirection};
