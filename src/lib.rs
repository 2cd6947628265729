//! Generic Postgres data-access layer: a typed repository with a
//! state-driven transactional save path, batch and high-volume bulk
//! operations, and a lenient result shaper for untrusted paging input.
//!
//! Entities declare their store mapping at compile time through the
//! [`Entity`] trait; the repository renders SQL from that mapping and holds
//! exactly one transaction per mutating call. See `database::repository` for
//! the save contract and `shaper` for the paging rules.

pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod result;
pub mod shaper;

#[cfg(test)]
pub mod testing;

pub use database::{ChangeSet, Predicate, Query, Repository, StagedOp, StoreManager};
pub use entity::{AuditFields, Entity, PendingOp};
pub use error::RepositoryError;
pub use result::{OperationResult, OperationResultOf};
pub use shaper::{PageParams, SortDirection};
