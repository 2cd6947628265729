pub mod bulk;
pub mod change_set;
pub mod manager;
pub mod predicate;
pub mod query;
pub mod repository;
pub mod writes;

pub use bulk::BATCH_SIZE;
pub use change_set::{ChangeSet, StagedOp};
pub use manager::StoreManager;
pub use predicate::Predicate;
pub use query::{Query, SqlText};
pub use repository::Repository;
