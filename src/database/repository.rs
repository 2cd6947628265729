use std::marker::PhantomData;

use sqlx::{PgPool, Postgres, Transaction};

use crate::database::predicate::Predicate;
use crate::database::query::Query;
use crate::database::writes;
use crate::entity::{Entity, PendingOp};
use crate::error::RepositoryError;
use crate::result::{messages, OperationResult};

/// Generic repository over a single entity type.
///
/// Reads never open a transaction. Every mutating operation holds exactly one
/// transaction for its whole duration, commits on success, rolls back on any
/// failure, and reports its outcome as an [`OperationResult`] rather than an
/// error. Store faults never escape the repository boundary.
pub struct Repository<T> {
    pub(crate) pool: PgPool,
    pub(crate) _marker: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { pool: self.pool.clone(), _marker: PhantomData }
    }
}

/// What a committed save actually did.
pub(crate) enum SaveOutcome {
    /// Change detection found nothing to write; the transaction was released
    /// without touching the log.
    NoChanges,
    Committed(usize),
}

impl<T: Entity> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _marker: PhantomData }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Unmaterialized query handle for further composition (e.g. by the
    /// result shaper).
    pub fn query(&self) -> Query<T> {
        Query::new()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<T>, RepositoryError> {
        self.query()
            .filter(Predicate::new().eq(T::id_column(), id))
            .fetch_optional(&self.pool)
            .await
    }

    /// First `top` rows in natural order; defaults to 10.
    pub async fn get_all(&self, top: Option<i64>) -> Result<Vec<T>, RepositoryError> {
        self.query().take(top.unwrap_or(10)).fetch_all(&self.pool).await
    }

    pub async fn find(&self, predicate: Predicate) -> Result<Vec<T>, RepositoryError> {
        if predicate.is_empty() {
            return Err(RepositoryError::validation("Predicate must not be empty"));
        }
        self.query().filter(predicate).fetch_all(&self.pool).await
    }

    pub async fn exists(&self, predicate: Predicate) -> Result<bool, RepositoryError> {
        if predicate.is_empty() {
            return Err(RepositoryError::validation("Predicate must not be empty"));
        }
        let count = self.query().filter(predicate).count(&self.pool).await?;
        Ok(count > 0)
    }

    /// Save one entity according to its pending-operation marker, inside one
    /// transaction. An `Update` of a row identical to its persisted state
    /// short-circuits to the `NoChangesDetected` success without writing.
    pub async fn save_changes(&self, entity: &mut T) -> OperationResult {
        match self.apply_pending(std::slice::from_mut(entity)).await {
            Ok(SaveOutcome::NoChanges) => OperationResult::no_changes(),
            Ok(SaveOutcome::Committed(_)) => {
                OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES)
            }
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "save failed, rolled back");
                OperationResult::failure(err.to_string())
            }
        }
    }

    /// Save a batch with per-entity marker dispatch in one shared
    /// transaction. Any entity's failure, including a missing marker,
    /// aborts and rolls back the entire batch.
    pub async fn save_changes_all(&self, entities: &mut [T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure(messages::NO_CLIENT_DATA);
        }
        match self.apply_pending(entities).await {
            Ok(SaveOutcome::NoChanges) => OperationResult::no_changes(),
            Ok(SaveOutcome::Committed(count)) => {
                if crate::config::config().repository.debug_logging {
                    tracing::debug!(table = T::table_name(), count, "batch committed");
                }
                OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES)
            }
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "batch save failed, rolled back");
                OperationResult::failure(err.to_string())
            }
        }
    }

    /// Stage and execute each entity's pending operation. The transaction is
    /// opened before staging; an error anywhere unwinds through `?` and the
    /// dropped transaction rolls back.
    async fn apply_pending(&self, entities: &mut [T]) -> Result<SaveOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut writes = 0usize;
        for entity in entities.iter_mut() {
            if Self::stage_one(&mut tx, entity).await? {
                writes += 1;
            }
        }
        Self::finish(tx, writes).await
    }

    /// Dispatch a single entity by its marker. Returns whether a write was
    /// actually issued.
    pub(crate) async fn stage_one(
        tx: &mut Transaction<'_, Postgres>,
        entity: &mut T,
    ) -> Result<bool, RepositoryError> {
        let op = entity
            .pending_op()
            .ok_or_else(|| RepositoryError::SchemaViolation(std::any::type_name::<T>()))?;
        match op {
            PendingOp::Insert => {
                writes::insert_row(tx, entity).await?;
                Ok(true)
            }
            PendingOp::Update => {
                let id = writes::require_id(entity)?;
                match writes::persisted_values::<T>(tx, id).await? {
                    Some(current) if current == entity.values() => {
                        if crate::config::config().repository.debug_logging {
                            tracing::debug!(
                                table = T::table_name(),
                                id,
                                "update matches persisted state, skipping write"
                            );
                        }
                        Ok(false)
                    }
                    _ => {
                        writes::update_row(tx, entity).await?;
                        Ok(true)
                    }
                }
            }
            PendingOp::Delete => {
                writes::delete_row(tx, entity).await?;
                Ok(true)
            }
        }
    }

    /// Commit when something was written, otherwise release the transaction
    /// untouched and report the no-change outcome.
    pub(crate) async fn finish(
        tx: Transaction<'_, Postgres>,
        writes: usize,
    ) -> Result<SaveOutcome, RepositoryError> {
        if writes == 0 {
            tx.rollback().await?;
            return Ok(SaveOutcome::NoChanges);
        }
        tx.commit().await?;
        Ok(SaveOutcome::Committed(writes))
    }
}
