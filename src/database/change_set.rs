use sqlx::{Postgres, Transaction};

use crate::database::repository::Repository;
use crate::database::writes;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::result::{messages, OperationResultOf};

/// An explicit staged mutation: the intended operation travels with the
/// entity instead of riding on a mutable marker field.
#[derive(Debug)]
pub enum StagedOp<T> {
    Insert(T),
    Update(T),
    Delete(T),
}

/// An owned buffer of staged mutations, applied atomically by
/// [`Repository::save_change_set`]. This is the tagged-command counterpart
/// to the marker-driven save path: nothing here can go stale because the
/// operation is fixed at staging time.
#[derive(Debug, Default)]
pub struct ChangeSet<T> {
    ops: Vec<StagedOp<T>>,
}

impl<T: Entity> ChangeSet<T> {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn add(&mut self, entity: T) -> &mut Self {
        self.ops.push(StagedOp::Insert(entity));
        self
    }

    pub fn update(&mut self, entity: T) -> &mut Self {
        self.ops.push(StagedOp::Update(entity));
        self
    }

    pub fn delete(&mut self, entity: T) -> &mut Self {
        self.ops.push(StagedOp::Delete(entity));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl<T: Entity> Repository<T> {
    /// Apply every staged operation in one transaction. On success the
    /// entities come back in staging order with inserted ids assigned; a
    /// change set whose every update matches its persisted row reports the
    /// no-change success. Any failure rolls back the whole set.
    pub async fn save_change_set(&self, change_set: ChangeSet<T>) -> OperationResultOf<Vec<T>> {
        if change_set.is_empty() {
            return OperationResultOf::failure(messages::NO_CLIENT_DATA);
        }
        match self.apply_change_set(change_set).await {
            Ok((entities, 0)) => {
                OperationResultOf::success(messages::NO_CHANGES_DETECTED, entities)
            }
            Ok((entities, _)) => {
                OperationResultOf::success(messages::SUCCESSFUL_SAVE_CHANGES, entities)
            }
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "change set failed, rolled back");
                OperationResultOf::failure(err.to_string())
            }
        }
    }

    async fn apply_change_set(
        &self,
        change_set: ChangeSet<T>,
    ) -> Result<(Vec<T>, usize), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut writes = 0usize;
        let mut entities = Vec::with_capacity(change_set.ops.len());
        for op in change_set.ops {
            let entity = apply_staged(&mut tx, op, &mut writes).await?;
            entities.push(entity);
        }
        if writes == 0 {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }
        Ok((entities, writes))
    }
}

async fn apply_staged<T: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    op: StagedOp<T>,
    writes: &mut usize,
) -> Result<T, RepositoryError> {
    match op {
        StagedOp::Insert(mut entity) => {
            writes::insert_row(tx, &mut entity).await?;
            *writes += 1;
            Ok(entity)
        }
        StagedOp::Update(entity) => {
            let id = writes::require_id(&entity)?;
            match writes::persisted_values::<T>(tx, id).await? {
                Some(current) if current == entity.values() => Ok(entity),
                _ => {
                    writes::update_row(tx, &entity).await?;
                    *writes += 1;
                    Ok(entity)
                }
            }
        }
        StagedOp::Delete(entity) => {
            writes::delete_row(tx, &entity).await?;
            *writes += 1;
            Ok(entity)
        }
    }
}
