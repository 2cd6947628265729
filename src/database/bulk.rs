use serde_json::Value;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, Row};

use crate::database::predicate::{quote_identifier, Predicate};
use crate::database::query::bind_value;
use crate::database::repository::Repository;
use crate::database::writes;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::result::{messages, OperationResult};

/// Rows per statement in the high-volume bulk tier.
pub const BATCH_SIZE: usize = 5000;

/// Postgres caps bind parameters per statement at u16::MAX.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Effective rows per statement: the fixed batch size, reduced for wide
/// entities so the bind-parameter cap is never hit. One extra parameter per
/// row accounts for the id.
fn rows_per_statement(column_count: usize) -> usize {
    BATCH_SIZE.min(MAX_BIND_PARAMS / (column_count + 1)).max(1)
}

/// Push one uniform value into a VALUES tuple with an explicit cast to the
/// column's declared type, so multi-row statements never depend on Postgres
/// type inference.
fn push_cast_value<Sep: std::fmt::Display>(
    b: &mut Separated<'_, '_, Postgres, Sep>,
    value: Value,
    ty: &str,
) {
    match value {
        Value::Null => {
            b.push(format!("NULL::{ty}"));
        }
        Value::Bool(x) => {
            b.push_bind(x);
            b.push_unseparated(format!("::{ty}"));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                b.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                b.push_bind(f);
            } else {
                b.push_bind(n.to_string());
            }
            b.push_unseparated(format!("::{ty}"));
        }
        Value::String(s) => {
            b.push_bind(s);
            b.push_unseparated(format!("::{ty}"));
        }
        other => {
            b.push_bind(other);
            b.push_unseparated(format!("::{ty}"));
        }
    }
}

impl<T: Entity> Repository<T> {
    /// Insert a moderate-volume collection through the standard row path,
    /// all rows in one transaction. Assigned ids are written back.
    pub async fn bulk_insert(&self, entities: &mut [T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk insert.");
        }
        match self.bulk_insert_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES),
            Err(err) => OperationResult::failure(format!("Bulk insert error: {err}")),
        }
    }

    pub async fn bulk_update(&self, entities: &[T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk update.");
        }
        match self.bulk_update_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES),
            Err(err) => OperationResult::failure(format!("Bulk update error: {err}")),
        }
    }

    pub async fn bulk_delete(&self, entities: &[T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk delete.");
        }
        match self.bulk_delete_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_DELETE),
            Err(err) => OperationResult::failure(format!("Bulk delete error: {err}")),
        }
    }

    /// Set-based delete by predicate. Zero affected rows is reported as a
    /// failure, matching the single-row delete contract.
    pub async fn bulk_delete_where(&self, predicate: Predicate) -> OperationResult {
        if predicate.is_empty() {
            return OperationResult::failure("Predicate must not be empty.");
        }
        match self.bulk_delete_where_inner(predicate).await {
            Ok(0) => OperationResult::failure(messages::NO_RECORDS_TO_DELETE),
            Ok(_) => OperationResult::success(messages::SUCCESSFUL_DELETE),
            Err(err) => OperationResult::failure(format!("Bulk delete error: {err}")),
        }
    }

    /// High-volume insert: multi-row VALUES statements of at most
    /// [`BATCH_SIZE`] rows, one transaction for the whole call. Insertion
    /// order is preserved and assigned ids are written back batch by batch.
    pub async fn super_bulk_insert(&self, entities: &mut [T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk insert.");
        }
        match self.super_insert_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES),
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "super bulk insert rolled back");
                OperationResult::failure(format!("Super bulk insert error: {err}"))
            }
        }
    }

    /// High-volume update via `UPDATE ... FROM (VALUES ...)` joins, batched
    /// like [`Repository::super_bulk_insert`]. Row order is not meaningful.
    pub async fn super_bulk_update(&self, entities: &[T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk update.");
        }
        match self.super_update_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES),
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "super bulk update rolled back");
                OperationResult::failure(format!("Super bulk update error: {err}"))
            }
        }
    }

    pub async fn super_bulk_delete(&self, entities: &[T]) -> OperationResult {
        if entities.is_empty() {
            return OperationResult::failure("No entities provided for bulk delete.");
        }
        match self.super_delete_inner(entities).await {
            Ok(()) => OperationResult::success(messages::SUCCESSFUL_DELETE),
            Err(err) => {
                tracing::error!(table = T::table_name(), error = %err, "super bulk delete rolled back");
                OperationResult::failure(format!("Super bulk delete error: {err}"))
            }
        }
    }

    async fn bulk_insert_inner(&self, entities: &mut [T]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for entity in entities.iter_mut() {
            writes::insert_row(&mut tx, entity).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn bulk_update_inner(&self, entities: &[T]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for entity in entities {
            writes::update_row(&mut tx, entity).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn bulk_delete_inner(&self, entities: &[T]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for entity in entities {
            writes::delete_row(&mut tx, entity).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn bulk_delete_where_inner(&self, predicate: Predicate) -> Result<u64, RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let (clause, params) = predicate.to_sql(1)?;
        let sql = format!("DELETE FROM {table} WHERE {clause}");
        let mut q = sqlx::query(&sql);
        for param in &params {
            q = bind_value(q, param);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn super_insert_inner(&self, entities: &mut [T]) -> Result<(), RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let id_col = quote_identifier(T::id_column())?;
        let columns = writes::column_list::<T>()?;
        let batch = rows_per_statement(T::columns().len());

        let mut tx = self.pool.begin().await?;
        for chunk in entities.chunks_mut(batch) {
            let mut qb = sqlx::QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {table} ({columns}) "
            ));
            qb.push_values(chunk.iter(), |mut b, entity| {
                for (value, ty) in entity.values().into_iter().zip(T::column_types()) {
                    push_cast_value(&mut b, value, ty);
                }
            });
            qb.push(format!(" RETURNING {id_col}"));

            // Postgres emits RETURNING rows in VALUES order for a plain
            // multi-row INSERT; the SQL standard does not promise this, so
            // any move away from a plain VALUES insert must add an explicit
            // ordinal to order by.
            let rows = qb.build().fetch_all(&mut *tx).await?;
            for (entity, row) in chunk.iter_mut().zip(rows) {
                entity.set_id(row.try_get(T::id_column())?);
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn super_update_inner(&self, entities: &[T]) -> Result<(), RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let id_col = quote_identifier(T::id_column())?;
        let batch = rows_per_statement(T::columns().len());

        let set_list = T::columns()
            .iter()
            .map(|c| {
                let col = quote_identifier(c)?;
                Ok(format!("{col} = v.{col}"))
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?
            .join(", ");
        let value_columns = format!("{id_col}, {}", writes::column_list::<T>()?);

        // Ids are required up front so a single bad row fails the call
        // before the transaction opens.
        let rows: Vec<(i64, Vec<Value>)> = entities
            .iter()
            .map(|e| Ok((writes::require_id(e)?, e.values())))
            .collect::<Result<_, RepositoryError>>()?;

        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(batch) {
            let mut qb = sqlx::QueryBuilder::<Postgres>::new(format!(
                "UPDATE {table} AS t SET {set_list} FROM ("
            ));
            qb.push_values(chunk.iter(), |mut b, (id, values)| {
                b.push_bind(*id);
                b.push_unseparated("::bigint");
                for (value, ty) in values.iter().zip(T::column_types()) {
                    push_cast_value(&mut b, value.clone(), ty);
                }
            });
            qb.push(format!(
                ") AS v({value_columns}) WHERE t.{id_col} = v.{id_col}"
            ));
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn super_delete_inner(&self, entities: &[T]) -> Result<(), RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let id_col = quote_identifier(T::id_column())?;
        let ids: Vec<i64> = entities
            .iter()
            .map(writes::require_id)
            .collect::<Result<_, _>>()?;

        let sql = format!("DELETE FROM {table} WHERE {id_col} = ANY($1)");
        let mut tx = self.pool.begin().await?;
        for chunk in ids.chunks(BATCH_SIZE) {
            sqlx::query(&sql).bind(chunk.to_vec()).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
