//! Row-level statement builders and executors shared by the save, change-set
//! and bulk paths. All parameters are bound in the uniform JSON
//! representation and cast to the column's declared type in SQL, so every
//! statement is fully parameterized regardless of the entity's shape.

use sqlx::{Postgres, Row, Transaction};

use crate::database::predicate::quote_identifier;
use crate::database::query::bind_value;
use crate::entity::Entity;
use crate::error::RepositoryError;

pub(crate) fn insert_sql<T: Entity>() -> Result<String, RepositoryError> {
    let table = quote_identifier(T::table_name())?;
    let id = quote_identifier(T::id_column())?;
    let columns = column_list::<T>()?;
    let placeholders: Vec<String> = T::column_types()
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("${}::{ty}", i + 1))
        .collect();
    Ok(format!(
        "INSERT INTO {table} ({columns}) VALUES ({}) RETURNING {id}",
        placeholders.join(", ")
    ))
}

pub(crate) fn update_sql<T: Entity>() -> Result<String, RepositoryError> {
    let table = quote_identifier(T::table_name())?;
    let id = quote_identifier(T::id_column())?;
    let assignments: Vec<String> = T::columns()
        .iter()
        .zip(T::column_types())
        .enumerate()
        .map(|(i, (col, ty))| Ok(format!("{} = ${}::{ty}", quote_identifier(col)?, i + 1)))
        .collect::<Result<_, RepositoryError>>()?;
    Ok(format!(
        "UPDATE {table} SET {} WHERE {id} = ${}",
        assignments.join(", "),
        T::columns().len() + 1
    ))
}

pub(crate) fn delete_sql<T: Entity>() -> Result<String, RepositoryError> {
    let table = quote_identifier(T::table_name())?;
    let id = quote_identifier(T::id_column())?;
    Ok(format!("DELETE FROM {table} WHERE {id} = $1"))
}

pub(crate) fn column_list<T: Entity>() -> Result<String, RepositoryError> {
    debug_assert_eq!(T::columns().len(), T::column_types().len());
    let quoted: Vec<String> = T::columns()
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<_, _>>()?;
    Ok(quoted.join(", "))
}

/// Insert one row and write the assigned surrogate key back onto the entity.
pub(crate) async fn insert_row<T: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    entity: &mut T,
) -> Result<(), RepositoryError> {
    let sql = insert_sql::<T>()?;
    let values = entity.values();
    let mut q = sqlx::query(&sql);
    for value in &values {
        q = bind_value(q, value);
    }
    let row = q.fetch_one(&mut **tx).await?;
    entity.set_id(row.try_get(T::id_column())?);
    Ok(())
}

/// Full-row update: every declared column is written (all fields dirty).
pub(crate) async fn update_row<T: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    entity: &T,
) -> Result<(), RepositoryError> {
    let id = require_id(entity)?;
    let sql = update_sql::<T>()?;
    let values = entity.values();
    let mut q = sqlx::query(&sql);
    for value in &values {
        q = bind_value(q, value);
    }
    let result = q.bind(id).execute(&mut **tx).await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!(
            "No row with id {id} in {}",
            T::table_name()
        )));
    }
    Ok(())
}

pub(crate) async fn delete_row<T: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    entity: &T,
) -> Result<(), RepositoryError> {
    let id = require_id(entity)?;
    let sql = delete_sql::<T>()?;
    let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!(
            "No row with id {id} in {}",
            T::table_name()
        )));
    }
    Ok(())
}

/// Read the persisted state of an entity's row inside the transaction, as
/// the uniform value representation. `None` when the row no longer exists.
pub(crate) async fn persisted_values<T: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Vec<serde_json::Value>>, RepositoryError> {
    let table = quote_identifier(T::table_name())?;
    let id_col = quote_identifier(T::id_column())?;
    let sql = format!("SELECT * FROM {table} WHERE {id_col} = $1");
    let current = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(current.map(|row| row.values()))
}

pub(crate) fn require_id<T: Entity>(entity: &T) -> Result<i64, RepositoryError> {
    entity.id().ok_or_else(|| {
        RepositoryError::validation(format!(
            "Entity in {} has no id; it cannot be updated or deleted",
            T::table_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestUser;

    #[test]
    fn insert_statement_casts_and_returns_id() {
        let sql = insert_sql::<TestUser>().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"test_users\" (\"user_name\", \"email\", \"created_at\", \
             \"created_by\", \"updated_at\", \"updated_by\", \"is_active\") \
             VALUES ($1::text, $2::text, $3::timestamptz, $4::text, $5::timestamptz, \
             $6::text, $7::boolean) RETURNING \"id\""
        );
    }

    #[test]
    fn update_statement_writes_every_column() {
        let sql = update_sql::<TestUser>().unwrap();
        assert!(sql.starts_with("UPDATE \"test_users\" SET \"user_name\" = $1::text"));
        assert!(sql.ends_with("WHERE \"id\" = $8"));
    }

    #[test]
    fn delete_statement_targets_id() {
        let sql = delete_sql::<TestUser>().unwrap();
        assert_eq!(sql, "DELETE FROM \"test_users\" WHERE \"id\" = $1");
    }

    #[test]
    fn missing_id_is_a_validation_error() {
        let user = TestUser::new("a", "a@b.com");
        let err = require_id(&user).unwrap_err();
        assert!(matches!(err, crate::error::RepositoryError::Validation(_)));
    }
}
