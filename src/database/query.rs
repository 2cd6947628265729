use std::marker::PhantomData;
use std::time::Instant;

use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{FromRow, PgPool, Row};

use crate::database::predicate::{quote_identifier, Predicate};
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::shaper::types::SortDirection;

/// Rendered statement text plus its bind values.
#[derive(Debug, Clone)]
pub struct SqlText {
    pub query: String,
    pub params: Vec<Value>,
}

/// An unmaterialized, composable SELECT over an entity's table.
///
/// Nothing touches the store until one of the terminal `fetch_*`/`count`
/// calls runs. Descriptors are request-scoped: build, compose, execute,
/// discard.
pub struct Query<T> {
    predicate: Option<Predicate>,
    order: Vec<(&'static str, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    _marker: PhantomData<T>,
}

impl<T: Entity> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Query<T> {
    pub fn new() -> Self {
        Self {
            predicate: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Append an order clause. The column must be one of the entity's
    /// declared columns; the shaper only ever passes canonical names from
    /// `Entity::sortable_columns()`.
    pub fn order_by(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.order.push((column, direction));
        self
    }

    /// Skip the first `n` rows. Negative values clamp to zero.
    pub fn skip(mut self, n: i64) -> Self {
        self.offset = Some(n.max(0));
        self
    }

    /// Bound the result to `n` rows.
    pub fn take(mut self, n: i64) -> Self {
        self.limit = Some(n.max(0));
        self
    }

    pub fn to_sql(&self) -> Result<SqlText, RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let mut query = format!("SELECT * FROM {table}");
        let mut params = Vec::new();

        if let Some(predicate) = &self.predicate {
            let (clause, values) = predicate.to_sql(1)?;
            if !clause.is_empty() {
                query.push_str(&format!(" WHERE {clause}"));
                params = values;
            }
        }

        if !self.order.is_empty() {
            let mut clauses = Vec::with_capacity(self.order.len());
            for (column, direction) in &self.order {
                clauses.push(format!("{} {}", quote_identifier(column)?, direction.to_sql()));
            }
            query.push_str(&format!(" ORDER BY {}", clauses.join(", ")));
        }

        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            query.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(SqlText { query, params })
    }

    fn count_sql(&self) -> Result<SqlText, RepositoryError> {
        let table = quote_identifier(T::table_name())?;
        let mut query = format!("SELECT COUNT(*) AS count FROM {table}");
        let mut params = Vec::new();

        if let Some(predicate) = &self.predicate {
            let (clause, values) = predicate.to_sql(1)?;
            if !clause.is_empty() {
                query.push_str(&format!(" WHERE {clause}"));
                params = values;
            }
        }

        Ok(SqlText { query, params })
    }

    /// Execute and materialize every matching row.
    pub async fn fetch_all(self, pool: &PgPool) -> Result<Vec<T>, RepositoryError> {
        let sql = self.to_sql()?;
        log_query(&sql);
        let mut q = sqlx::query_as::<_, T>(&sql.query);
        for param in &sql.params {
            q = bind_value_as(q, param);
        }
        let started = Instant::now();
        let rows = q.fetch_all(pool).await?;
        warn_if_slow(&sql.query, started);
        Ok(rows)
    }

    pub async fn fetch_optional(self, pool: &PgPool) -> Result<Option<T>, RepositoryError> {
        let sql = self.to_sql()?;
        log_query(&sql);
        let mut q = sqlx::query_as::<_, T>(&sql.query);
        for param in &sql.params {
            q = bind_value_as(q, param);
        }
        let started = Instant::now();
        let row = q.fetch_optional(pool).await?;
        warn_if_slow(&sql.query, started);
        Ok(row)
    }

    pub async fn fetch_one(self, pool: &PgPool) -> Result<T, RepositoryError> {
        match self.fetch_optional(pool).await? {
            Some(row) => Ok(row),
            None => Err(RepositoryError::NotFound("Record not found".to_string())),
        }
    }

    /// Row count for the descriptor's predicate; order and pagination are
    /// not meaningful here and are ignored.
    pub async fn count(self, pool: &PgPool) -> Result<i64, RepositoryError> {
        let sql = self.count_sql()?;
        log_query(&sql);
        let mut q = sqlx::query(&sql.query);
        for param in &sql.params {
            q = bind_value(q, param);
        }
        let started = Instant::now();
        let row = q.fetch_one(pool).await?;
        warn_if_slow(&sql.query, started);
        Ok(row.try_get("count")?)
    }
}

fn log_query(sql: &SqlText) {
    if crate::config::config().database.enable_query_logging {
        tracing::debug!(query = %sql.query, params = sql.params.len(), "executing query");
    }
}

fn warn_if_slow(query: &str, started: Instant) {
    let db = &crate::config::config().database;
    if db.enable_slow_query_warning {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > db.slow_query_threshold_ms {
            tracing::warn!(query = %query, elapsed_ms, "slow query");
        }
    }
}

/// Bind a uniform JSON value onto a plain query by its runtime type.
pub(crate) fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays and objects bind as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

pub(crate) fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
