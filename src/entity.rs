use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// Pending-operation marker: declares what the next save should do with the
/// instance that carries it. Defaults to `Insert` for freshly built entities.
///
/// The marker is transient. Carrying fields are annotated `#[sqlx(skip)]`
/// so rows read back from the store materialize with no pending operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PendingOp {
    #[default]
    Insert,
    Update,
    Delete,
}

/// Audit columns shared by every persisted entity. Embed with
/// `#[sqlx(flatten)]` and list the columns in the entity's mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub is_active: bool,
}

impl Default for AuditFields {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            created_by: None,
            updated_at: None,
            updated_by: None,
            is_active: true,
        }
    }
}

impl AuditFields {
    pub const COLUMNS: &'static [&'static str] =
        &["created_at", "created_by", "updated_at", "updated_by", "is_active"];

    pub const COLUMN_TYPES: &'static [&'static str] =
        &["timestamptz", "text", "timestamptz", "text", "boolean"];

    /// Record a modification by the given actor.
    pub fn touch(&mut self, actor: Option<&str>) {
        self.updated_at = Some(Utc::now());
        self.updated_by = actor.map(str::to_string);
    }

    /// Column values in `COLUMNS` order, in the uniform JSON representation.
    /// Timestamps are rendered at microsecond precision, matching what the
    /// store persists, so a written value compares equal after a round trip.
    pub fn values(&self) -> Vec<Value> {
        vec![
            Value::String(render_timestamp(self.created_at)),
            opt_string(&self.created_by),
            self.updated_at
                .map(|t| Value::String(render_timestamp(t)))
                .unwrap_or(Value::Null),
            opt_string(&self.updated_by),
            Value::Bool(self.is_active),
        ]
    }
}

fn opt_string(v: &Option<String>) -> Value {
    v.as_ref().map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}

fn render_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A persistable entity with an explicit compile-time store mapping.
///
/// Implementors declare their table and columns up front; no runtime metadata
/// inspection happens anywhere in the crate. `columns()`, `column_types()` and
/// `values()` are parallel slices/vectors describing every persisted column
/// except the surrogate id.
///
/// # Example
///
/// ```ignore
/// impl Entity for Account {
///     fn table_name() -> &'static str { "accounts" }
///     fn columns() -> &'static [&'static str] { &["user_name", "email", /* audit */] }
///     fn column_types() -> &'static [&'static str] { &["text", "text", /* audit */] }
///     fn id(&self) -> Option<i64> { self.id }
///     fn set_id(&mut self, id: i64) { self.id = Some(id); }
///     fn values(&self) -> Vec<Value> { /* parallel to columns() */ }
///     fn pending_op(&self) -> Option<PendingOp> { self.pending }
/// }
/// ```
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    fn table_name() -> &'static str;

    fn id_column() -> &'static str {
        "id"
    }

    /// Persisted columns, excluding the id.
    fn columns() -> &'static [&'static str];

    /// Postgres type name per column, parallel to `columns()`. Used to cast
    /// uniformly-bound parameters in write statements.
    fn column_types() -> &'static [&'static str];

    /// Columns a caller may order by through the result shaper. Anything not
    /// listed here is silently ignored when it arrives in an order clause.
    fn sortable_columns() -> &'static [&'static str] {
        Self::columns()
    }

    /// Surrogate key; `None` until assigned by the store.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Current field values parallel to `columns()`. Timestamps are RFC 3339
    /// strings; the same representation is used for binding and for change
    /// detection, so it must be stable for a given entity state.
    fn values(&self) -> Vec<Value>;

    /// The pending-operation marker, or `None` when the instance carries no
    /// usable state (e.g. it was just read back from the store). Saving an
    /// instance without a marker is a schema violation, never a silent no-op.
    fn pending_op(&self) -> Option<PendingOp>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_defaults() {
        let audit = AuditFields::default();
        assert!(audit.is_active);
        assert!(audit.created_by.is_none());
        assert!(audit.updated_at.is_none());
    }

    #[test]
    fn touch_records_actor_and_time() {
        let mut audit = AuditFields::default();
        audit.touch(Some("ops"));
        assert_eq!(audit.updated_by.as_deref(), Some("ops"));
        assert!(audit.updated_at.is_some());
    }

    #[test]
    fn audit_values_parallel_columns() {
        let audit = AuditFields::default();
        assert_eq!(audit.values().len(), AuditFields::COLUMNS.len());
        assert_eq!(AuditFields::COLUMNS.len(), AuditFields::COLUMN_TYPES.len());
    }

    #[test]
    fn pending_op_defaults_to_insert() {
        assert_eq!(PendingOp::default(), PendingOp::Insert);
    }
}
