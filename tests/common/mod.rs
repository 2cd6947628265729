//! Shared fixtures for the integration suite.
//!
//! Every test here needs a live Postgres at `DATABASE_URL`. When the
//! variable is unset the suite skips itself instead of failing, so the unit
//! tests stay runnable without infrastructure.

use serde_json::Value;
use sqlx::PgPool;

use rowstate::database::StoreManager;
use rowstate::entity::{AuditFields, Entity, PendingOp};
use rowstate::Repository;

/// Entity backing the integration tests, persisted to a scratch table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Option<i64>,
    pub user_name: String,
    pub email: String,
    #[sqlx(flatten)]
    pub audit: AuditFields,
    #[sqlx(skip)]
    pub pending: Option<PendingOp>,
}

impl Account {
    pub fn new(user_name: &str, email: &str) -> Self {
        Self {
            id: None,
            user_name: user_name.to_string(),
            email: email.to_string(),
            audit: AuditFields::default(),
            pending: Some(PendingOp::Insert),
        }
    }
}

impl Entity for Account {
    fn table_name() -> &'static str {
        "rowstate_accounts"
    }

    fn columns() -> &'static [&'static str] {
        &[
            "user_name",
            "email",
            "created_at",
            "created_by",
            "updated_at",
            "updated_by",
            "is_active",
        ]
    }

    fn column_types() -> &'static [&'static str] {
        &[
            "text",
            "text",
            "timestamptz",
            "text",
            "timestamptz",
            "text",
            "boolean",
        ]
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        let mut values = vec![
            Value::String(self.user_name.clone()),
            Value::String(self.email.clone()),
        ];
        values.extend(self.audit.values());
        values
    }

    fn pending_op(&self) -> Option<PendingOp> {
        self.pending
    }
}

/// Entity with a JSONB column, exercising the non-scalar bind path.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: Option<i64>,
    pub email: String,
    pub tags: Value,
    #[sqlx(skip)]
    pub pending: Option<PendingOp>,
}

impl Profile {
    pub fn new(email: &str, tags: Value) -> Self {
        Self {
            id: None,
            email: email.to_string(),
            tags,
            pending: Some(PendingOp::Insert),
        }
    }
}

impl Entity for Profile {
    fn table_name() -> &'static str {
        "rowstate_profiles"
    }

    fn columns() -> &'static [&'static str] {
        &["email", "tags"]
    }

    fn column_types() -> &'static [&'static str] {
        &["text", "jsonb"]
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::String(self.email.clone()), self.tags.clone()]
    }

    fn pending_op(&self) -> Option<PendingOp> {
        self.pending
    }
}

/// Connect and prepare the scratch tables, or `None` when no store is
/// configured.
pub async fn setup() -> anyhow::Result<Option<Repository<Account>>> {
    Ok(connect().await?.map(Repository::new))
}

pub async fn setup_profiles() -> anyhow::Result<Option<Repository<Profile>>> {
    Ok(connect().await?.map(Repository::new))
}

async fn connect() -> anyhow::Result<Option<PgPool>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return Ok(None);
    }
    let pool = StoreManager::pool().await?;
    ensure_tables(&pool).await?;
    Ok(Some(pool))
}

async fn ensure_tables(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rowstate_accounts (
            id BIGSERIAL PRIMARY KEY,
            user_name TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            created_by TEXT,
            updated_at TIMESTAMPTZ,
            updated_by TEXT,
            is_active BOOLEAN NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rowstate_profiles (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL,
            tags JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Unique suffix so concurrently running tests never collide on data.
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{prefix}-{nanos}")
}
