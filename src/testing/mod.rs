//! Fixtures shared by the unit tests.

use serde_json::Value;

use crate::entity::{AuditFields, Entity, PendingOp};

/// Minimal entity used to exercise SQL rendering without a live store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TestUser {
    pub id: Option<i64>,
    pub user_name: String,
    pub email: String,
    #[sqlx(flatten)]
    pub audit: AuditFields,
    #[sqlx(skip)]
    pub pending: Option<PendingOp>,
}

impl TestUser {
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

impl Entity for TestUser {
    fn table_name() -> &'static str {
        "test_users"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_slices_stay_parallel() {
        let user = TestUser::new("a", "a@b.com");
        assert_eq!(TestUser::columns().len(), TestUser::column_types().len());
        assert_eq!(user.values().len(), TestUser::columns().len());
    }
}
