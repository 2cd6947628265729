use serde_json::Value;

use crate::error::RepositoryError;

/// A typed, conjunctive filter over an entity's columns.
///
/// Conditions compose with AND; generated SQL uses `$n` placeholders and the
/// uniform JSON value representation for binds. Column names are validated
/// against a conservative identifier pattern before they reach SQL.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Like(String, String),
    In(String, Vec<Value>),
    IsNull(String),
    NotNull(String),
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Ne(column.to_string(), value.into()));
        self
    }

    pub fn gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gt(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lt(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lte(column.to_string(), value.into()));
        self
    }

    pub fn like(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.conditions.push(Condition::Like(column.to_string(), pattern.into()));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In(column.to_string(), values));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::NotNull(column.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render the WHERE body (no `WHERE` keyword) with placeholders starting
    /// at `start`, returning the clause and its bind values. Callers splice
    /// the clause into a larger statement.
    pub(crate) fn to_sql(&self, start: usize) -> Result<(String, Vec<Value>), RepositoryError> {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();
        let mut idx = start;

        for cond in &self.conditions {
            match cond {
                Condition::Eq(col, val) => {
                    clauses.push(format!("{} = ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Ne(col, val) => {
                    clauses.push(format!("{} != ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Gt(col, val) => {
                    clauses.push(format!("{} > ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Gte(col, val) => {
                    clauses.push(format!("{} >= ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Lt(col, val) => {
                    clauses.push(format!("{} < ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Lte(col, val) => {
                    clauses.push(format!("{} <= ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(val.clone());
                }
                Condition::Like(col, pattern) => {
                    clauses.push(format!("{} LIKE ${idx}", quote_identifier(col)?));
                    idx += 1;
                    params.push(Value::String(pattern.clone()));
                }
                Condition::In(col, values) => {
                    if values.is_empty() {
                        return Err(RepositoryError::validation(
                            "IN condition requires at least one value",
                        ));
                    }
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|_| {
                            let p = format!("${idx}");
                            idx += 1;
                            p
                        })
                        .collect();
                    clauses.push(format!(
                        "{} IN ({})",
                        quote_identifier(col)?,
                        placeholders.join(", ")
                    ));
                    params.extend(values.iter().cloned());
                }
                Condition::IsNull(col) => {
                    clauses.push(format!("{} IS NULL", quote_identifier(col)?));
                }
                Condition::NotNull(col) => {
                    clauses.push(format!("{} IS NOT NULL", quote_identifier(col)?));
                }
            }
        }

        Ok((clauses.join(" AND "), params))
    }
}

/// Validate and quote an identifier for direct inclusion in SQL.
pub(crate) fn quote_identifier(name: &str) -> Result<String, RepositoryError> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

pub(crate) fn validate_identifier(name: &str) -> Result<(), RepositoryError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RepositoryError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_conjunctive_clauses_with_placeholders() {
        let (sql, params) = Predicate::new()
            .eq("user_name", "alice")
            .gt("id", 5)
            .to_sql(1)
            .unwrap();
        assert_eq!(sql, "\"user_name\" = $1 AND \"id\" > $2");
        assert_eq!(params, vec![json!("alice"), json!(5)]);
    }

    #[test]
    fn respects_start_index() {
        let (sql, _) = Predicate::new().eq("email", "a@b.com").to_sql(4).unwrap();
        assert_eq!(sql, "\"email\" = $4");
    }

    #[test]
    fn expands_in_lists() {
        let (sql, params) = Predicate::new()
            .is_in("id", vec![json!(1), json!(2), json!(3)])
            .to_sql(1)
            .unwrap();
        assert_eq!(sql, "\"id\" IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_in_list_is_rejected() {
        let err = Predicate::new().is_in("id", vec![]).to_sql(1).unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[test]
    fn null_checks_bind_nothing() {
        let (sql, params) = Predicate::new()
            .is_null("updated_at")
            .not_null("created_by")
            .to_sql(1)
            .unwrap();
        assert_eq!(sql, "\"updated_at\" IS NULL AND \"created_by\" IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_hostile_column_names() {
        let err = Predicate::new()
            .eq("name\"; DROP TABLE users; --", "x")
            .to_sql(1)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidIdentifier(_)));
    }
}
