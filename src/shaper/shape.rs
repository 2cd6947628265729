use sqlx::PgPool;

use crate::config::config;
use crate::database::query::Query;
use crate::entity::Entity;
use crate::error::RepositoryError;
use crate::shaper::order::{parse_order_clauses, resolve_column};
use crate::shaper::types::PageParams;

/// Apply untrusted paging and ordering parameters to a query descriptor.
///
/// Every input is advisory. An unparsable skip falls back to 0, an
/// unparsable or non-positive page size falls back to the configured
/// default, and order clauses naming unknown columns are dropped. Paging is
/// always applied, so a shaped query never returns an unbounded result.
pub fn shape<T: Entity>(query: Query<T>, params: &PageParams) -> Query<T> {
    let shaper = &config().shaper;

    let skip = params
        .skip
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .max(0);

    let mut page_size = params
        .page_size
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(shaper.default_page_size);
    if let Some(max) = shaper.max_page_size {
        if page_size > max {
            if shaper.debug_logging {
                tracing::debug!(requested = page_size, max, "page size capped");
            }
            page_size = max;
        }
    }

    let mut query = query;
    if let Some(raw) = params.order_by.as_deref() {
        for clause in parse_order_clauses(raw) {
            match resolve_column::<T>(&clause.field) {
                Some(column) => {
                    query = query.order_by(column, clause.direction);
                }
                None => {
                    tracing::debug!(
                        table = T::table_name(),
                        field = %clause.field,
                        "unknown sort field, dropping clause"
                    );
                }
            }
        }
    }

    query.skip(skip).take(page_size)
}

/// Shape and execute in one step.
pub async fn shape_and_fetch<T: Entity>(
    query: Query<T>,
    params: &PageParams,
    pool: &PgPool,
) -> Result<Vec<T>, RepositoryError> {
    shape(query, params).fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestUser;

    #[test]
    fn applies_order_and_paging() {
        let params = PageParams::new(Some("0"), Some("2"), Some("UserName desc"));
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(sql
            .query
            .ends_with("ORDER BY \"user_name\" DESC LIMIT 2 OFFSET 0"));
    }

    #[test]
    fn unknown_sort_field_falls_back_to_natural_order() {
        let params = PageParams::new(Some("0"), Some("5"), Some("NoSuchField asc"));
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(!sql.query.contains("ORDER BY"));
        assert!(sql.query.ends_with("LIMIT 5 OFFSET 0"));
    }

    #[test]
    fn unparsable_skip_falls_back_to_zero() {
        let params = PageParams::new(Some("abc"), Some("5"), None);
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(sql.query.ends_with("LIMIT 5 OFFSET 0"));
    }

    #[test]
    fn absent_params_use_defaults() {
        let sql = shape(Query::<TestUser>::new(), &PageParams::default())
            .to_sql()
            .unwrap();
        assert!(sql.query.ends_with("LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn non_positive_page_size_uses_default() {
        let params = PageParams::new(None, Some("-3"), None);
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(sql.query.ends_with("LIMIT 10 OFFSET 0"));

        let params = PageParams::new(None, Some("0"), None);
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(sql.query.ends_with("LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn multiple_order_clauses_survive_shaping() {
        let params = PageParams::new(None, None, Some("UserName asc, CreatedAt desc"));
        let sql = shape(Query::<TestUser>::new(), &params).to_sql().unwrap();
        assert!(sql
            .query
            .contains("ORDER BY \"user_name\" ASC, \"created_at\" DESC"));
    }
}
