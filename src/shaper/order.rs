use crate::entity::Entity;
use crate::shaper::types::{OrderClause, SortDirection};

/// Parse an untrusted order string like `"UserName desc, Email"` into
/// clauses. Comma-separated; each part is a field name plus an optional
/// `asc`/`desc` token. Malformed parts are dropped, never reported, since
/// the string comes straight from a caller's query parameters.
pub fn parse_order_clauses(raw: &str) -> Vec<OrderClause> {
    let mut clauses = Vec::new();
    for part in raw.split(',') {
        let mut tokens = part.split_whitespace();
        let Some(field) = tokens.next() else { continue };
        let direction = match tokens.next() {
            None => SortDirection::Asc,
            Some(t) if t.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(t) if t.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(t) => {
                tracing::debug!(token = t, "malformed sort direction, dropping clause");
                continue;
            }
        };
        if tokens.next().is_some() {
            tracing::debug!(clause = part.trim(), "malformed sort clause, dropping");
            continue;
        }
        clauses.push(OrderClause { field: field.to_string(), direction });
    }
    clauses
}

/// Resolve a caller-supplied field name against the entity's sortable
/// whitelist, returning the canonical column name. Matching ignores case and
/// underscores so transport-style names (`UserName`) find their snake_case
/// columns (`user_name`). Anything unresolved sorts nothing.
pub fn resolve_column<T: Entity>(field: &str) -> Option<&'static str> {
    let wanted = normalize(field);
    T::sortable_columns()
        .iter()
        .find(|column| normalize(column) == wanted)
        .copied()
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
