use serde::{Deserialize, Serialize};

/// Untrusted result-shaping input, exactly as it arrives from the transport
/// layer's query string. Everything here is advisory: unparsable or unknown
/// values fall back to defaults, they never fail a request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(rename = "Skip")]
    pub skip: Option<String>,
    #[serde(rename = "PageSize")]
    pub page_size: Option<String>,
    #[serde(rename = "OrderBy")]
    pub order_by: Option<String>,
}

impl PageParams {
    pub fn new(
        skip: Option<&str>,
        page_size: Option<&str>,
        order_by: Option<&str>,
    ) -> Self {
        Self {
            skip: skip.map(str::to_string),
            page_size: page_size.map(str::to_string),
            order_by: order_by.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A single parsed order clause: a caller-supplied field name (not yet
/// resolved against any whitelist) and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
    pub direction: SortDirection,
}
