use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One exact-match condition; `data` of `null` means the column must be NULL
#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub data: serde_json::Value,
}

/// Column qualification and allow-list applied while rendering a WHERE clause
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterColumns<'a> {
    pub alias: Option<&'a str>,
    pub allowed: Option<&'a [&'a str]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
