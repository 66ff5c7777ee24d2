use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterColumns, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    alias: Option<String>,
    allowed_columns: Option<&'static [&'static str]>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_identifier(&table_name).map_err(FilterError::InvalidIdentifier)?;
        Ok(Self {
            table_name,
            alias: None,
            allowed_columns: None,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    /// Qualify every rendered column with `alias` (used when the query joins other tables).
    pub fn alias(mut self, alias: impl Into<String>) -> Result<Self, FilterError> {
        let alias = alias.into();
        Self::validate_identifier(&alias).map_err(FilterError::InvalidIdentifier)?;
        self.alias = Some(alias);
        Ok(self)
    }

    /// Restrict where/order columns to `columns`.
    pub fn allow_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.allowed_columns = Some(columns);
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset)?;
        } else if let Some(offset) = data.offset {
            self.offset(offset)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        // Render once up front so bad columns fail at assignment time
        FilterWhere::generate(&conditions, &self.columns())?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        let order_info = FilterOrder::validate_and_parse(&order_spec, &self.columns())?;
        self.order_data = order_info;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidWindow("Limit must be non-negative".to_string()));
        }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.pagination.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        if let Some(off) = offset {
            self.offset(off)?;
        }
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> Result<&mut Self, FilterError> {
        if offset < 0 {
            return Err(FilterError::InvalidWindow("Offset must be non-negative".to_string()));
        }
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn applied_limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn table_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            self.build_from_clause(),
            format!("WHERE {}", where_result.query),
            self.to_order_sql(),
            self.to_limit_sql(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = if let Some(ref where_data) = self.where_data {
            FilterWhere::generate(where_data, &self.columns())?
        } else {
            FilterWhere::generate_empty()
        };
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!("SELECT COUNT(*) AS count {} WHERE {}", self.build_from_clause(), where_result.query);
        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_order_sql(&self) -> String {
        FilterOrder::generate(&self.order_data, self.alias.as_deref())
    }

    pub fn to_limit_sql(&self) -> String {
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("LIMIT -1 OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    fn columns(&self) -> FilterColumns<'_> {
        FilterColumns {
            alias: self.alias.as_deref(),
            allowed: self.allowed_columns,
        }
    }

    fn validate_identifier(name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("Identifier cannot be empty".to_string());
        }
        let mut chars = name.chars();
        let first_ok = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
        if !first_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("Invalid identifier format: {}", name));
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        match &self.alias {
            Some(alias) => format!("\"{}\".*", alias),
            None => "*".to_string(),
        }
    }

    fn build_from_clause(&self) -> String {
        match &self.alias {
            Some(alias) => format!("FROM \"{}\" AS \"{}\"", self.table_name, alias),
            None => format!("FROM \"{}\"", self.table_name),
        }
    }
}
