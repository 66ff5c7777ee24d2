use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{self, FromRow, Row, Sqlite, SqliteConnection};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};

/// Filtered SELECT/COUNT over one table, optionally narrowed by joins and fixed predicates.
pub struct QueryBuilder<T> {
    filter: Filter,
    joins: Vec<String>,
    scopes: Vec<(String, Vec<Value>)>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    pub fn new(table_name: &str, alias: &str, columns: &'static [&'static str]) -> Result<Self, DatabaseError> {
        let filter = Filter::new(table_name)
            .and_then(|f| f.alias(alias))
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?
            .allow_columns(columns);
        Ok(Self {
            filter,
            joins: vec![],
            scopes: vec![],
            _phantom: std::marker::PhantomData,
        })
    }

    /// Raw JOIN clause; must only reference trusted identifiers.
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Fixed predicate ANDed before the caller's filter, with its own `?` parameters.
    pub fn scope(mut self, predicate: impl Into<String>, params: Vec<Value>) -> Self {
        self.scopes.push((predicate.into(), params));
        self
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter
            .assign(filter_data)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    pub async fn select_all(self, conn: &mut SqliteConnection) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, conn: &mut SqliteConnection) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(&mut *conn).await?;
        Ok(row)
    }

    pub async fn count(self, conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
        let sql_result = self.count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&mut *conn).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn sql_result(&self) -> Result<SqlResult, DatabaseError> {
        if self.joins.is_empty() && self.scopes.is_empty() {
            return self.filter.to_sql().map_err(|e| DatabaseError::QueryError(e.to_string()));
        }
        let (from_where, params) = self.scoped_from_where()?;
        let query = [
            format!("SELECT {}", self.select_clause()),
            from_where,
            self.filter.to_order_sql(),
            self.filter.to_limit_sql(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        Ok(SqlResult { query, params })
    }

    fn count_sql(&self) -> Result<SqlResult, DatabaseError> {
        if self.joins.is_empty() && self.scopes.is_empty() {
            return self.filter.to_count_sql().map_err(|e| DatabaseError::QueryError(e.to_string()));
        }
        let (from_where, params) = self.scoped_from_where()?;
        Ok(SqlResult { query: format!("SELECT COUNT(*) AS count {}", from_where), params })
    }

    fn scoped_from_where(&self) -> Result<(String, Vec<Value>), DatabaseError> {
        let where_result = self
            .filter
            .to_where_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let mut predicates = vec![];
        let mut params = vec![];
        for (predicate, scope_params) in &self.scopes {
            predicates.push(format!("({})", predicate));
            params.extend(scope_params.iter().cloned());
        }
        predicates.push(format!("({})", where_result.query));
        params.extend(where_result.params);

        let mut from = match self.filter.table_alias() {
            Some(alias) => format!("FROM \"{}\" AS \"{}\"", self.filter.table_name(), alias),
            None => format!("FROM \"{}\"", self.filter.table_name()),
        };
        for join in &self.joins {
            from.push(' ');
            from.push_str(join);
        }
        Ok((format!("{} WHERE {}", from, predicates.join(" AND ")), params))
    }

    fn select_clause(&self) -> String {
        match self.filter.table_alias() {
            Some(alias) => format!("\"{}\".*", alias),
            None => "*".to_string(),
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(None::<String>),
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
        Value::String(s) => q.bind(s.clone()),
        // Arrays are expanded by FilterWhere; anything left is compared as JSON text
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    match v {
        Value::Null => q.bind(None::<String>),
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
        Value::String(s) => q.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
