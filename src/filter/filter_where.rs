use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterColumns, FilterWhereInfo};

/// Renders a JSON where-document into a SQLite predicate with positional `?` parameters.
///
/// Only exact matches are expressible: `{ "city": "London" }` or `{ "city": { "$eq": "London" } }`.
/// A `null` value matches an absent field (`IS NULL`).
pub struct FilterWhere {
    param_values: Vec<Value>,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self {
            param_values: vec![],
            conditions: vec![],
        }
    }

    pub fn generate(where_data: &Value, columns: &FilterColumns<'_>) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new();
        filter_where.build(where_data, columns)
    }

    pub fn generate_empty() -> (String, Vec<Value>) {
        ("1=1".to_string(), vec![])
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value, columns: &FilterColumns<'_>) -> Result<(String, Vec<Value>), FilterError> {
        self.param_values.clear();
        self.conditions.clear();

        self.parse_where_data(where_data, columns)?;

        let conditions = std::mem::take(&mut self.conditions);
        let sql_conditions: Vec<String> = conditions
            .iter()
            .map(|condition| self.build_sql_condition(condition, columns))
            .collect();
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value, columns: &FilterColumns<'_>) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        return Err(FilterError::UnsupportedOperator(key.clone()));
                    }
                    check_column(key, columns)?;
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        let data = match value {
            Value::Object(obj) => {
                let mut data = None;
                for (op_key, op_val) in obj {
                    if op_key != "$eq" {
                        return Err(FilterError::UnsupportedOperator(op_key.clone()));
                    }
                    data = Some(op_val.clone());
                }
                data.ok_or_else(|| FilterError::InvalidWhereClause(format!("Empty condition for {}", field)))?
            }
            Value::Array(_) => {
                return Err(FilterError::InvalidWhereClause(format!("{} must be compared to a scalar", field)));
            }
            // Implicit equality: { field: value }
            other => other.clone(),
        };
        self.conditions.push(FilterWhereInfo { column: field.to_string(), data });
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo, columns: &FilterColumns<'_>) -> String {
        let quoted_column = qualify(&condition.column, columns.alias);
        if condition.data.is_null() {
            format!("{} IS NULL", quoted_column)
        } else {
            format!("{} = {}", quoted_column, self.param(condition.data.clone()))
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        "?".to_string()
    }
}

impl Default for FilterWhere {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_column(column: &str, columns: &FilterColumns<'_>) -> Result<(), FilterError> {
    let well_formed = column
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
    }
    if let Some(allowed) = columns.allowed {
        if !allowed.contains(&column) {
            return Err(FilterError::ColumnNotAllowed(column.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn qualify(column: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("\"{}\".\"{}\"", alias, column),
        None => format!("\"{}\"", column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: FilterColumns<'static> = FilterColumns {
        alias: Some("a"),
        allowed: Some(&["id", "city", "zip_code"]),
    };

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "city": "London", "zip_code": null }), &COLUMNS).unwrap();
        assert_eq!(sql, "\"a\".\"city\" = ? AND \"a\".\"zip_code\" IS NULL");
        assert_eq!(params, vec![json!("London")]);
    }

    #[test]
    fn explicit_eq_matches_implicit_form() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$eq": 3 } }), &COLUMNS).unwrap();
        assert_eq!(sql, "\"a\".\"id\" = ?");
        assert_eq!(params, vec![json!(3)]);

        let (sql, params) = FilterWhere::generate(&json!({ "city": { "$eq": null } }), &COLUMNS).unwrap();
        assert_eq!(sql, "\"a\".\"city\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_document_matches_everything() {
        let (sql, params) = FilterWhere::generate(&json!({}), &COLUMNS).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_columns_outside_allow_list() {
        let err = FilterWhere::generate(&json!({ "password_hash": "x" }), &COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::ColumnNotAllowed(_)));

        let err = FilterWhere::generate(&json!({ "city\"; DROP": "x" }), &COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }

    #[test]
    fn rejects_unknown_operators() {
        let err = FilterWhere::generate(&json!({ "city": { "$regex": "^L" } }), &COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
        let err = FilterWhere::generate(&json!({ "$or": [] }), &COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
        for op in ["$ne", "$in", "$like"] {
            let err = FilterWhere::generate(&json!({ "id": { op: [1] } }), &COLUMNS).unwrap_err();
            assert!(matches!(err, FilterError::UnsupportedOperator(_)), "{} accepted", op);
        }
        let err = FilterWhere::generate(&json!({ "id": [1, 2] }), &COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::InvalidWhereClause(_)));
    }
}
