use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{check_column, qualify};
use super::types::{FilterColumns, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value, columns: &FilterColumns<'_>) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["city desc", "id asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v {
                        out.extend(Self::parse_order_string(s));
                    }
                }
                out
            }
            Value::Object(obj) => {
                // { "city": "desc", "id": "asc" }
                obj.iter()
                    .map(|(k, v)| {
                        let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                            "desc" => SortDirection::Desc,
                            _ => SortDirection::Asc,
                        };
                        FilterOrderInfo { column: k.clone(), sort }
                    })
                    .collect()
            }
            _ => vec![],
        };
        for info in &infos {
            check_column(&info.column, columns)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo], alias: Option<&str>) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", qualify(&i.column, alias), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_and_object_forms() {
        let columns = FilterColumns::default();
        let infos = FilterOrder::validate_and_parse(&json!("city desc, id"), &columns).unwrap();
        assert_eq!(FilterOrder::generate(&infos, Some("a")), "ORDER BY \"a\".\"city\" DESC, \"a\".\"id\" ASC");

        let infos = FilterOrder::validate_and_parse(&json!({ "id": "desc" }), &columns).unwrap();
        assert_eq!(FilterOrder::generate(&infos, None), "ORDER BY \"id\" DESC");
    }

    #[test]
    fn rejects_disallowed_sort_columns() {
        let columns = FilterColumns { alias: None, allowed: Some(&["id"]) };
        assert!(FilterOrder::validate_and_parse(&json!("password_hash"), &columns).is_err());
    }
}
