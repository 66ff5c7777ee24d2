use axum::http::{header, HeaderMap, Uri};
use url::Url;

use crate::config;
use crate::error::ApiError;

/// Path ids that are not integers can never be owned
pub fn parse_address_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::not_found("Not found."))
}

/// Absolute URL of the current request, used for pagination links
pub fn request_url(headers: &HeaderMap, uri: &Uri) -> Result<Url, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = if config::config().security.require_https { "https" } else { "http" };
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
        .map_err(|_| ApiError::bad_request("Invalid Host header"))
}

/// Parse `ids=1,2,3`. Blank entries and non-integers are rejected.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, ApiError> {
    let ids: Result<Vec<i64>, _> = raw.split(',').map(|part| part.trim().parse::<i64>()).collect();
    match ids {
        Ok(ids) if !ids.is_empty() => Ok(ids),
        _ => Err(ApiError::field_error("ids", "Enter a comma-separated list of integer ids.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_id_lists() {
        assert_eq!(parse_id_list("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("").is_err());
        assert!(parse_id_list("1,,2").is_err());
        assert!(parse_id_list("1,abc").is_err());
    }

    #[test]
    fn builds_absolute_request_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("example.test:8000"));
        let uri: Uri = "/api/v1/addressbook?limit=2".parse().unwrap();
        let url = request_url(&headers, &uri).unwrap();
        assert_eq!(url.host_str(), Some("example.test"));
        assert_eq!(url.port(), Some(8000));
        assert_eq!(url.query(), Some("limit=2"));
    }

    #[test]
    fn non_integer_ids_are_not_found() {
        assert_eq!(parse_address_id("12").unwrap(), 12);
        assert_eq!(parse_address_id("abc").unwrap_err().status_code(), 404);
    }
}
