use serde::Serialize;
use url::Url;

use crate::config::PaginationConfig;

pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";

/// Limit/offset window resolved from raw query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    /// Unparseable or non-positive limits fall back to the default; limits above the
    /// maximum are capped. Unparseable or negative offsets become 0.
    pub fn resolve(limit: Option<&str>, offset: Option<&str>, config: &PaginationConfig) -> Self {
        let mut limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(config.default_limit);
        if let Some(max) = config.max_limit {
            limit = limit.min(max);
        }
        let offset = offset
            .and_then(|o| o.trim().parse::<i64>().ok())
            .filter(|o| *o >= 0)
            .unwrap_or(0);
        Self { limit, offset }
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build the envelope; links are absolute URLs derived from `request_url`, keeping its other parameters.
    pub fn new(results: Vec<T>, count: i64, window: PageRequest, request_url: &Url) -> Self {
        Self {
            count,
            next: next_link(count, window, request_url),
            previous: previous_link(window, request_url),
            results,
        }
    }
}

fn next_link(count: i64, window: PageRequest, url: &Url) -> Option<String> {
    let end = window.offset.saturating_add(window.limit);
    if end >= count {
        return None;
    }
    Some(with_window(url, window.limit, Some(end)))
}

fn previous_link(window: PageRequest, url: &Url) -> Option<String> {
    if window.offset <= 0 {
        return None;
    }
    let offset = window.offset - window.limit;
    Some(with_window(url, window.limit, (offset > 0).then_some(offset)))
}

fn with_window(url: &Url, limit: i64, offset: Option<i64>) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != LIMIT_PARAM && k != OFFSET_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut link = url.clone();
    {
        let mut pairs = link.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(LIMIT_PARAM, &limit.to_string());
        if let Some(offset) = offset {
            pairs.append_pair(OFFSET_PARAM, &offset.to_string());
        }
    }
    link.into()
}
