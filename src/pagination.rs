use serde::Serialize;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Decoded query string that keeps repeated keys (`?tags=a&tags=b`).
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// `1` and `true` switch a boolean filter on; anything else leaves it off.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1") | Some("true"))
    }

    pub fn window(&self, default_size: i64) -> PageWindow {
        let page = self.get_i64("page").filter(|p| *p >= 1).unwrap_or(1);
        let limit = self
            .get_i64("limit")
            .filter(|l| *l >= 1)
            .unwrap_or(default_size)
            .min(MAX_PAGE_SIZE);
        PageWindow { page, limit }
    }

    fn with_page(&self, page: i64) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.0.iter().filter(|(k, _)| k != "page") {
            out.append_pair(k, v);
        }
        out.append_pair("page", &page.to_string());
        out.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, window: PageWindow, path: &str, query: &QueryPairs) -> Self {
        let next = (window.page.saturating_mul(window.limit) < count)
            .then(|| format!("{path}?{}", query.with_page(window.page + 1)));
        let previous = (window.page > 1)
            .then(|| format!("{path}?{}", query.with_page(window.page - 1)));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}
