//! Page envelope and the fetch seam
//!
//! Every endpoint the list talks to answers with `{ "results": [...] }`.
//! [`PageSource`] is what the list calls to get one page; the REST client
//! implements it for real traffic, tests implement it with canned pages.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One page of decoded records
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub results: Vec<T>,
    /// The body had no usable `results` array
    pub malformed: bool,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            results,
            malformed: false,
        }
    }

    /// Stand-in for a body without a usable `results` array
    pub fn malformed() -> Self {
        Self {
            results: Vec::new(),
            malformed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a response body.
    ///
    /// A missing or non-array `results` field is an empty page, not an error.
    /// Records that do not fit `T` are a decode error.
    pub fn from_value(body: Value) -> Result<Self> {
        match body {
            Value::Object(mut envelope) => match envelope.remove("results") {
                Some(Value::Array(records)) => {
                    let results = serde_json::from_value(Value::Array(records))?;
                    Ok(Page::new(results))
                }
                _ => Ok(Page::malformed()),
            },
            _ => Ok(Page::malformed()),
        }
    }

    /// Decode raw response bytes
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }
}

/// Anything that can produce one page for `GET {url}?{query}`
pub trait PageSource<T>: Send + Sync {
    fn fetch(&self, url: &str, query: &str) -> Result<Page<T>>;
}

/// Join an endpoint and a serialized query
pub fn build_url(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        let sep = if url.ends_with('?') || url.ends_with('&') { "" } else { "&" };
        format!("{}{}{}", url, sep, query)
    } else {
        format!("{}?{}", url, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Driver {
        id: u32,
        name: String,
    }

    #[test]
    fn decodes_results_envelope() {
        let page: Page<Driver> = Page::from_value(json!({
            "results": [{ "id": 1, "name": "Ana" }, { "id": 2, "name": "Bo" }],
            "total": 2
        }))
        .unwrap();

        assert!(!page.malformed);
        assert_eq!(page.len(), 2);
        assert_eq!(page.results[1], Driver { id: 2, name: "Bo".into() });
    }

    #[test]
    fn missing_results_is_an_empty_page() {
        let page: Page<Driver> = Page::from_value(json!({ "items": [] })).unwrap();
        assert!(page.malformed);
        assert!(page.is_empty());

        let page: Page<Driver> = Page::from_value(json!({ "results": "nope" })).unwrap();
        assert!(page.malformed);

        let page: Page<Driver> = Page::from_value(json!([1, 2, 3])).unwrap();
        assert!(page.malformed);
    }

    #[test]
    fn mistyped_records_are_a_decode_error() {
        let page: Result<Page<Driver>> = Page::from_value(json!({ "results": [{ "id": "x" }] }));
        assert!(matches!(page, Err(crate::SearchError::Decode(_))));
    }

    #[test]
    fn invalid_json_bytes_are_a_decode_error() {
        let page: Result<Page<Value>> = Page::from_slice(b"<html>");
        assert!(page.is_err());
    }

    #[test]
    fn joins_url_and_query() {
        assert_eq!(build_url("http://h/api", "a=1"), "http://h/api?a=1");
        assert_eq!(build_url("http://h/api?x=1", "a=1"), "http://h/api?x=1&a=1");
        assert_eq!(build_url("http://h/api?", "a=1"), "http://h/api?a=1");
        assert_eq!(build_url("http://h/api", ""), "http://h/api");
    }
}
