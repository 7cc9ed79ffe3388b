//! REST client
//!
//! Blocking HTTP client used by the list's fetch threads. Credentials live in
//! an explicit [`Session`] handed to the client; nothing is read from globals.

use crate::error::{Result, SearchError};
use crate::logging;
use crate::source::{build_url, Page, PageSource};
use parking_lot::RwLock;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable the CLI reads the bearer token from
pub const TOKEN_ENV: &str = "SEARCH_TOKEN";

#[derive(Debug, Default, Clone)]
struct SessionData {
    token: Option<String>,
    headers: Vec<(String, String)>,
}

/// Credentials and extra headers shared between the owner and its clients.
///
/// Clones share the same data, so a token set by the owner is seen by every
/// client built from the session.
#[derive(Debug, Default, Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionData>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(Some(token.into()));
        session
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.inner.write().token = token.filter(|t| !t.is_empty());
    }

    /// Add a header sent with every request
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().headers.push((name.into(), value.into()));
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let data = self.inner.read();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &data.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SearchError::Config("token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &data.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SearchError::Config(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| SearchError::Config(format!("invalid value for header '{}'", name)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

/// HTTP client for `{results}` endpoints
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    session: Session,
}

impl RestClient {
    pub fn new(session: Session, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("pagesearch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { http, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// GET `url` and decode the body as JSON
    pub fn get_json(&self, url: &str) -> Result<Value> {
        let parsed = Url::parse(url).map_err(|_| SearchError::InvalidUrl(url.to_string()))?;

        let response = self
            .http
            .get(parsed)
            .headers(self.session.header_map()?)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl<T: DeserializeOwned> PageSource<T> for RestClient {
    fn fetch(&self, url: &str, query: &str) -> Result<Page<T>> {
        let full = build_url(url, query);
        logging::debug("HTTP", &format!("GET {}", full));
        let body = self.get_json(&full)?;
        Page::from_value(body)
    }
}
