//! PageSearch - remote incremental search lists
//!
//! A searchable, infinitely scrollable selection list backed by any REST
//! endpoint that answers `GET {url}?{query}` with `{ "results": [...] }`.
//!
//! # Features
//!
//! - **Debounced search**: keystrokes inside the quiet period collapse into one request
//! - **Infinite scroll**: pages are appended until the server sends a short page
//! - **Ordered responses**: answers to superseded requests are dropped
//! - **Query serialization**: filters, arrays and nested objects in the backend's format
//! - **Terminal front end**: `pagesearch browse` for interactive picking
//!
//! # Example
//!
//! ```no_run
//! use pagesearch::{IncrementalSearchList, ListConfig, RestClient, Session};
//! use std::time::Duration;
//!
//! fn main() -> pagesearch::Result<()> {
//!     let config = ListConfig {
//!         url: "https://admin.example.com/api/drivers".into(),
//!         ..Default::default()
//!     };
//!     let client = RestClient::new(Session::with_token("secret"), config.request_timeout())?;
//!
//!     let mut list = IncrementalSearchList::<serde_json::Value, _>::new(config, client)?;
//!     list.set_on_select(|value| println!("picked {}", value));
//!     list.mount();
//!     list.wait_idle(Duration::from_secs(5));
//!
//!     list.on_search_text_changed("ana");
//!     std::thread::sleep(list.debounce_delay());
//!     list.tick();
//!     list.wait_idle(Duration::from_secs(5));
//!
//!     for label in list.rendered_options() {
//!         println!("{}", label);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod logging;
pub mod query;
pub mod search_list;
pub mod source;
pub mod tui;

// Re-export main types
pub use client::{RestClient, Session};
pub use controller::IncrementalSearchList;
pub use debounce::Debouncer;
pub use error::{Result, SearchError};
pub use query::{page_query, to_query_string, Filter};
pub use search_list::{FetchRequest, Phase, Resolution, SearchState};
pub use source::{Page, PageSource};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration of one search list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Endpoint answering with `{ "results": [...] }`
    pub url: String,
    /// Records per page, fixed for the list's lifetime
    pub page_size: u32,
    /// Filter key the search text is stored under
    pub search_field: String,
    /// Record field forwarded to the owner on selection
    pub value_field: String,
    /// Record field shown by the default option renderer
    pub label_field: String,
    /// Seed merged into the filter of every request
    pub default_filter: serde_json::Value,
    /// Quiet period before a search is sent
    pub debounce_ms: u64,
    /// Remaining distance to the end that counts as "near the end"
    pub scroll_threshold: u32,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            page_size: 20,
            search_field: "keyword".to_string(),
            value_field: "id".to_string(),
            label_field: "name".to_string(),
            default_filter: serde_json::Value::Object(Filter::new()),
            debounce_ms: 500,
            scroll_threshold: 2,
            request_timeout_secs: 10,
        }
    }
}

impl ListConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SearchError::Config("url is required".into()));
        }
        if self.page_size == 0 {
            return Err(SearchError::Config("page_size must be positive".into()));
        }
        if self.search_field.is_empty() {
            return Err(SearchError::Config("search_field must not be empty".into()));
        }
        if !self.default_filter.is_object() && !self.default_filter.is_null() {
            return Err(SearchError::Config("default_filter must be an object".into()));
        }
        Ok(())
    }

    /// The default filter as a map; `null` means no seed
    pub fn default_filter_map(&self) -> Filter {
        match &self.default_filter {
            serde_json::Value::Object(map) => map.clone(),
            _ => Filter::new(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
