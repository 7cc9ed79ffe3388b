//! Search List State Machine
//!
//! The paging state of one remote search list, driven by discrete events:
//!
//! ```text
//!            search / scroll / mount
//!   Idle ──────────────────────────────► Loading{seq}
//!    ▲  ▲                                   │
//!    │  └──────── fetch-resolved(seq) ──────┤
//!    │                                      │
//!  Failed ◄────── fetch-rejected(seq) ──────┘
//! ```
//!
//! No I/O happens here. An event that needs a page returns a [`FetchRequest`];
//! the caller performs it and feeds the outcome back through [`SearchState::resolve`].
//!
//! Every request gets a sequence number from a counter that only grows. Only
//! the response to the newest request is applied, so a slow page-1 answer
//! for an old search can never land on top of newer results.
//!
//! Scrolling stays locked until page 1 of the current search has been
//! applied. Until then `items` still holds the previous search's rows and
//! `has_more` still describes them, so extending them would mix two searches.

use crate::error::SearchError;
use crate::logging;
use crate::query::{page_query, Filter};
use crate::source::Page;
use serde_json::Value;

/// A page request the caller has to carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub page_index: u32,
    pub query: String,
}

/// Where the list is in its fetch cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { seq: u64, page_index: u32 },
    Failed { message: String },
}

/// What happened to a response handed to [`SearchState::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Items were replaced (page 1) or extended
    Applied { received: usize, has_more: bool },
    /// The request failed; items and `has_more` are untouched
    Failed,
    /// The response belongs to a superseded request or an unmounted list
    Stale,
}

/// Paging state owned by exactly one list
#[derive(Debug)]
pub struct SearchState<T> {
    page_index: u32,
    page_size: u32,
    search_field: String,
    default_filter: Filter,
    filter: Filter,
    items: Vec<T>,
    has_more: bool,
    first_page_loaded: bool,
    phase: Phase,
    next_seq: u64,
    epoch: u64,
    mounted: bool,
}

impl<T> SearchState<T> {
    pub fn new(page_size: u32, search_field: impl Into<String>, default_filter: Filter) -> Self {
        Self {
            page_index: 1,
            page_size: page_size.max(1),
            search_field: search_field.into(),
            filter: default_filter.clone(),
            default_filter,
            items: Vec::new(),
            has_more: true,
            first_page_loaded: false,
            phase: Phase::Idle,
            next_seq: 0,
            epoch: 0,
            mounted: false,
        }
    }

    // --- Accessors ---

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Number of filter resets so far; items accumulate within one epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether page 1 of the current epoch has been applied
    pub fn first_page_loaded(&self) -> bool {
        self.first_page_loaded
    }

    /// Sequence number of the outstanding request, if any
    pub fn current_seq(&self) -> Option<u64> {
        match self.phase {
            Phase::Loading { seq, .. } => Some(seq),
            _ => None,
        }
    }

    /// Current search text, empty when none was entered
    pub fn search_text(&self) -> &str {
        self.filter
            .get(&self.search_field)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    // --- Events ---

    /// The list appeared: load the first page with the seeded filter
    pub fn mount(&mut self) -> FetchRequest {
        self.mounted = true;
        self.start_epoch();
        self.issue()
    }

    /// The list went away; every later response is dropped
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.phase = Phase::Idle;
    }

    /// New default filter (or endpoint): throw the old state away and start over
    pub fn reconfigure(&mut self, default_filter: Filter) -> Option<FetchRequest> {
        self.default_filter = default_filter;
        self.filter = self.default_filter.clone();
        self.items.clear();
        self.has_more = true;
        self.start_epoch();
        if self.mounted {
            Some(self.issue())
        } else {
            self.phase = Phase::Idle;
            None
        }
    }

    /// A debounced search fired: new filter epoch starting at page 1
    pub fn search(&mut self, text: &str) -> Option<FetchRequest> {
        if !self.mounted {
            return None;
        }
        self.filter
            .insert(self.search_field.clone(), Value::String(text.to_string()));
        self.start_epoch();
        Some(self.issue())
    }

    /// The viewport got close to the end of the loaded items
    pub fn scroll_near_end(&mut self) -> Option<FetchRequest> {
        if !self.mounted || !self.first_page_loaded || !self.has_more || self.is_loading() {
            return None;
        }
        self.page_index += 1;
        Some(self.issue())
    }

    /// Apply the outcome of request `seq`
    pub fn resolve(&mut self, seq: u64, outcome: Result<Page<T>, SearchError>) -> Resolution {
        let page_index = match self.phase {
            Phase::Loading { seq: current, page_index } if self.mounted && current == seq => {
                page_index
            }
            _ => {
                logging::log_stale_response(seq, self.current_seq());
                return Resolution::Stale;
            }
        };

        match outcome {
            Ok(page) => {
                if page.malformed {
                    logging::log_malformed_page(seq);
                }
                let received = page.len();
                if page_index == 1 {
                    self.items = page.results;
                    self.first_page_loaded = true;
                } else {
                    self.items.extend(page.results);
                }
                self.has_more = received >= self.page_size as usize;
                self.phase = Phase::Idle;
                logging::log_fetch_resolved(seq, page_index, received, self.has_more);
                Resolution::Applied {
                    received,
                    has_more: self.has_more,
                }
            }
            Err(err) => {
                logging::log_fetch_failed(seq, &err);
                // the page was never loaded, so the next scroll asks for it again
                if page_index > 1 {
                    self.page_index = page_index - 1;
                }
                self.phase = Phase::Failed {
                    message: err.to_string(),
                };
                Resolution::Failed
            }
        }
    }

    fn start_epoch(&mut self) {
        self.epoch += 1;
        self.page_index = 1;
        self.first_page_loaded = false;
    }

    fn issue(&mut self) -> FetchRequest {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.phase = Phase::Loading {
            seq,
            page_index: self.page_index,
        };
        FetchRequest {
            seq,
            page_index: self.page_index,
            query: page_query(self.page_index, self.page_size, &self.filter),
        }
    }
}
