//! Incremental Search List Controller
//!
//! Glue between the [`SearchState`] machine, the [`Debouncer`], a [`PageSource`]
//! and the owner's callbacks. Fetches run on background threads and report
//! back over a channel; [`IncrementalSearchList::tick`] applies them on the
//! owner's thread, so state is only ever touched from one place.

use crate::debounce::Debouncer;
use crate::error::{Result, SearchError};
use crate::logging;
use crate::search_list::{FetchRequest, Phase, Resolution, SearchState};
use crate::source::{Page, PageSource};
use crate::ListConfig;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A finished fetch on its way back from a worker thread
struct FetchDone<T> {
    seq: u64,
    outcome: Result<Page<T>>,
}

type SelectCallback = Box<dyn FnMut(&Value)>;
type ChangeCallback = Box<dyn FnMut(&[Value])>;
type RenderFn<T> = Box<dyn Fn(&T) -> String>;

/// Remote-backed, searchable, infinitely scrollable selection list
pub struct IncrementalSearchList<T, S> {
    config: ListConfig,
    source: Arc<S>,
    state: SearchState<T>,
    debouncer: Debouncer<String>,

    // Worker channel
    done_tx: Sender<FetchDone<T>>,
    done_rx: Receiver<FetchDone<T>>,

    // Owner hooks
    on_select: Option<SelectCallback>,
    on_change: Option<ChangeCallback>,
    render_option: RenderFn<T>,

    selected: Vec<Value>,
    fetches_issued: u64,
}

impl<T, S> IncrementalSearchList<T, S>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: PageSource<T> + 'static,
{
    pub fn new(config: ListConfig, source: S) -> Result<Self> {
        config.validate()?;

        let (done_tx, done_rx) = unbounded();
        let state = SearchState::new(
            config.page_size,
            config.search_field.clone(),
            config.default_filter_map(),
        );
        let render_option = label_renderer(config.label_field.clone());

        Ok(Self {
            debouncer: Debouncer::new(config.debounce()),
            config,
            source: Arc::new(source),
            state,
            done_tx,
            done_rx,
            on_select: None,
            on_change: None,
            render_option,
            selected: Vec::new(),
            fetches_issued: 0,
        })
    }

    // --- Owner hooks ---

    /// Called with the identifying value of an option picked with [`Self::on_option_selected`]
    pub fn set_on_select(&mut self, callback: impl FnMut(&Value) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    /// Called with the whole selection whenever [`Self::toggle_option`] changes it
    pub fn set_on_change(&mut self, callback: impl FnMut(&[Value]) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Replace the default renderer (the `label_field` of each record)
    pub fn set_render_option(&mut self, render: impl Fn(&T) -> String + 'static) {
        self.render_option = Box::new(render);
    }

    // --- Accessors ---

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn state(&self) -> &SearchState<T> {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        self.state.items()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more()
    }

    /// Message of the last failed fetch, cleared by the next request
    pub fn last_error(&self) -> Option<&str> {
        match self.state.phase() {
            Phase::Failed { message } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Number of requests sent since construction
    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    pub fn selected(&self) -> &[Value] {
        &self.selected
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debouncer.delay()
    }

    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// How long until the pending search goes out, `None` when nothing is pending
    pub fn search_due_in(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_due(now)
    }

    pub fn render(&self, index: usize) -> Option<String> {
        self.state.items().get(index).map(|item| (self.render_option)(item))
    }

    pub fn rendered_options(&self) -> Vec<String> {
        self.state
            .items()
            .iter()
            .map(|item| (self.render_option)(item))
            .collect()
    }

    // --- Life cycle ---

    /// Show the list and load the first page
    pub fn mount(&mut self) {
        let request = self.state.mount();
        self.dispatch(request);
    }

    /// Tear the list down. Pending searches are cancelled and late
    /// responses are discarded.
    pub fn unmount(&mut self) {
        self.debouncer.cancel();
        self.state.unmount();
        logging::info("LIST", "unmounted");
    }

    /// Point the list at a new endpoint and/or default filter; starts over
    pub fn reconfigure(&mut self, url: impl Into<String>, default_filter: crate::Filter) -> Result<()> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SearchError::Config("url is required".into()));
        }
        self.config.url = url;
        self.config.default_filter = Value::Object(default_filter.clone());
        self.debouncer.cancel();
        self.selected.clear();
        if let Some(request) = self.state.reconfigure(default_filter) {
            self.dispatch(request);
        }
        Ok(())
    }

    // --- Events ---

    /// Search text changed; the request goes out once the text is quiet
    pub fn on_search_text_changed(&mut self, text: &str) {
        self.on_search_text_changed_at(text, Instant::now());
    }

    pub fn on_search_text_changed_at(&mut self, text: &str, now: Instant) {
        if !self.state.is_mounted() {
            return;
        }
        self.debouncer.trigger(text.to_string(), now);
    }

    /// The viewport reports `remaining` units left before its end
    pub fn on_scrolled_near_end(&mut self, remaining: u32) -> bool {
        if remaining > self.config.scroll_threshold {
            return false;
        }
        match self.state.scroll_near_end() {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// Forward the identifying value of option `index` to the owner
    pub fn on_option_selected(&mut self, index: usize) -> Option<Value> {
        let value = self.option_value(index)?;
        logging::log_selection(&value);
        if let Some(callback) = self.on_select.as_mut() {
            callback(&value);
        }
        Some(value)
    }

    /// Add or remove option `index` from the multi-selection
    pub fn toggle_option(&mut self, index: usize) -> Option<bool> {
        let value = self.option_value(index)?;
        let now_selected = match self.selected.iter().position(|v| *v == value) {
            Some(pos) => {
                self.selected.remove(pos);
                false
            }
            None => {
                self.selected.push(value);
                true
            }
        };
        if let Some(callback) = self.on_change.as_mut() {
            callback(self.selected.as_slice());
        }
        Some(now_selected)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.option_value(index)
            .map(|value| self.selected.contains(&value))
            .unwrap_or(false)
    }

    // --- Event loop ---

    /// Fire a due search and apply finished fetches. Returns true when
    /// anything visible changed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some(text) = self.debouncer.poll(now) {
            if let Some(request) = self.state.search(&text) {
                self.dispatch(request);
                changed = true;
            }
        }

        while let Ok(done) = self.done_rx.try_recv() {
            changed |= self.apply(done);
        }

        changed
    }

    /// Block until the outstanding fetch is applied or `timeout` passes.
    /// Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state.is_loading() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(left) {
                Ok(done) => {
                    self.apply(done);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                // the list holds a sender, so this cannot happen while it lives
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn apply(&mut self, done: FetchDone<T>) -> bool {
        !matches!(self.state.resolve(done.seq, done.outcome), Resolution::Stale)
    }

    fn dispatch(&mut self, request: FetchRequest) {
        self.fetches_issued += 1;
        let url = self.config.url.clone();
        logging::log_fetch_issued(request.seq, &crate::source::build_url(&url, &request.query));

        let source = Arc::clone(&self.source);
        let tx = self.done_tx.clone();
        thread::spawn(move || {
            let outcome = source.fetch(&url, &request.query);
            // the list may be gone by now
            let _ = tx.send(FetchDone {
                seq: request.seq,
                outcome,
            });
        });
    }

    fn option_value(&self, index: usize) -> Option<Value> {
        let item = self.state.items().get(index)?;
        let record = serde_json::to_value(item).ok()?;
        match record {
            Value::Object(ref map) => Some(
                map.get(&self.config.value_field)
                    .cloned()
                    .unwrap_or(record.clone()),
            ),
            other => Some(other),
        }
    }
}

/// Show `label_field` when the record has one, the compact JSON otherwise
fn label_renderer<T: Serialize + 'static>(label_field: String) -> RenderFn<T> {
    Box::new(move |item: &T| match serde_json::to_value(item) {
        Ok(Value::Object(map)) => match map.get(&label_field) {
            Some(Value::String(label)) => label.clone(),
            Some(other) => other.to_string(),
            None => Value::Object(map).to_string(),
        },
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    const WAIT: Duration = Duration::from_secs(5);

    /// Serves `total` records named `item-N`, paged by the query's pageIndex/pageSize
    struct FakeBackend {
        total: usize,
        fail: Mutex<bool>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        fn new(total: usize) -> (Self, Arc<Mutex<Vec<String>>>) {
            let queries = Arc::new(Mutex::new(Vec::new()));
            let backend = Self {
                total,
                fail: Mutex::new(false),
                queries: Arc::clone(&queries),
            };
            (backend, queries)
        }
    }

    fn param(query: &str, key: &str) -> Option<String> {
        query
            .split('&')
            .filter_map(|segment| segment.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }

    impl PageSource<Value> for FakeBackend {
        fn fetch(&self, _url: &str, query: &str) -> Result<Page<Value>> {
            self.queries.lock().push(query.to_string());
            if *self.fail.lock() {
                return Err(SearchError::Status { status: 500, url: "fake".into() });
            }
            let page: usize = param(query, "pageIndex").and_then(|v| v.parse().ok()).unwrap_or(1);
            let size: usize = param(query, "pageSize").and_then(|v| v.parse().ok()).unwrap_or(20);
            let prefix = param(query, "keyword").unwrap_or_else(|| "item".into());

            let start = (page - 1) * size;
            let end = (start + size).min(self.total);
            let results = (start..end.max(start))
                .map(|i| json!({ "id": i, "name": format!("{}-{}", prefix, i) }))
                .collect();
            Ok(Page::new(results))
        }
    }

    fn config() -> ListConfig {
        ListConfig {
            url: "http://fake/api/drivers".into(),
            ..Default::default()
        }
    }

    fn list(total: usize) -> (IncrementalSearchList<Value, FakeBackend>, Arc<Mutex<Vec<String>>>) {
        let (backend, queries) = FakeBackend::new(total);
        let list = IncrementalSearchList::new(config(), backend).unwrap();
        (list, queries)
    }

    #[test]
    fn rejects_invalid_config() {
        let (backend, _) = FakeBackend::new(0);
        let result = IncrementalSearchList::<Value, _>::new(ListConfig::default(), backend);
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn scrolling_accumulates_pages() {
        let (mut list, _) = list(25);
        list.mount();
        assert!(list.wait_idle(WAIT));
        assert_eq!(list.items().len(), 20);
        assert!(list.has_more());

        assert!(list.on_scrolled_near_end(0));
        assert!(list.wait_idle(WAIT));
        assert_eq!(list.items().len(), 25);
        assert!(!list.has_more());

        // end of data: further scrolls are no-ops
        assert!(!list.on_scrolled_near_end(0));
        assert_eq!(list.fetches_issued(), 2);
    }

    #[test]
    fn scroll_outside_threshold_does_nothing() {
        let (mut list, _) = list(100);
        list.mount();
        list.wait_idle(WAIT);

        assert!(!list.on_scrolled_near_end(3));
        assert!(list.on_scrolled_near_end(2));
    }

    #[test]
    fn search_changes_are_debounced() {
        let (mut list, queries) = list(100);
        list.mount();
        list.wait_idle(WAIT);

        let start = Instant::now();
        list.on_search_text_changed_at("a", start);
        list.on_search_text_changed_at("an", start + Duration::from_millis(100));
        list.on_search_text_changed_at("ana", start + Duration::from_millis(200));

        list.tick_at(start + Duration::from_millis(600));
        assert_eq!(list.fetches_issued(), 1);

        list.tick_at(start + Duration::from_millis(700));
        assert!(list.wait_idle(WAIT));
        assert_eq!(list.fetches_issued(), 2);

        let queries = queries.lock();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1], "pageIndex=1&pageSize=20&keyword=ana");
    }

    #[test]
    fn search_replaces_accumulated_items() {
        let (mut list, _) = list(100);
        list.mount();
        list.wait_idle(WAIT);
        list.on_scrolled_near_end(0);
        list.wait_idle(WAIT);
        assert_eq!(list.items().len(), 40);

        let start = Instant::now();
        list.on_search_text_changed_at("ana", start);
        list.tick_at(start + list.debounce_delay());
        assert_eq!(list.state().page_index(), 1);
        list.wait_idle(WAIT);

        assert_eq!(list.items().len(), 20);
        assert_eq!(list.render(0).as_deref(), Some("ana-0"));
    }

    #[test]
    fn failed_fetch_keeps_items_and_reports_error() {
        let (mut list, _) = list(100);
        list.mount();
        list.wait_idle(WAIT);

        *list.source.fail.lock() = true;
        list.on_scrolled_near_end(0);
        list.wait_idle(WAIT);

        assert_eq!(list.items().len(), 20);
        assert!(list.has_more());
        assert!(!list.is_loading());
        assert!(list.last_error().is_some());
    }

    #[test]
    fn late_response_after_unmount_is_ignored() {
        let (mut list, _) = list(100);
        list.mount();
        list.unmount();

        // give the worker time to answer, then drain
        thread::sleep(Duration::from_millis(100));
        assert!(!list.tick());
        assert!(list.items().is_empty());
    }

    #[test]
    fn search_after_unmount_is_not_scheduled() {
        let (mut list, _) = list(100);
        list.mount();
        list.wait_idle(WAIT);
        list.unmount();

        list.on_search_text_changed("ana");
        assert!(!list.search_pending());
    }

    #[test]
    fn selection_forwards_identifying_value() {
        let (mut list, _) = list(5);
        let picked = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&picked);
        list.set_on_select(move |value| sink.borrow_mut().push(value.clone()));
        list.mount();
        list.wait_idle(WAIT);

        assert_eq!(list.on_option_selected(3), Some(json!(3)));
        assert_eq!(list.on_option_selected(99), None);
        assert_eq!(*picked.borrow(), vec![json!(3)]);
        // selecting does not touch the list
        assert_eq!(list.items().len(), 5);
    }

    #[test]
    fn toggling_reports_whole_selection() {
        let (mut list, _) = list(5);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        list.set_on_change(move |values| sink.borrow_mut().push(values.to_vec()));
        list.mount();
        list.wait_idle(WAIT);

        assert_eq!(list.toggle_option(1), Some(true));
        assert_eq!(list.toggle_option(2), Some(true));
        assert_eq!(list.toggle_option(1), Some(false));
        assert!(list.is_selected(2));
        assert!(!list.is_selected(1));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], vec![json!(2)]);
    }

    #[test]
    fn custom_renderer_is_used() {
        let (mut list, _) = list(2);
        list.set_render_option(|item: &Value| format!("#{}", item["id"]));
        list.mount();
        list.wait_idle(WAIT);

        assert_eq!(list.rendered_options(), vec!["#0", "#1"]);
    }

    #[test]
    fn reconfigure_refetches_with_new_seed() {
        let (mut list, queries) = list(100);
        list.mount();
        list.wait_idle(WAIT);

        let mut seed = Filter::new();
        seed.insert("zone".into(), json!("north"));
        list.reconfigure("http://fake/api/customers", seed).unwrap();
        list.wait_idle(WAIT);

        assert_eq!(list.config().url, "http://fake/api/customers");
        assert_eq!(
            queries.lock().last().map(String::as_str),
            Some("pageIndex=1&pageSize=20&zone=north")
        );
        assert!(list.reconfigure("", Filter::new()).is_err());
    }

    #[test]
    fn default_renderer_falls_back_to_json() {
        let render = label_renderer::<Value>("name".into());
        assert_eq!(render(&json!({ "name": "Ana" })), "Ana");
        assert_eq!(render(&json!({ "name": 7 })), "7");
        assert_eq!(render(&json!({ "id": 1 })), "{\"id\":1}");
        assert_eq!(render(&json!("plain")), "plain");
    }
}
