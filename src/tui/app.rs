use crate::controller::IncrementalSearchList;
use crate::source::PageSource;
use crate::tui::search::SearchInput;
use crate::tui::table::TableState;
use crate::tui::ui;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use serde_json::Value;
use std::time::{Duration, Instant};

/// What the user ended the session with
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Enter on an option
    Picked(Value),
    /// Quit with the multi-selection (possibly empty)
    Selection(Vec<Value>),
}

pub struct App<S> {
    pub list: IncrementalSearchList<Value, S>,

    // Sub-states
    pub search: SearchInput,
    pub table: TableState,

    pub status_message: String,
    last_epoch: u64,
    last_len: usize,

    picked: Option<Value>,
    pub should_quit: bool,
}

impl<S: PageSource<Value> + 'static> App<S> {
    pub fn new(mut list: IncrementalSearchList<Value, S>) -> Self {
        list.mount();
        Self {
            list,
            search: SearchInput::default(),
            table: TableState::default(),
            status_message: "Loading...".to_string(),
            last_epoch: 0,
            last_len: 0,
            picked: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> crate::Result<Outcome> {
        let tick_rate = Duration::from_millis(50);
        let mut last_tick = Instant::now();

        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            let mut timeout = tick_rate.saturating_sub(last_tick.elapsed());
            if let Some(due) = self.list.search_due_in(Instant::now()) {
                timeout = timeout.min(due);
            }
            if event::poll(timeout).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            let now = Instant::now();
            let search_due = self.list.search_due_in(now) == Some(Duration::ZERO);
            if search_due || last_tick.elapsed() >= tick_rate {
                self.on_tick(now);
                last_tick = Instant::now();
            }

            if self.should_quit {
                self.list.unmount();
                return Ok(self.outcome());
            }
        }
    }

    pub fn outcome(&self) -> Outcome {
        match &self.picked {
            Some(value) => Outcome::Picked(value.clone()),
            None => Outcome::Selection(self.list.selected().to_vec()),
        }
    }

    /// Advance the list and sync the table with whatever arrived
    pub fn on_tick(&mut self, now: Instant) {
        if !self.list.tick_at(now) {
            return;
        }

        let state = self.list.state();
        let total = state.items().len();
        if state.epoch() != self.last_epoch && state.first_page_loaded() {
            // first page of a new search replaced the rows
            self.last_epoch = state.epoch();
            self.table.reset(total);
        } else {
            self.table.clamp(total);
        }

        self.status_message = match self.list.last_error() {
            Some(err) => format!("Request failed: {}", err),
            None if total != self.last_len || !state.is_loading() => {
                format!("{} loaded{}", total, if state.has_more() { "" } else { " (end)" })
            }
            None => self.status_message.clone(),
        };
        self.last_len = total;
    }

    fn check_near_end(&mut self) {
        let total = self.list.items().len();
        let remaining = self.table.remaining_below(total);
        let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
        if self.list.on_scrolled_near_end(remaining) {
            self.status_message = "Loading more...".to_string();
        }
    }

    // --- Key handling ---

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Global keys
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.should_quit = true;
                return;
            }
            KeyCode::Esc => {
                if self.search.focused && !self.search.query.is_empty() {
                    self.search.clear();
                    self.list.on_search_text_changed("");
                } else if self.search.focused {
                    self.search.focused = false;
                } else {
                    self.should_quit = true;
                }
                return;
            }
            _ => {}
        }

        if self.search.focused {
            self.handle_search_key(key);
        } else {
            self.handle_table_key(key);
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let changed = match key.code {
            KeyCode::Char(c) => {
                self.search.insert(c);
                true
            }
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Delete => self.search.delete(),
            KeyCode::Left => {
                self.search.move_left();
                false
            }
            KeyCode::Right => {
                self.search.move_right();
                false
            }
            KeyCode::Home => {
                self.search.home();
                false
            }
            KeyCode::End => {
                self.search.end();
                false
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Enter => {
                self.search.focused = false;
                self.table.clamp(self.list.items().len());
                false
            }
            _ => false,
        };

        if changed {
            self.list.on_search_text_changed(&self.search.query);
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        let total = self.list.items().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.table.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.table.select_next(total),
            KeyCode::PageUp => self.table.page_up(),
            KeyCode::PageDown => self.table.page_down(total),
            KeyCode::Home => self.table.select_first(),
            KeyCode::End => self.table.select_last(total),

            KeyCode::Enter => {
                if let Some(i) = self.table.selected {
                    if let Some(value) = self.list.on_option_selected(i) {
                        self.picked = Some(value);
                        self.should_quit = true;
                    }
                }
                return;
            }
            KeyCode::Char(' ') => {
                if let Some(i) = self.table.selected {
                    self.list.toggle_option(i);
                    self.status_message = format!("{} selected", self.list.selected().len());
                }
                return;
            }

            KeyCode::Tab | KeyCode::Char('/') => {
                self.search.focused = true;
                return;
            }

            // Any other printable char focuses search and types it
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.focused = true;
                self.search.end();
                self.search.insert(c);
                self.list.on_search_text_changed(&self.search.query);
                return;
            }

            _ => return,
        }

        self.check_near_end();
    }
}
