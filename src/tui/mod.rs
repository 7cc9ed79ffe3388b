//! Terminal front end for picking options from a remote list

pub mod app;
pub mod colors;
pub mod search;
pub mod table;
pub mod ui;

pub use app::{App, Outcome};

use crate::controller::IncrementalSearchList;
use crate::source::PageSource;
use serde_json::Value;

/// Take over the terminal until the user picks or quits
pub fn run<S: PageSource<Value> + 'static>(list: IncrementalSearchList<Value, S>) -> crate::Result<Outcome> {
    let mut terminal = ratatui::init();
    let mut app = App::new(list);
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
