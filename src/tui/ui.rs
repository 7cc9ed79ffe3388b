use crate::source::PageSource;
use crate::tui::app::App;
use crate::tui::colors;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use serde_json::Value;

pub fn draw<S: PageSource<Value> + 'static>(frame: &mut Frame, app: &mut App<S>) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search bar
            Constraint::Min(5),    // Table
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_search_bar(frame, app, chunks[0]);
    draw_table(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    if app.search.focused {
        // border (1) + leading space (1) + "> " (2)
        let cursor_x = chunks[0].x + 4 + app.search.cursor_column() as u16;
        let cursor_y = chunks[0].y + 1;
        frame.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

fn draw_search_bar<S: PageSource<Value> + 'static>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let border_style = if app.search.focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = if app.list.search_pending() {
        " Search (waiting) "
    } else {
        " Search "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let paragraph = Paragraph::new(format!(" > {}", app.search.query))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn draw_table<S: PageSource<Value> + 'static>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
    // area height minus header
    let inner_height = area.height.saturating_sub(1) as usize;
    app.table.visible_rows = inner_height;

    let header = Row::new(["", "Option", "Value"].into_iter().map(|name| {
        Cell::from(name).style(
            Style::default()
                .fg(Color::White)
                .bg(colors::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .height(1);

    let total = app.list.items().len();
    let start = app.table.scroll_offset.min(total);
    let end = (start + inner_height).min(total);
    let value_field = app.list.config().value_field.clone();

    let rows: Vec<Row> = (start..end)
        .enumerate()
        .map(|(visual_idx, logical_idx)| {
            let is_cursor = app.table.selected == Some(logical_idx) && !app.search.focused;
            let marker = if app.list.is_selected(logical_idx) { "[x]" } else { "[ ]" };
            let label = app.list.render(logical_idx).unwrap_or_default();
            let value = app.list.items()[logical_idx]
                .get(&value_field)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();

            let bg = colors::row_background(is_cursor, visual_idx);
            let modifier = if is_cursor { Modifier::BOLD } else { Modifier::empty() };

            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(Color::Cyan).bg(bg)),
                Cell::from(label).style(Style::default().fg(Color::White).bg(bg).add_modifier(modifier)),
                Cell::from(value).style(Style::default().fg(Color::Gray).bg(bg)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(24),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::NONE));

    frame.render_widget(table, area);
}

fn draw_status_bar<S: PageSource<Value> + 'static>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let phase = app.list.state().phase();
    let left = Span::styled(
        format!(" [{}] ", colors::phase_label(phase)),
        Style::default().fg(colors::phase_color(phase)).bg(colors::STATUS_BG),
    );
    let message = format!("{} ", app.status_message);

    let right_text = " Tab:Focus  Enter:Pick  Space:Toggle  Esc:Back  Ctrl+Q:Quit ";

    let used = left.width() + message.len() + right_text.len();
    let padding = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        left,
        Span::styled(message, Style::default().fg(Color::White).bg(colors::STATUS_BG)),
        Span::styled(" ".repeat(padding), Style::default().bg(colors::STATUS_BG)),
        Span::styled(right_text, Style::default().fg(Color::DarkGray).bg(colors::STATUS_BG)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}
