use crate::search_list::Phase;
use ratatui::style::Color;

pub const HEADER_BG: Color = Color::Rgb(0, 95, 135);
pub const CURSOR_BG: Color = Color::Rgb(60, 60, 80);
pub const STRIPE_BG: Color = Color::Rgb(25, 25, 35);
pub const STATUS_BG: Color = Color::Rgb(40, 40, 50);

pub fn row_background(is_cursor: bool, visual_idx: usize) -> Color {
    if is_cursor {
        CURSOR_BG
    } else if visual_idx % 2 == 1 {
        STRIPE_BG
    } else {
        Color::Reset
    }
}

pub fn phase_color(phase: &Phase) -> Color {
    match phase {
        Phase::Idle => Color::Green,
        Phase::Loading { .. } => Color::Yellow,
        Phase::Failed { .. } => Color::Red,
    }
}

pub fn phase_label(phase: &Phase) -> &'static str {
    match phase {
        Phase::Idle => "ready",
        Phase::Loading { .. } => "loading",
        Phase::Failed { .. } => "failed",
    }
}
