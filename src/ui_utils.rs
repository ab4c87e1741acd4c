use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, ListState},
};

use crate::config::Theme;

/// Creates a ListState with the selection clamped to the item count
pub fn create_list_state(selected: usize, item_count: usize) -> ListState {
    ListState::default().with_selected(Some(selected.min(item_count.saturating_sub(1))))
}

/// Accent color for titles, keys and focus borders
pub fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Default => Color::Yellow,
        Theme::HighContrast => Color::White,
    }
}

/// Style of the highlighted row in lists and tables
pub fn highlight(theme: Theme) -> Style {
    match theme {
        Theme::Default => Style::new().reversed(),
        Theme::HighContrast => Style::new().reversed().add_modifier(Modifier::BOLD),
    }
}

/// Creates a block with conditional focus styling
pub fn focused_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: Theme) -> Block<'a> {
    let block = Block::bordered().title(title);
    if is_focused {
        block.border_style(Style::new().fg(accent(theme)))
    } else {
        block
    }
}

/// Key and description pair as shown in hints and the help overlay
pub fn key_hint(key: &str, description: &str, theme: Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key:<10}"), Style::new().bold().fg(accent(theme))),
        Span::raw(description.to_string()),
    ])
}

/// A rect of fixed size centered in `area`, shrunk to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_state_clamps() {
        assert_eq!(create_list_state(9, 3).selected(), Some(2));
        assert_eq!(create_list_state(1, 3).selected(), Some(1));
        assert_eq!(create_list_state(4, 0).selected(), Some(0));
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(60, 20, area), Rect::new(20, 10, 60, 20));
        assert_eq!(centered_rect(200, 80, area), area);
    }
}
