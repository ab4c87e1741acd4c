use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::Line,
    widgets::{Block, Clear, Paragraph},
    Frame,
};

use warden::config::Theme;
use warden::ui_utils::{accent, centered_rect, key_hint};

#[derive(Debug)]
pub struct HelpPage;

impl Default for HelpPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpPage {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: Theme) {
        let area = centered_rect(64, 26, area);
        // Clear the overlay so the page below does not bleed through
        frame.render_widget(Clear, area);
        let block = Block::bordered()
            .title(Line::from(" Help ").bold())
            .border_style(Style::new().fg(accent(theme)));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [nav, lists, detail, footer] = Layout::vertical([
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .areas(inner);

        let nav_help = vec![
            key_hint("Tab", "Cycle through views", theme),
            key_hint("Esc", "Back to menu / cancel search", theme),
            key_hint("Enter", "Open / confirm", theme),
            key_hint("r", "Refresh every view", theme),
            key_hint("?", "Toggle this help", theme),
            key_hint("q, Ctrl-C", "Quit", theme),
        ];
        frame.render_widget(
            Paragraph::new(nav_help).block(Block::new().title("Navigation".bold())),
            nav,
        );

        let list_help = vec![
            key_hint("↑ ↓", "Move the row cursor", theme),
            key_hint("← →", "Previous / next page", theme),
            key_hint("1-9", "Sort by column (again to reverse)", theme),
            key_hint("/", "Search", theme),
            key_hint("Space", "Select row (Users)", theme),
            key_hint("a", "Select / clear the whole page (Users)", theme),
            key_hint("e", "Expand row details (Users)", theme),
            key_hint("Enter", "Open user detail (Users)", theme),
        ];
        frame.render_widget(
            Paragraph::new(list_help).block(Block::new().title("Lists".bold())),
            lists,
        );

        let detail_help = vec![
            key_hint("t", "Toggle active", theme),
            key_hint("w", "Save", theme),
        ];
        frame.render_widget(
            Paragraph::new(detail_help).block(Block::new().title("User detail".bold())),
            detail,
        );

        frame.render_widget(
            Paragraph::new("Keys pressed while a page is loading are ignored.").dark_gray(),
            footer,
        );
    }
}
