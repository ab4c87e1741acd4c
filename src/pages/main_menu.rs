use ratatui::{
    layout::Rect,
    widgets::{List, ListItem},
    Frame,
};

use warden::config::Theme;
use warden::ui_utils::{create_list_state, focused_block, highlight};

use crate::{AppMode, Focus};

#[derive(Debug)]
pub struct MainMenu {
    pub menu_items: Vec<AppMode>,
}

impl Default for MainMenu {
    fn default() -> Self {
        Self::new()
    }
}

impl MainMenu {
    pub fn new() -> Self {
        Self {
            menu_items: AppMode::ALL.to_vec(),
        }
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        selected_index: usize,
        current: AppMode,
        focus: Focus,
        theme: Theme,
    ) {
        let mut state = create_list_state(selected_index, self.menu_items.len());

        let items: Vec<ListItem> = self
            .menu_items
            .iter()
            .map(|mode| {
                let marker = if *mode == current { "● " } else { "  " };
                ListItem::new(format!("{marker}{}", mode.title()))
            })
            .collect();

        frame.render_stateful_widget(
            List::new(items)
                .block(focused_block("Menu", focus == Focus::Menu, theme))
                .highlight_style(if focus == Focus::Menu {
                    highlight(theme)
                } else {
                    ratatui::style::Style::new()
                })
                .highlight_symbol(">> ")
                .repeat_highlight_symbol(true),
            area,
            &mut state,
        );
    }

    pub fn get_items_count(&self) -> usize {
        self.menu_items.len()
    }
}
