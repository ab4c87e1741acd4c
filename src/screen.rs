use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    Frame,
};
use throbber_widgets_tui::ThrobberState;

use warden::config::Theme;
use warden::data::{Group, User};
use warden::error::SaveError;
use warden::notification::{Level, Notification};
use warden::state::CollectionView;
use warden::widgets::CollectionTable;

use crate::pages::help::HelpPage;
use crate::pages::main_menu::MainMenu;
use crate::pages::user_detail::{UserDetailPage, UserForm};
use crate::{AppMode, Focus};

/// Frame regions, computed before drawing so views can be told whether they
/// are on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub menu: Rect,
    pub page: Rect,
    pub status: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let [header, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);
        let columns = Layout::new(
            Direction::Horizontal,
            [Constraint::Length(22), Constraint::Min(0)],
        )
        .split(body);
        Self {
            header,
            menu: columns[0],
            page: columns[1],
            status,
        }
    }
}

/// Everything the screen draws, borrowed from the app for one frame.
pub struct RenderContext<'a> {
    pub mode: AppMode,
    pub focus: Focus,
    pub theme: Theme,
    pub show_help: bool,
    pub menu_selected_index: usize,
    pub search_input: Option<&'a str>,
    pub notification: &'a Notification,
    pub users: &'a CollectionView<User>,
    pub groups: &'a CollectionView<Group>,
    pub user_form: &'a UserForm,
    pub draft: Option<&'a User>,
    pub save_error: Option<&'a SaveError>,
}

#[derive(Debug, Default)]
pub struct Screen {
    main_menu: MainMenu,
    help: HelpPage,
    user_detail: UserDetailPage,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            main_menu: MainMenu::new(),
            help: HelpPage::new(),
            user_detail: UserDetailPage::new(),
        }
    }

    pub fn menu_len(&self) -> usize {
        self.main_menu.get_items_count()
    }

    pub fn render(&self, frame: &mut Frame, ctx: &RenderContext, throbber: &mut ThrobberState) {
        let layout = ScreenLayout::new(frame.area());
        let title = Line::from(vec![
            Span::raw(" warden ").bold().reversed(),
            Span::raw(" identity directory console"),
        ]);
        frame.render_widget(title, layout.header);

        self.main_menu.render(
            frame,
            layout.menu,
            ctx.menu_selected_index,
            ctx.mode,
            ctx.focus,
            ctx.theme,
        );

        let focused = ctx.focus == Focus::View;
        match ctx.mode {
            AppMode::Users => CollectionTable::new(ctx.users, "Users")
                .focused(focused)
                .search_input(ctx.search_input)
                .theme(ctx.theme)
                .render(frame, layout.page, throbber),
            AppMode::Groups => CollectionTable::new(ctx.groups, "Groups")
                .focused(focused)
                .search_input(ctx.search_input)
                .theme(ctx.theme)
                .render(frame, layout.page, throbber),
            AppMode::UserDetail => self.user_detail.render(
                frame,
                layout.page,
                ctx.user_form,
                ctx.draft,
                ctx.save_error,
                focused,
                ctx.theme,
                throbber,
            ),
        }

        frame.render_widget(status_line(ctx.notification), layout.status);

        if ctx.show_help {
            self.help.render(frame, frame.area(), ctx.theme);
        }
    }
}

fn status_line(notification: &Notification) -> Line<'static> {
    let style = match notification.level {
        Level::Success => Style::new().green(),
        Level::Error => Style::new().red(),
        Level::Progress => Style::new().yellow(),
        Level::Info => Style::new().white(),
    };
    Line::from(vec![
        Span::styled(format!(" {notification} "), style),
        Span::raw(" |  Tab: Switch View  ?: Help  q: Quit").dark_gray(),
    ])
    .on_black()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_splits_menu_and_page() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 100, 30));
        assert_eq!(layout.header, Rect::new(0, 0, 100, 1));
        assert_eq!(layout.menu, Rect::new(0, 1, 22, 28));
        assert_eq!(layout.page, Rect::new(22, 1, 78, 28));
        assert_eq!(layout.status, Rect::new(0, 29, 100, 1));
    }

    #[test]
    fn test_tiny_terminal_leaves_no_page() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 20, 2));
        assert!(layout.page.is_empty());
    }
}
