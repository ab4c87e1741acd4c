use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use ratatui::{DefaultTerminal, Frame};
use throbber_widgets_tui::ThrobberState;
use tracing::{error, info};

use warden::config::ConsoleConfig;
use warden::data::{Directory, Group, User};
use warden::error::{FetchError, SaveError};
use warden::notification::Notification;
use warden::refresh::RefreshBus;
use warden::state::{CollectionView, FormEvent, Identified};
use warden::logging;
use warden::visibility::intersects;

/// Runs `$body` with `$view` bound to the list shown by the current view.
/// `None` when the current view is not a list.
macro_rules! with_collection {
    ($app:expr, |$view:ident| $body:expr) => {
        match $app.current_view {
            AppMode::Users => {
                let $view = &mut $app.users;
                Some($body)
            }
            AppMode::Groups => {
                let $view = &mut $app.groups;
                Some($body)
            }
            AppMode::UserDetail => None,
        }
    };
}

pub mod key_handler;
pub mod pages;
pub mod screen;
use key_handler::{ActionContext, ActionProcessor, Command, KeyAction, KeyHandler};
use pages::user_detail::UserForm;
use screen::{RenderContext, Screen, ScreenLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Users,
    Groups,
    UserDetail,
}

impl AppMode {
    pub const ALL: [AppMode; 3] = [AppMode::Users, AppMode::Groups, AppMode::UserDetail];

    pub fn next(self) -> Self {
        match self {
            AppMode::Users => AppMode::Groups,
            AppMode::Groups => AppMode::UserDetail,
            AppMode::UserDetail => AppMode::Users,
        }
    }

    pub fn menu_index(self) -> usize {
        match self {
            AppMode::Users => 0,
            AppMode::Groups => 1,
            AppMode::UserDetail => 2,
        }
    }

    pub fn from_menu_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            AppMode::Users => "Users",
            AppMode::Groups => "Groups",
            AppMode::UserDetail => "User detail",
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = ConsoleConfig::load()?;
    let _guard = logging::init(&config)?;

    let app = App::new(config)?;
    let terminal = ratatui::init();
    let result = app.run(terminal);
    ratatui::restore();
    if let Err(err) = &result {
        error!(error = %err, "console exited with an error");
    }
    result
}

pub struct App {
    running: bool,
    config: ConsoleConfig,
    screen: Screen,
    key_handler: KeyHandler,
    current_view: AppMode,
    focus: Focus,
    menu_selected_index: usize,
    show_help: bool,
    /// Search text being typed; `None` outside search mode.
    search_buffer: Option<String>,
    notification: Notification,
    throbber: ThrobberState,

    bus: RefreshBus,
    users: CollectionView<User>,
    groups: CollectionView<Group>,
    user_form: UserForm,
    draft: Option<User>,
    save_error: Option<SaveError>,

    /// Revisions of the views and the app's own state at the last draw.
    drawn: Option<[u64; 4]>,
    ui_revision: u64,
}

impl App {
    pub fn new(config: ConsoleConfig) -> color_eyre::Result<Self> {
        let directory = Arc::new(Directory::from_config(&config)?);

        let bus = RefreshBus::new();
        let users_scope = bus.scope("users");
        let groups_scope = bus.scope("groups");

        let mut users = pages::users::users_view(Arc::clone(&directory), config.page_size)
            .wrap_err("building users view")?;
        users.listen(&users_scope);
        let mut groups = pages::groups::groups_view(Arc::clone(&directory), config.page_size)
            .wrap_err("building groups view")?;
        groups.listen(&groups_scope);
        let mut user_form = UserForm::new("user", directory);
        user_form.listen(&users_scope);

        info!(page_size = config.page_size, theme = ?config.theme, "console started");

        Ok(Self {
            running: false,
            screen: Screen::new(),
            key_handler: KeyHandler::new(),
            current_view: AppMode::Users,
            focus: Focus::View,
            menu_selected_index: 0,
            show_help: false,
            search_buffer: None,
            notification: Notification::info("Ready | Press ? for help"),
            throbber: ThrobberState::default(),
            bus,
            users,
            groups,
            user_form,
            draft: None,
            save_error: None,
            drawn: None,
            ui_revision: 0,
            config,
        })
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        self.running = true;
        let tick_rate = self.config.tick_rate();
        while self.running {
            self.poll_views();
            if self.needs_redraw() {
                terminal.draw(|frame| self.render(frame))?;
                self.drawn = Some(self.revisions());
            }

            match self.key_handler.poll_crossterm_events(tick_rate)? {
                Some(action) => {
                    if self.handle_action(action) {
                        self.quit();
                    }
                }
                None => self.throbber.calc_next(),
            }
        }
        info!("console stopped");
        Ok(())
    }

    fn revisions(&self) -> [u64; 4] {
        [
            self.users.revision(),
            self.groups.revision(),
            self.user_form.revision(),
            self.ui_revision,
        ]
    }

    /// Redraw when any state moved, and every tick while something is loading
    /// so the spinners animate.
    fn needs_redraw(&self) -> bool {
        let busy = self.users.is_loading()
            || self.groups.is_loading()
            || self.user_form.is_loading()
            || self.user_form.is_submitting();
        busy || self.drawn != Some(self.revisions())
    }

    fn render(&mut self, frame: &mut Frame) {
        let layout = ScreenLayout::new(frame.area());
        let page_visible = intersects(layout.page, frame.area());
        let mode = self.current_view;
        self.users.mark_visible(page_visible && mode == AppMode::Users);
        self.groups.mark_visible(page_visible && mode == AppMode::Groups);
        self.user_form.mark_visible(page_visible && mode == AppMode::UserDetail);

        let ctx = RenderContext {
            mode,
            focus: self.focus,
            theme: self.config.theme,
            show_help: self.show_help,
            menu_selected_index: self.menu_selected_index,
            search_input: self.search_buffer.as_deref(),
            notification: &self.notification,
            users: &self.users,
            groups: &self.groups,
            user_form: &self.user_form,
            draft: self.draft.as_ref(),
            save_error: self.save_error.as_ref(),
        };
        self.screen.render(frame, &ctx, &mut self.throbber);
    }

    /// Applies finished remote calls and turns their outcomes into notifications.
    fn poll_views(&mut self) {
        if let Some(outcome) = self.users.poll() {
            self.notify_fetch("users", outcome);
        }
        if let Some(outcome) = self.groups.poll() {
            self.notify_fetch("groups", outcome);
        }
        if let Some(event) = self.user_form.poll() {
            self.on_form_event(event);
        }
    }

    fn notify_fetch(&mut self, what: &str, outcome: Result<usize, FetchError>) {
        self.notification = match outcome {
            Ok(rows) => Notification::info(format!("Loaded {rows} {what}")),
            Err(err) => Notification::from_error(&err),
        };
        self.touch();
    }

    fn on_form_event(&mut self, event: FormEvent) {
        let username = self
            .user_form
            .instance()
            .map(|u| u.username.clone())
            .unwrap_or_default();
        match event {
            FormEvent::Loaded => {
                self.notification = Notification::info(format!("Loaded {username}"));
                self.draft = self.user_form.instance().cloned();
                self.save_error = None;
            }
            FormEvent::LoadFailed(err) => {
                self.notification = Notification::from_error(&err);
            }
            FormEvent::Stale => {}
            FormEvent::Saved => {
                self.notification = Notification::success(format!("Saved {username}"));
                self.draft = self.user_form.instance().cloned();
                self.save_error = None;
            }
            FormEvent::SaveFailed(err) => {
                self.notification = Notification::from_error(&err);
                self.save_error = Some(err);
            }
        }
        self.touch();
    }

    fn handle_action(&mut self, action: KeyAction) -> bool {
        let ctx = ActionContext {
            focus: self.focus,
            current_view: self.current_view,
            show_help: self.show_help,
            search_active: self.search_buffer.is_some(),
            menu_selected_index: self.menu_selected_index,
        };
        // Any event, resizes included, warrants a redraw.
        self.touch();
        self.apply(ActionProcessor::process(action, &ctx))
    }

    /// Runs a command. Returns `true` when the app should quit.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => return true,
            Command::None => {}
            Command::ToggleHelp => self.show_help = !self.show_help,
            Command::FocusMenu => {
                self.focus = Focus::Menu;
                self.menu_selected_index = self.current_view.menu_index();
            }
            Command::MenuUp => {
                self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
            }
            Command::MenuDown => {
                let max = self.screen.menu_len().saturating_sub(1);
                self.menu_selected_index = (self.menu_selected_index + 1).min(max);
            }
            Command::Open(mode) => self.open(mode),
            Command::NextView => self.open(self.current_view.next()),
            Command::CursorUp => {
                with_collection!(self, |v| v.cursor_up());
            }
            Command::CursorDown => {
                with_collection!(self, |v| v.cursor_down());
            }
            Command::PreviousPage => {
                with_collection!(self, |v| v.previous_page());
            }
            Command::NextPage => {
                with_collection!(self, |v| v.next_page());
            }
            Command::Sort(column) => {
                with_collection!(self, |v| v.toggle_sort(column));
            }
            Command::ToggleSelect => {
                let cursor = self.users.cursor();
                self.users.toggle_selected_at(cursor);
            }
            Command::SelectAll => {
                let all_selected = self.users.page().is_some_and(|page| {
                    !page.results.is_empty() && page.results.iter().all(|u| self.users.is_selected(u))
                });
                self.users.select_all(!all_selected);
            }
            Command::ToggleExpand => {
                let cursor = self.users.cursor();
                self.users.toggle_expanded(cursor);
            }
            Command::StartSearch => {
                self.search_buffer =
                    with_collection!(self, |v| v.search().unwrap_or_default().to_string());
            }
            Command::SearchInput(c) => {
                if let Some(buffer) = self.search_buffer.as_mut() {
                    buffer.push(c);
                }
            }
            Command::SearchBackspace => {
                if let Some(buffer) = self.search_buffer.as_mut() {
                    buffer.pop();
                }
            }
            Command::SubmitSearch => {
                let text = self.search_buffer.take().unwrap_or_default();
                let applied = with_collection!(self, |v| v.set_search(&text));
                if applied == Some(false) {
                    self.notification = Notification::info("Still loading, search not applied");
                }
            }
            Command::CancelSearch => self.search_buffer = None,
            Command::OpenDetail => {
                if let Some(pk) = self.users.current_item().map(Identified::key) {
                    self.user_form.set_instance_id(pk);
                    self.draft = None;
                    self.save_error = None;
                    self.open(AppMode::UserDetail);
                }
            }
            Command::Refresh => {
                let listeners = self.bus.emit();
                self.notification = Notification::progress(format!("Refreshing {listeners} view(s)"));
            }
            Command::ToggleActive => {
                if let Some(draft) = self.draft.as_mut() {
                    draft.is_active = !draft.is_active;
                }
            }
            Command::Save => match self.draft.clone() {
                Some(draft) => {
                    if self.user_form.submit(draft) {
                        self.notification = Notification::progress("Saving");
                    } else {
                        self.notification = Notification::info("A save is already running");
                    }
                }
                None => self.notification = Notification::info("Nothing to save"),
            },
        }
        false
    }

    fn open(&mut self, mode: AppMode) {
        self.current_view = mode;
        self.menu_selected_index = mode.menu_index();
        self.focus = Focus::View;
        self.search_buffer = None;
    }

    fn touch(&mut self) {
        self.ui_revision = self.ui_revision.wrapping_add(1);
    }

    fn quit(&mut self) {
        self.running = false;
    }
}
