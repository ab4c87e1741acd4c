use crate::{AppMode, Focus};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    Quit,
    Back,
    NextView,
    NavigateUp,
    NavigateDown,
    NavigateLeft,
    NavigateRight,
    Select,
    InputChar(char),
    Backspace,
    None,
}

#[derive(Debug, Default)]
pub struct KeyHandler;

impl KeyHandler {
    pub fn new() -> Self {
        Self
    }

    /// Waits up to `timeout` for a terminal event. `None` means the tick elapsed.
    pub fn poll_crossterm_events(&mut self, timeout: Duration) -> color_eyre::Result<Option<KeyAction>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            // it's important to check KeyEventKind::Press to avoid handling key release events
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(self.on_key_event(key))),
            Event::Resize(_, _) => Ok(Some(KeyAction::None)),
            _ => Ok(Some(KeyAction::None)),
        }
    }

    /// Letters are passed through as input; the processor decides whether a
    /// letter is a command or search text.
    pub fn on_key_event(&mut self, key: KeyEvent) -> KeyAction {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => KeyAction::Quit,
            (_, KeyCode::Esc) => KeyAction::Back,
            (_, KeyCode::Tab) => KeyAction::NextView,
            (_, KeyCode::Up) => KeyAction::NavigateUp,
            (_, KeyCode::Down) => KeyAction::NavigateDown,
            (_, KeyCode::Left) => KeyAction::NavigateLeft,
            (_, KeyCode::Right) => KeyAction::NavigateRight,
            (_, KeyCode::Enter) => KeyAction::Select,
            (_, KeyCode::Backspace) => KeyAction::Backspace,
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => KeyAction::InputChar(c),
            _ => KeyAction::None,
        }
    }
}

/// What the app should do in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleHelp,
    FocusMenu,
    MenuUp,
    MenuDown,
    Open(AppMode),
    NextView,
    CursorUp,
    CursorDown,
    PreviousPage,
    NextPage,
    Sort(usize),
    ToggleSelect,
    SelectAll,
    ToggleExpand,
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    SubmitSearch,
    CancelSearch,
    OpenDetail,
    Refresh,
    ToggleActive,
    Save,
    None,
}

/// Context passed to the processor to enable decision-making
#[derive(Debug, Clone, Copy)]
pub struct ActionContext {
    pub focus: Focus,
    pub current_view: AppMode,
    pub show_help: bool,
    pub search_active: bool,
    pub menu_selected_index: usize,
}

/// Stateless action processor: takes action + context, returns the command to run
pub struct ActionProcessor;

impl ActionProcessor {
    pub fn process(action: KeyAction, ctx: &ActionContext) -> Command {
        if action == KeyAction::Quit {
            return Command::Quit;
        }
        if ctx.show_help {
            return match action {
                KeyAction::Back | KeyAction::InputChar('?') => Command::ToggleHelp,
                KeyAction::InputChar('q') => Command::Quit,
                _ => Command::None,
            };
        }
        if ctx.search_active {
            return Self::handle_search(action);
        }

        match action {
            KeyAction::NextView => Command::NextView,
            KeyAction::Back => match ctx.focus {
                Focus::Menu => Command::Quit,
                Focus::View => Command::FocusMenu,
            },
            KeyAction::InputChar('q') => Command::Quit,
            KeyAction::InputChar('?') => Command::ToggleHelp,
            KeyAction::InputChar('r') => Command::Refresh,
            _ if ctx.focus == Focus::Menu => Self::handle_menu(action, ctx),
            _ => Self::handle_view(action, ctx.current_view),
        }
    }

    fn handle_search(action: KeyAction) -> Command {
        match action {
            KeyAction::InputChar(c) => Command::SearchInput(c),
            KeyAction::Backspace => Command::SearchBackspace,
            KeyAction::Select => Command::SubmitSearch,
            KeyAction::Back => Command::CancelSearch,
            _ => Command::None,
        }
    }

    fn handle_menu(action: KeyAction, ctx: &ActionContext) -> Command {
        match action {
            KeyAction::NavigateUp => Command::MenuUp,
            KeyAction::NavigateDown => Command::MenuDown,
            KeyAction::Select => match AppMode::from_menu_index(ctx.menu_selected_index) {
                Some(mode) => Command::Open(mode),
                None => Command::None,
            },
            _ => Command::None,
        }
    }

    fn handle_view(action: KeyAction, view: AppMode) -> Command {
        let collection = matches!(view, AppMode::Users | AppMode::Groups);
        match action {
            KeyAction::NavigateUp if collection => Command::CursorUp,
            KeyAction::NavigateDown if collection => Command::CursorDown,
            KeyAction::NavigateLeft if collection => Command::PreviousPage,
            KeyAction::NavigateRight if collection => Command::NextPage,
            KeyAction::Select if view == AppMode::Users => Command::OpenDetail,
            KeyAction::InputChar('/') if collection => Command::StartSearch,
            KeyAction::InputChar(c @ '1'..='9') if collection => {
                Command::Sort(c as usize - '1' as usize)
            }
            KeyAction::InputChar(' ') if view == AppMode::Users => Command::ToggleSelect,
            KeyAction::InputChar('a') if view == AppMode::Users => Command::SelectAll,
            KeyAction::InputChar('e') if view == AppMode::Users => Command::ToggleExpand,
            KeyAction::InputChar('t') if view == AppMode::UserDetail => Command::ToggleActive,
            KeyAction::InputChar('w') if view == AppMode::UserDetail => Command::Save,
            _ => Command::None,
        }
    }
}
