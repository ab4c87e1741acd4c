use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use throbber_widgets_tui::{Throbber, ThrobberState, BRAILLE_SIX};

use warden::config::Theme;
use warden::data::User;
use warden::error::SaveError;
use warden::state::BoundEntityForm;
use warden::ui_utils::{accent, focused_block};

use super::users::active_label;

pub type UserForm = BoundEntityForm<u32, User>;

#[derive(Debug)]
pub struct UserDetailPage;

impl Default for UserDetailPage {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDetailPage {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        form: &UserForm,
        draft: Option<&User>,
        save_error: Option<&SaveError>,
        focused: bool,
        theme: Theme,
        throbber: &mut ThrobberState,
    ) {
        let title = match form.instance_id() {
            Some(pk) => format!("User #{pk}"),
            None => "User detail".to_string(),
        };
        let block = focused_block(title, focused, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [body, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

        let Some(user) = draft else {
            if form.is_loading() {
                let spinner = Throbber::default()
                    .label("Loading...")
                    .throbber_set(BRAILLE_SIX)
                    .throbber_style(Style::new().fg(accent(theme)));
                frame.render_stateful_widget(spinner, body, throbber);
            } else {
                frame.render_widget(
                    Paragraph::new("Open a user from the Users list with Enter.").dark_gray(),
                    body,
                );
            }
            return;
        };

        let mut lines = Vec::new();
        field(&mut lines, "Username", Line::from(user.username.clone()), "username", save_error, theme);
        field(&mut lines, "Name", Line::from(user.name.clone()), "name", save_error, theme);
        field(&mut lines, "Email", Line::from(user.email.clone()), "email", save_error, theme);
        field(&mut lines, "Active", active_label(user.is_active), "is_active", save_error, theme);
        lines.push(labelled(
            "Last login",
            Line::from(
                user.last_login
                    .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
            theme,
        ));
        lines.push(labelled("Groups", Line::from(user.groups.len().to_string()), theme));
        frame.render_widget(Paragraph::new(lines), body);

        let [hints, spinner] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(14)]).areas(footer);
        let mut spans = vec![Span::raw("t toggle active · w save").dark_gray()];
        if form.instance() != Some(user) {
            spans.push(Span::raw("  modified").italic().fg(accent(theme)));
        }
        frame.render_widget(Line::from(spans), hints);

        if form.is_submitting() || form.is_loading() {
            let label = if form.is_submitting() { "Saving" } else { "Loading" };
            let busy = Throbber::default()
                .label(label)
                .throbber_set(BRAILLE_SIX)
                .throbber_style(Style::new().fg(accent(theme)));
            frame.render_stateful_widget(busy, spinner, throbber);
        }
    }
}

fn labelled(label: &str, value: Line<'static>, theme: Theme) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{label:<12}"),
        Style::new().bold().fg(accent(theme)),
    )];
    spans.extend(value.spans);
    Line::from(spans)
}

/// Pushes a field line followed by any validation messages for it.
fn field(
    lines: &mut Vec<Line<'static>>,
    label: &str,
    value: Line<'static>,
    name: &str,
    save_error: Option<&SaveError>,
    theme: Theme,
) {
    lines.push(labelled(label, value, theme));
    let messages = save_error.map(|err| err.field_errors(name)).unwrap_or(&[]);
    for message in messages {
        lines.push(Line::from(format!("{:<12}{message}", "")).red());
    }
}
