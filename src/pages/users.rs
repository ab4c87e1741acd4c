use std::sync::Arc;

use ratatui::{
    style::Stylize,
    text::{Line, Span, Text},
};

use warden::data::{Directory, User};
use warden::error::ProgrammingError;
use warden::state::{
    CollectionOptions, CollectionView, Column, ExpandedRow, RowRenderer, SortKey,
};

/// Renders users as rows: username, name, active flag and last login.
#[derive(Debug, Default)]
pub struct UserRows;

impl RowRenderer<User> for UserRows {
    fn columns(&self) -> Vec<Column> {
        vec![
            Column::sortable("Username", "username"),
            Column::sortable("Name", "name"),
            Column::sortable("Active", "is_active"),
            Column::sortable("Last login", "last_login"),
        ]
    }

    fn row(&self, user: &User) -> Vec<Line<'static>> {
        vec![
            Line::from(user.username.clone()),
            Line::from(user.name.clone()),
            active_label(user.is_active),
            Line::from(last_login_label(user, "%Y-%m-%d")),
        ]
    }

    fn expansion(&self) -> Option<&dyn ExpandedRow<User>> {
        Some(self)
    }

    fn selected_chip(&self, user: &User) -> Option<Span<'static>> {
        Some(Span::raw(user.username.clone()))
    }
}

impl ExpandedRow<User> for UserRows {
    fn expanded(&self, user: &User) -> Text<'static> {
        Text::from(vec![
            Line::from(format!("ID {}  ·  {}", user.pk, display_or_dash(&user.email))),
            Line::from(format!(
                "{} group(s)  ·  last login {}",
                user.groups.len(),
                last_login_label(user, "%Y-%m-%d %H:%M UTC")
            )),
        ])
    }
}

pub fn active_label(active: bool) -> Line<'static> {
    if active {
        Line::from("yes".green())
    } else {
        Line::from("no".red())
    }
}

fn last_login_label(user: &User, format: &str) -> String {
    user.last_login
        .map(|at| at.format(format).to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// The Users list: selectable, expandable, searchable, ordered by username.
pub fn users_view(
    directory: Arc<Directory>,
    page_size: u32,
) -> Result<CollectionView<User>, ProgrammingError> {
    let options = CollectionOptions::new("users", page_size)
        .selectable()
        .expandable()
        .searchable();
    Ok(CollectionView::<User>::new(directory, Box::new(UserRows), options)?
        .with_ordering(SortKey::ascending("username")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user() -> User {
        User {
            pk: 7,
            username: "grace.davis".into(),
            name: "Grace Davis".into(),
            email: String::new(),
            is_active: false,
            last_login: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 0).single(),
            groups: Vec::new(),
        }
    }

    #[test]
    fn test_row_cells_match_columns() {
        let cells = UserRows.row(&user());
        assert_eq!(cells.len(), UserRows.columns().len());
        assert_eq!(cells[3], Line::from("2026-03-04"));
    }

    #[test]
    fn test_expanded_detail() {
        let text = UserRows.expanded(&user());
        assert_eq!(text.lines[0], Line::from("ID 7  ·  -"));
        assert_eq!(
            text.lines[1],
            Line::from("0 group(s)  ·  last login 2026-03-04 05:06 UTC")
        );
    }

    #[test]
    fn test_view_is_built_with_expansion() {
        let view = users_view(Arc::new(Directory::sample()), 20).unwrap();
        assert!(view.options().expandable);
        assert_eq!(view.request().ordering.as_deref(), Some("username"));
    }
}
