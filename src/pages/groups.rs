use std::sync::Arc;

use ratatui::text::{Line, Text};

use warden::data::{Directory, Group};
use warden::error::ProgrammingError;
use warden::state::{CollectionOptions, CollectionView, Column, RowRenderer};

use super::users::active_label;

#[derive(Debug, Default)]
pub struct GroupRows;

impl RowRenderer<Group> for GroupRows {
    fn columns(&self) -> Vec<Column> {
        vec![
            Column::sortable("Name", "name"),
            Column::sortable("Superuser", "is_superuser"),
            Column::new("ID"),
        ]
    }

    fn row(&self, group: &Group) -> Vec<Line<'static>> {
        let id = group.pk.simple().to_string();
        vec![
            Line::from(group.name.clone()),
            active_label(group.is_superuser),
            Line::from(id[..8].to_string()),
        ]
    }

    fn empty_state(&self) -> Option<Text<'static>> {
        Some(Text::from(vec![
            Line::from("No groups found."),
            Line::from("Clear the search with / and Enter."),
        ]))
    }
}

/// The Groups list: searchable only.
pub fn groups_view(
    directory: Arc<Directory>,
    page_size: u32,
) -> Result<CollectionView<Group>, ProgrammingError> {
    CollectionView::<Group>::new(
        directory,
        Box::new(GroupRows),
        CollectionOptions::new("groups", page_size).searchable(),
    )
}
