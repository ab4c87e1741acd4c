//! Remote collection view state.
//!
//! [`CollectionView`] owns everything a paginated list page needs besides the
//! data itself: current page, ordering, search text, selection, and expanded
//! rows. Pages are fetched from a [`CollectionSource`] on a worker thread and
//! applied in [`CollectionView::poll`]. Rendering goes through a caller supplied
//! [`RowRenderer`]; the view never inspects item contents beyond their identity.
//!
//! # Fetch guard
//!
//! At most one fetch is in flight. Any trigger arriving while a fetch is pending
//! (refresh, page change, sort toggle, search) is dropped together with the state
//! change it wanted to make.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ratatui::text::{Line, Span, Text};
use tracing::{debug, warn};

use crate::async_task::TaskManager;
use crate::error::{FetchError, ProgrammingError, SourceError};
use crate::page::Page;
use crate::refresh::{RefreshBus, RefreshListener};
use crate::visibility::{Visibility, VisibilityChange};

const NO_OBJECTS: &str = "No objects found.";

/// Items that can be told apart across fetches.
///
/// Selection is tracked by key, so an item stays selected when a refetch returns
/// an updated copy of it.
pub trait Identified {
    type Key: PartialEq + fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// Snapshot of the request state a fetch is issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    /// Field name, `-` prefixed for descending order.
    pub ordering: Option<String>,
    pub search: Option<String>,
}

/// Fetches one page of a remote collection.
pub trait CollectionSource<T>: Send + Sync + 'static {
    fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>, SourceError>;
}

impl<T, F> CollectionSource<T> for F
where
    F: Fn(&PageRequest) -> Result<Page<T>, SourceError> + Send + Sync + 'static,
{
    fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>, SourceError> {
        self(request)
    }
}

/// Active ordering of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    field: String,
    descending: bool,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parses the wire form (`name` or `-name`).
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self::descending(field),
            None => Self::ascending(raw),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// A table column: title and the field it sorts by, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub order_by: Option<String>,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            order_by: None,
        }
    }

    pub fn sortable(title: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            order_by: Some(order_by.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    NotSortable,
    Unsorted,
    Ascending,
    Descending,
}

impl SortIndicator {
    pub fn symbol(self) -> &'static str {
        match self {
            SortIndicator::NotSortable => "",
            SortIndicator::Unsorted => "↕",
            SortIndicator::Ascending => "↓",
            SortIndicator::Descending => "↑",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub title: String,
    pub indicator: SortIndicator,
}

/// Renders items of one resource type.
pub trait RowRenderer<T> {
    fn columns(&self) -> Vec<Column>;

    /// One cell per column.
    fn row(&self, item: &T) -> Vec<Line<'static>>;

    /// Detail renderer for expandable views. Required when expansion is enabled.
    fn expansion(&self) -> Option<&dyn ExpandedRow<T>> {
        None
    }

    /// Replaces the default "no objects" placeholder.
    fn empty_state(&self) -> Option<Text<'static>> {
        None
    }

    /// Label shown for a selected item in the selection bar.
    fn selected_chip(&self, _item: &T) -> Option<Span<'static>> {
        None
    }
}

pub trait ExpandedRow<T> {
    fn expanded(&self, item: &T) -> Text<'static>;
}

/// Static configuration of a collection view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Used in log records.
    pub name: String,
    pub page_size: u32,
    pub selectable: bool,
    pub expandable: bool,
    pub searchable: bool,
}

impl CollectionOptions {
    pub fn new(name: impl Into<String>, page_size: u32) -> Self {
        Self {
            name: name.into(),
            page_size: page_size.max(1),
            selectable: false,
            expandable: false,
            searchable: false,
        }
    }

    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }

    pub fn expandable(mut self) -> Self {
        self.expandable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }
}

/// What the table body shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    /// No page has been received yet.
    Loading,
    /// A page arrived with nothing in it.
    Empty(Text<'static>),
    Rows(Vec<RenderedRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub cells: Vec<Line<'static>>,
    /// `None` when selection is disabled.
    pub selected: Option<bool>,
    /// `None` when expansion is disabled.
    pub expanded: Option<bool>,
    /// Expanded content, present only for expanded rows.
    pub detail: Option<Text<'static>>,
}

/// Paginated, sortable, searchable view over a remote collection.
pub struct CollectionView<T> {
    options: CollectionOptions,
    source: Arc<dyn CollectionSource<T>>,
    renderer: Box<dyn RowRenderer<T>>,
    tasks: TaskManager<Result<Page<T>, FetchError>>,
    refresh: Option<RefreshListener>,
    visibility: Visibility,

    page: Option<Page<T>>,
    page_number: u32,
    ordering: Option<SortKey>,
    search: Option<String>,
    loading: bool,
    selected: Vec<T>,
    expanded: Vec<bool>,
    cursor: usize,
    revision: u64,
}

impl<T> CollectionView<T>
where
    T: Identified + Clone + Send + 'static,
{
    /// Builds a view.
    ///
    /// # Errors
    ///
    /// Returns [`ProgrammingError::ExpansionWithoutRenderer`] when
    /// `options.expandable` is set but the renderer provides no expanded row.
    pub fn new(
        source: Arc<dyn CollectionSource<T>>,
        renderer: Box<dyn RowRenderer<T>>,
        options: CollectionOptions,
    ) -> Result<Self, ProgrammingError> {
        if options.expandable && renderer.expansion().is_none() {
            return Err(ProgrammingError::ExpansionWithoutRenderer {
                view: options.name.clone(),
            });
        }

        Ok(Self {
            options,
            source,
            renderer,
            tasks: TaskManager::new(),
            refresh: None,
            visibility: Visibility::new(),
            page: None,
            page_number: 1,
            ordering: None,
            search: None,
            loading: false,
            selected: Vec::new(),
            expanded: Vec::new(),
            cursor: 0,
            revision: 0,
        })
    }

    /// Starts with the given ordering instead of none.
    pub fn with_ordering(mut self, ordering: SortKey) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// Subscribes to refresh signals on `bus`.
    pub fn listen(&mut self, bus: &RefreshBus) {
        self.refresh = Some(bus.subscribe());
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn page(&self) -> Option<&Page<T>> {
        self.page.as_ref()
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn ordering(&self) -> Option<&SortKey> {
        self.ordering.as_ref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selected(&self) -> &[T] {
        &self.selected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    /// Bumped after every state change; redraw when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The request a fetch issued now would carry.
    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page_number,
            page_size: self.options.page_size,
            ordering: self.ordering.as_ref().map(SortKey::to_string),
            search: self.search.clone(),
        }
    }

    /// Fetches the current page. Returns `false` if a fetch is already running.
    pub fn fetch(&mut self) -> bool {
        if self.loading {
            debug!(view = %self.options.name, "fetch dropped, request in flight");
            return false;
        }

        let request = self.request();
        debug!(
            view = %self.options.name,
            page = request.page,
            ordering = ?request.ordering,
            search = ?request.search,
            "fetching page"
        );

        self.loading = true;
        let source = Arc::clone(&self.source);
        self.tasks.spawn(move || {
            source
                .fetch_page(&request)
                .map_err(|source| FetchError {
                    page: request.page,
                    source,
                })
        });
        self.touch();
        true
    }

    pub fn refresh(&mut self) -> bool {
        self.fetch()
    }

    /// Applies a refresh signal and a finished fetch, if any.
    ///
    /// Returns the outcome of the fetch that completed (number of rows received),
    /// or `None` if nothing finished. Failures are returned, not stored.
    pub fn poll(&mut self) -> Option<Result<usize, FetchError>> {
        self.take_refresh_signal();
        let outcome = self.tasks.try_recv()?;
        Some(self.apply(outcome))
    }

    /// Like [`CollectionView::poll`], waiting up to `timeout` for a running fetch.
    pub fn poll_blocking(&mut self, timeout: Duration) -> Option<Result<usize, FetchError>> {
        self.take_refresh_signal();
        let outcome = self.tasks.recv_timeout(timeout)?;
        Some(self.apply(outcome))
    }

    fn take_refresh_signal(&mut self) {
        if self.refresh.as_ref().is_some_and(RefreshListener::take) {
            debug!(view = %self.options.name, "refresh signal received");
            self.fetch();
        }
    }

    fn apply(&mut self, outcome: Result<Page<T>, FetchError>) -> Result<usize, FetchError> {
        self.loading = false;
        self.touch();

        match outcome {
            Ok(page) => {
                self.page_number = page.pagination.current.max(1);
                self.expanded.clear();
                self.selected = self
                    .selected
                    .iter()
                    .filter_map(|old| {
                        let key = old.key();
                        page.results.iter().find(|item| item.key() == key).cloned()
                    })
                    .collect();
                self.cursor = self.cursor.min(page.len().saturating_sub(1));

                let rows = page.len();
                debug!(
                    view = %self.options.name,
                    page = self.page_number,
                    rows,
                    count = page.pagination.count,
                    "page received"
                );
                self.page = Some(page);
                Ok(rows)
            }
            Err(err) => {
                warn!(view = %self.options.name, page = err.page, error = %err.source, "fetch failed");
                Err(err)
            }
        }
    }

    /// Reports whether the view is on screen. Fetches the first time it is.
    pub fn mark_visible(&mut self, visible: bool) -> VisibilityChange {
        let change = self.visibility.update(visible);
        if change == (VisibilityChange::Shown { first: true }) {
            self.fetch();
        }
        change
    }

    /// Jumps to page `number` (1-based) and fetches it.
    pub fn set_page(&mut self, number: u32) -> bool {
        if self.loading {
            debug!(view = %self.options.name, page = number, "page change dropped, request in flight");
            return false;
        }
        self.page_number = number.max(1);
        self.fetch()
    }

    pub fn next_page(&mut self) -> bool {
        match self.page.as_ref().and_then(|p| p.pagination.next_page()) {
            Some(next) => self.set_page(next),
            None => false,
        }
    }

    pub fn previous_page(&mut self) -> bool {
        match self.page.as_ref().and_then(|p| p.pagination.previous_page()) {
            Some(previous) => self.set_page(previous),
            None => false,
        }
    }

    /// Cycles ordering on a column: `field`, then `-field`, then `field` again.
    ///
    /// Returns `false` for columns without a sort key or while a fetch is running.
    pub fn toggle_sort(&mut self, column: usize) -> bool {
        let Some(field) = self
            .renderer
            .columns()
            .into_iter()
            .nth(column)
            .and_then(|c| c.order_by)
        else {
            return false;
        };
        if self.loading {
            debug!(view = %self.options.name, field = %field, "sort dropped, request in flight");
            return false;
        }

        let next = match &self.ordering {
            Some(current) if current.field() == field && !current.is_descending() => {
                SortKey::descending(field)
            }
            _ => SortKey::ascending(field),
        };
        self.ordering = Some(next);
        self.fetch()
    }

    /// Sets the search text and fetches from the first page. Blank text clears it.
    pub fn set_search(&mut self, text: &str) -> bool {
        if !self.options.searchable {
            return false;
        }
        if self.loading {
            debug!(view = %self.options.name, "search dropped, request in flight");
            return false;
        }

        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self.page_number = 1;
        self.fetch()
    }

    pub fn is_selected(&self, item: &T) -> bool {
        let key = item.key();
        self.selected.iter().any(|s| s.key() == key)
    }

    /// Selects every item of the current page, or clears the selection.
    pub fn select_all(&mut self, checked: bool) -> bool {
        if !self.options.selectable {
            return false;
        }
        self.selected = if checked {
            self.page
                .as_ref()
                .map(|p| p.results.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        self.touch();
        true
    }

    /// Adds or removes one item. Returns `true` if the selection changed.
    pub fn set_selected(&mut self, item: &T, checked: bool) -> bool {
        if !self.options.selectable {
            return false;
        }

        let key = item.key();
        let position = self.selected.iter().position(|s| s.key() == key);
        let changed = match (checked, position) {
            (true, None) => {
                self.selected.push(item.clone());
                true
            }
            (false, Some(idx)) => {
                self.selected.remove(idx);
                true
            }
            _ => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    /// Flips selection of the row at `index` on the current page.
    pub fn toggle_selected_at(&mut self, index: usize) -> bool {
        let Some(item) = self.page.as_ref().and_then(|p| p.results.get(index)).cloned() else {
            return false;
        };
        let checked = !self.is_selected(&item);
        self.set_selected(&item, checked)
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.get(index).copied().unwrap_or(false)
    }

    /// Expands or collapses the row at `index`.
    pub fn toggle_expanded(&mut self, index: usize) -> bool {
        if !self.options.expandable {
            return false;
        }
        if index >= self.page.as_ref().map_or(0, Page::len) {
            return false;
        }

        if self.expanded.len() <= index {
            self.expanded.resize(index + 1, false);
        }
        self.expanded[index] = !self.expanded[index];
        self.touch();
        true
    }

    /// Moves the row cursor up. Returns `true` if it moved.
    pub fn cursor_up(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.touch();
            true
        } else {
            false
        }
    }

    /// Moves the row cursor down. Returns `true` if it moved.
    pub fn cursor_down(&mut self) -> bool {
        let max_index = self.page.as_ref().map_or(0, Page::len).saturating_sub(1);
        if self.cursor < max_index {
            self.cursor += 1;
            self.touch();
            true
        } else {
            false
        }
    }

    /// Item under the cursor.
    pub fn current_item(&self) -> Option<&T> {
        self.page.as_ref().and_then(|p| p.results.get(self.cursor))
    }

    pub fn header(&self) -> Vec<HeaderCell> {
        self.renderer
            .columns()
            .into_iter()
            .map(|column| {
                let indicator = match (&column.order_by, &self.ordering) {
                    (None, _) => SortIndicator::NotSortable,
                    (Some(field), Some(key)) if key.field() == field.as_str() => {
                        if key.is_descending() {
                            SortIndicator::Descending
                        } else {
                            SortIndicator::Ascending
                        }
                    }
                    (Some(_), _) => SortIndicator::Unsorted,
                };
                HeaderCell {
                    title: column.title,
                    indicator,
                }
            })
            .collect()
    }

    /// Builds the body render model from the current state.
    pub fn body(&self) -> TableBody {
        let Some(page) = &self.page else {
            return TableBody::Loading;
        };
        if page.is_empty() {
            return TableBody::Empty(
                self.renderer
                    .empty_state()
                    .unwrap_or_else(|| Text::from(NO_OBJECTS)),
            );
        }

        let expansion = if self.options.expandable {
            self.renderer.expansion()
        } else {
            None
        };

        let rows = page
            .results
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let expanded = self.is_expanded(idx);
                RenderedRow {
                    cells: self.renderer.row(item),
                    selected: self.options.selectable.then(|| self.is_selected(item)),
                    expanded: self.options.expandable.then_some(expanded),
                    detail: expansion
                        .filter(|_| expanded)
                        .map(|renderer| renderer.expanded(item)),
                }
            })
            .collect();
        TableBody::Rows(rows)
    }

    /// Chip labels for the selection bar.
    pub fn chips(&self) -> Vec<Span<'static>> {
        self.selected
            .iter()
            .filter_map(|item| self.renderer.selected_chip(item))
            .collect()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
