//! Table rendering for [`CollectionView`].
//!
//! ```text
//! ┌ Users ───────────────────────────────────────────┐
//! │ Search: alice        ⠋ Loading   Selected: alice │  toolbar
//! │    Username ↓   Name ↕   Active                  │  header
//! │ [x] ▸ alice.chen   Alice Chen   yes              │  body
//! │ 1–20 of 45 · page 1/3                            │  footer
//! └──────────────────────────────────────────────────┘
//! ```

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use throbber_widgets_tui::{Throbber, ThrobberState, BRAILLE_SIX};

use crate::config::Theme;
use crate::page::Pagination;
use crate::state::{CollectionView, HeaderCell, Identified, RenderedRow, TableBody};
use crate::ui_utils::{accent, focused_block, highlight};

const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";
const EXPANDED: &str = "▾";
const COLLAPSED: &str = "▸";

/// Footer text: `start–end of count · page x/y`.
pub fn pagination_label(pagination: &Pagination) -> String {
    if pagination.count == 0 {
        return "0 of 0".to_string();
    }
    format!(
        "{}–{} of {} · page {}/{}",
        pagination.start_index,
        pagination.end_index,
        pagination.count,
        pagination.current,
        pagination.total_pages
    )
}

/// Header text of one column, with its sort indicator.
pub fn header_label(cell: &HeaderCell) -> String {
    let symbol = cell.indicator.symbol();
    if symbol.is_empty() {
        cell.title.clone()
    } else {
        format!("{} {symbol}", cell.title)
    }
}

/// Draws one collection view.
pub struct CollectionTable<'a, T> {
    view: &'a CollectionView<T>,
    title: &'a str,
    focused: bool,
    /// Search text being typed, shown instead of the applied search.
    search_input: Option<&'a str>,
    theme: Theme,
}

impl<'a, T> CollectionTable<'a, T>
where
    T: Identified + Clone + Send + 'static,
{
    pub fn new(view: &'a CollectionView<T>, title: &'a str) -> Self {
        Self {
            view,
            title,
            focused: false,
            search_input: None,
            theme: Theme::Default,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn search_input(mut self, input: Option<&'a str>) -> Self {
        self.search_input = input;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, throbber: &mut ThrobberState) {
        let block = focused_block(self.title, self.focused, self.theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [toolbar, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

        self.render_toolbar(frame, toolbar, throbber);
        match self.view.body() {
            TableBody::Loading => {
                let [_, middle, _] = Layout::vertical([
                    Constraint::Fill(1),
                    Constraint::Length(1),
                    Constraint::Fill(1),
                ])
                .areas(body);
                let spinner = Throbber::default()
                    .label("Loading...")
                    .throbber_set(BRAILLE_SIX)
                    .throbber_style(Style::new().fg(accent(self.theme)));
                frame.render_stateful_widget(spinner, middle, throbber);
            }
            TableBody::Empty(text) => {
                let height = text.height() as u16;
                let [_, middle, _] = Layout::vertical([
                    Constraint::Fill(1),
                    Constraint::Length(height),
                    Constraint::Fill(1),
                ])
                .areas(body);
                frame.render_widget(Paragraph::new(text).centered().dark_gray(), middle);
            }
            TableBody::Rows(rows) => self.render_rows(frame, body, rows),
        }

        let label = self
            .view
            .page()
            .map(|page| pagination_label(&page.pagination))
            .unwrap_or_default();
        frame.render_widget(Paragraph::new(label).right_aligned().dark_gray(), footer);
    }

    fn render_toolbar(&self, frame: &mut Frame, area: Rect, throbber: &mut ThrobberState) {
        let [left, spinner] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(14)]).areas(area);

        let mut spans = Vec::new();
        if self.view.options().searchable {
            spans.push(Span::styled("Search: ", Style::new().fg(accent(self.theme))));
            match self.search_input {
                Some(input) => {
                    spans.push(Span::raw(input.to_string()));
                    spans.push(Span::raw("_").slow_blink());
                }
                None => spans.push(Span::raw(self.view.search().unwrap_or("-").to_string())),
            }
            spans.push(Span::raw("  "));
        }

        let chips = self.view.chips();
        if !chips.is_empty() {
            spans.push(Span::styled("Selected:", Style::new().bold()));
            for chip in chips {
                spans.push(Span::raw(" "));
                spans.push(chip.on_dark_gray());
            }
        }
        frame.render_widget(Line::from(spans), left);

        // Stale rows stay on screen while a refetch runs; the spinner marks it.
        if self.view.is_loading() && self.view.page().is_some() {
            let busy = Throbber::default()
                .label("Loading")
                .throbber_set(BRAILLE_SIX)
                .throbber_style(Style::new().fg(accent(self.theme)));
            frame.render_stateful_widget(busy, spinner, throbber);
        }
    }

    fn render_rows(&self, frame: &mut Frame, area: Rect, rows: Vec<RenderedRow>) {
        let options = self.view.options();
        let markers = usize::from(options.selectable) + usize::from(options.expandable);
        let header = self.view.header();

        let mut widths = Vec::with_capacity(markers + header.len());
        if options.selectable {
            widths.push(Constraint::Length(3));
        }
        if options.expandable {
            widths.push(Constraint::Length(1));
        }
        widths.extend(header.iter().map(|_| Constraint::Fill(1)));

        let header_row = Row::new(
            std::iter::repeat_n(Cell::from(""), markers)
                .chain(header.iter().map(|cell| Cell::from(header_label(cell)))),
        )
        .style(Style::new().bold().fg(accent(self.theme)));

        // Expanded rows are followed by a detail row, so table rows and page
        // rows diverge after the first expansion.
        let mut table_rows = Vec::with_capacity(rows.len());
        let mut highlighted = None;
        for (idx, row) in rows.into_iter().enumerate() {
            if idx == self.view.cursor() {
                highlighted = Some(table_rows.len());
            }

            let mut cells = Vec::with_capacity(markers + row.cells.len());
            if let Some(selected) = row.selected {
                cells.push(Cell::from(if selected { CHECKED } else { UNCHECKED }));
            }
            if let Some(expanded) = row.expanded {
                cells.push(Cell::from(if expanded { EXPANDED } else { COLLAPSED }));
            }
            cells.extend(row.cells.into_iter().map(Cell::from));
            table_rows.push(Row::new(cells));

            if let Some(detail) = row.detail {
                table_rows.push(detail_row(detail, markers));
            }
        }

        let mut state = TableState::default().with_selected(highlighted);
        let table = Table::new(table_rows, widths)
            .header(header_row)
            .row_highlight_style(if self.focused {
                highlight(self.theme)
            } else {
                Style::new()
            });
        frame.render_stateful_widget(table, area, &mut state);
    }
}

fn detail_row(detail: Text<'static>, markers: usize) -> Row<'static> {
    let height = detail.height().max(1) as u16;
    Row::new(
        std::iter::repeat_n(Cell::from(""), markers)
            .chain(std::iter::once(Cell::from(detail.dark_gray()))),
    )
    .height(height)
}
