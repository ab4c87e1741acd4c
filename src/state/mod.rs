//! View state for the console's pages.
//!
//! Pages are built from two reusable pieces of state that own everything except
//! the data itself and how it is drawn:
//!
//! ```text
//! Page
//! ├── CollectionView<T>      - paginated, sortable, selectable remote list
//! └── BoundEntityForm<K, T>  - single remote entity, loaded when visible
//! ```
//!
//! Both run their remote calls through a background task manager, apply results
//! in `poll()`, and reload when a refresh signal arrives on the bus they listen to.

mod collection;
mod entity_form;

pub use collection::{
    CollectionOptions, CollectionSource, CollectionView, Column, ExpandedRow, HeaderCell,
    Identified, PageRequest, RenderedRow, RowRenderer, SortIndicator, SortKey, TableBody,
};
pub use entity_form::{BoundEntityForm, EntityKey, EntitySource, FormEvent};
