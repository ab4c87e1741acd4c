//! Reusable ratatui widgets built on the view state in [`crate::state`].

pub mod table;

pub use table::{header_label, pagination_label, CollectionTable};
