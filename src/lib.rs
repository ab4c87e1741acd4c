//! Terminal admin console for identity-provider directories.
//!
//! The library holds everything the binary's pages are built from: the list and
//! form view state, the refresh bus connecting them, the in-memory directory
//! they talk to, and the widgets that draw them.

pub mod async_task;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod notification;
pub mod page;
pub mod refresh;
pub mod state;
pub mod ui_utils;
pub mod visibility;
pub mod widgets;

// Re-export main types used by the binary and benches
pub use config::{ConsoleConfig, Theme};
pub use data::{Directory, DirectoryData, Group, User};
pub use error::{FetchError, LoadError, ProgrammingError, SaveError, SourceError};
pub use notification::Notification;
pub use page::{Page, Pagination};
pub use refresh::{RefreshBus, RefreshListener};
