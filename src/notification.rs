//! Status line notifications.
//!
//! Views hand failures back from `poll()` instead of storing them; the host page
//! turns them into a [`Notification`] for the status line.

use std::fmt;

/// Success indicator (✓)
pub const SUCCESS: &str = "✓";

/// Error indicator (✗)
pub const ERROR: &str = "✗";

/// Progress/loading indicator (⟳)
pub const PROGRESS: &str = "⟳";

/// Information indicator (ℹ)
pub const INFO: &str = "ℹ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Progress,
    Info,
}

impl Level {
    pub fn symbol(self) -> &'static str {
        match self {
            Level::Success => SUCCESS,
            Level::Error => ERROR,
            Level::Progress => PROGRESS,
            Level::Info => INFO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::new(Level::Progress, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Builds an error notification from an error and its source chain.
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::error(message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Progress => write!(f, "{} {}...", self.level.symbol(), self.message),
            _ => write!(f, "{} {}", self.level.symbol(), self.message),
        }
    }
}
