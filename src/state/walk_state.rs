/// Walk state definitions for per-category pagination
///
/// A listing walker starts `Active` and ends in exactly one terminal state.
use std::fmt;

/// Represents the current state of one category's listing walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    /// More pages may exist; the next request uses the current cursor
    Active,

    // ===== Terminal States =====
    /// An empty listing page was observed
    Exhausted,

    /// A listing request failed or returned an unexpected shape
    Failed,
}

impl WalkState {
    /// Returns true if no further page requests will be issued
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Returns true if the walk ended by running out of pages
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
