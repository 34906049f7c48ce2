//! Typed game lifecycle
//!
//! The filesystem artifacts (game directory, history file, completion
//! marker) back the lifecycle, but callers get one [`GameLifecycle`] value
//! instead of stacking independent existence checks.

use serde::Serialize;

/// Where a game id stands in its lifecycle
///
/// Transitions only move forward:
/// `Unallocated -> Reserved -> Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameLifecycle {
    /// No directory for this id
    Unallocated,
    /// Id allocated, history not written yet
    Reserved,
    /// History present, game still running (or its driver died)
    Active,
    /// Completion marker present
    Completed,
}

impl GameLifecycle {
    pub fn is_allocated(self) -> bool {
        self != GameLifecycle::Unallocated
    }

    /// Whether a driver may still append to this game
    pub fn accepts_moves(self) -> bool {
        matches!(self, GameLifecycle::Reserved | GameLifecycle::Active)
    }

    pub fn label(self) -> &'static str {
        match self {
            GameLifecycle::Unallocated => "unallocated",
            GameLifecycle::Reserved => "reserved",
            GameLifecycle::Active => "active",
            GameLifecycle::Completed => "completed",
        }
    }
}
