/// Crawl state definitions for tracking a run's lifecycle
///
/// A coordinator moves `Idle -> Running -> {Done, Failed}` exactly once.
use crate::CrawlerError;
use std::fmt;

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Coordinator built, nothing fetched yet
    Idle,

    /// Fetches are in flight
    Running,

    /// Budget reached or pagination exhausted
    Done,

    /// A fetch or write failed and the run was aborted
    Failed,
}

impl CrawlState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running) | (Self::Running, Self::Done) | (Self::Running, Self::Failed)
        )
    }

    /// Performs a transition, rejecting illegal ones
    pub fn transition(self, next: CrawlState) -> Result<CrawlState, CrawlerError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CrawlerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
