//! Pagination state machine definitions
//!
//! `Init -> Loaded(n) -> { Loaded(n + 1) | Exhausted | Error }`
use std::fmt;

/// Why pagination stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExhaustReason {
    /// No visible Load-More control on the current snapshot
    NoControl,

    /// The configured number of load cycles was reached
    MaxLoads,

    /// Both the click path and the background-request fallback failed
    LoadMoreFailed,

    /// The session's time budget ran out
    Budget,
}

impl ExhaustReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoControl => "no load-more control",
            Self::MaxLoads => "max loads reached",
            Self::LoadMoreFailed => "load-more failed",
            Self::Budget => "time budget exceeded",
        }
    }
}

/// Current position of the listing crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationState {
    /// Listing page not opened yet
    Init,

    /// Initial snapshot plus `n` successful load cycles captured
    Loaded(u32),

    /// Normal termination
    Exhausted(ExhaustReason),

    /// Phase-terminating failure; collected records are kept
    Error(String),
}

impl PaginationState {
    /// Returns true if this is a terminal state (no further loads)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::Error(_))
    }

    /// Number of successful load cycles, if any snapshot was captured
    pub fn loads(&self) -> Option<u32> {
        match self {
            Self::Loaded(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Loaded(n) => write!(f, "loaded({})", n),
            Self::Exhausted(reason) => write!(f, "exhausted: {}", reason.as_str()),
            Self::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}
