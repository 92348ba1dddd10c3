use std::fmt;

/// Enrichment progress of a single record
///
/// Records whose listing description was complete start as `NotNeeded`;
/// truncated ones start as `Pending`. Both may only move forward to `Done`
/// or `Failed`, and those two are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnrichmentState {
    /// Listing description was complete
    #[default]
    NotNeeded,

    /// Truncated description waiting for a detail-page visit
    Pending,

    /// Full description merged from the detail page
    Done,

    /// Detail page could not provide a description
    Failed,
}

impl EnrichmentState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving to `next` is allowed
    pub fn can_transition_to(&self, next: EnrichmentState) -> bool {
        matches!(
            (self, next),
            (Self::NotNeeded | Self::Pending, Self::Done | Self::Failed)
        )
    }

    /// Converts the state to a log-friendly string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotNeeded => "not_needed",
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EnrichmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
