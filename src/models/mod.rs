pub mod bet;
pub mod profile;

pub use bet::{combined_coef, Bet, BetDraft, BetEvent, BetKind, BetStatus};
pub use profile::{Profile, ProfileDraft};

use std::fmt;

/// Sentinel shared by UI filters and remote queries meaning "no filter".
pub const ALL: &str = "all";

// ---------------------------------------------------------------------------
// StatusFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(BetStatus),
}

impl StatusFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Some(StatusFilter::All);
        }
        BetStatus::from_str(s).map(StatusFilter::Only)
    }

    pub fn matches(&self, status: BetStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str(ALL),
            StatusFilter::Only(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ProfileFilter: also the "active profile" selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileFilter {
    #[default]
    All,
    Profile(i64),
}

impl ProfileFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            return Some(ProfileFilter::All);
        }
        s.trim().parse().ok().map(ProfileFilter::Profile)
    }

    /// The profile id new bets are tagged with, `None` for "all".
    pub fn profile_id(&self) -> Option<i64> {
        match self {
            ProfileFilter::All => None,
            ProfileFilter::Profile(id) => Some(*id),
        }
    }

    /// Unassigned bets only show up under "all".
    pub fn matches(&self, profile_id: Option<i64>) -> bool {
        match self {
            ProfileFilter::All => true,
            ProfileFilter::Profile(id) => profile_id == Some(*id),
        }
    }
}

impl fmt::Display for ProfileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFilter::All => f.write_str(ALL),
            ProfileFilter::Profile(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// BetFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetFilter {
    pub status: StatusFilter,
    pub profile: ProfileFilter,
}

impl BetFilter {
    pub fn new(status: StatusFilter, profile: ProfileFilter) -> Self {
        Self { status, profile }
    }

    pub fn matches(&self, bet: &Bet) -> bool {
        self.status.matches(bet.status) && self.profile.matches(bet.profile_id)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.status == StatusFilter::All && self.profile == ProfileFilter::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert_eq!(StatusFilter::from_str("all"), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::from_str("lose"),
            Some(StatusFilter::Only(BetStatus::Lose))
        );
        assert_eq!(ProfileFilter::from_str("ALL"), Some(ProfileFilter::All));
        assert_eq!(ProfileFilter::from_str("12"), Some(ProfileFilter::Profile(12)));
        assert_eq!(ProfileFilter::from_str("abc"), None);
    }

    #[test]
    fn test_profile_filter_excludes_unassigned() {
        assert!(ProfileFilter::All.matches(None));
        assert!(!ProfileFilter::Profile(3).matches(None));
        assert!(ProfileFilter::Profile(3).matches(Some(3)));
        assert!(!ProfileFilter::Profile(3).matches(Some(4)));
    }

    #[test]
    fn test_filter_display_uses_sentinel() {
        assert_eq!(StatusFilter::All.to_string(), "all");
        assert_eq!(StatusFilter::Only(BetStatus::Win).to_string(), "win");
        assert_eq!(ProfileFilter::Profile(5).to_string(), "5");
    }
}
