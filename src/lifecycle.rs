//! Listing status rules.
//!
//! The status set is flat: the owning seller may move a listing between any
//! of the four states, there is no enforced workflow and no automatic
//! transition. Visibility is the invariant that matters — only `active`
//! listings appear in public search and list results, while owner-scoped
//! queries see every status.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Reserved,
    Sold,
    Inactive,
}

impl ListingStatus {
    pub const ALL: [Self; 4] = [Self::Active, Self::Reserved, Self::Sold, Self::Inactive];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "reserved" => Some(Self::Reserved),
            "sold" => Some(Self::Sold),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reserved => "reserved",
            Self::Sold => "sold",
            Self::Inactive => "inactive",
        }
    }

    /// Whether a listing in this state shows up for non-owners.
    pub const fn is_publicly_visible(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
