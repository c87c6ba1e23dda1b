//! Data returned by the provider's "top items" endpoints, plus the
//! time-window parameter that scopes them.

use serde::{Deserialize, Serialize};

/// Time window for "top items" queries.
///
/// The provider understands exactly three windows; anything else is a
/// client error, never silently substituted with a default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Roughly the last 4 weeks
    ShortTerm,
    /// Roughly the last 6 months
    MediumTerm,
    /// All time
    LongTerm,
}

impl TimeRange {
    /// Parse the wire form (`short_term` / `medium_term` / `long_term`).
    pub fn parse(s: &str) -> Option<TimeRange> {
        match s {
            "short_term" => Some(TimeRange::ShortTerm),
            "medium_term" => Some(TimeRange::MediumTerm),
            "long_term" => Some(TimeRange::LongTerm),
            _ => None,
        }
    }

    /// The wire form, as sent to the provider and echoed in views.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    /// Human label for views.
    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "last 4 weeks",
            TimeRange::MediumTerm => "last 6 months",
            TimeRange::LongTerm => "all time",
        }
    }
}

/// One of the user's top tracks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Performing artist names, in billing order
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Link to the track on the provider
    pub url: Option<String>,
}

/// One of the user's top artists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    pub genres: Vec<String>,
    /// Link to the artist on the provider
    pub url: Option<String>,
}
