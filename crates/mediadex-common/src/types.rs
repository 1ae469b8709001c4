//! Core type definitions shared by the catalog store and the ingestion core.
//!
//! All enums serialize in lowercase so they round-trip through TOML config
//! and SQLite text columns unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a watched folder is declared to contain.
///
/// Informational only: classification always comes from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHint {
    /// Folder holds movies.
    Movies,
    /// Folder holds TV episodes.
    Tv,
    /// Folder holds anything.
    #[default]
    Mixed,
}

impl fmt::Display for ContentHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movies => write!(f, "movies"),
            Self::Tv => write!(f, "tv"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for ContentHint {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movies" | "movie" => Ok(Self::Movies),
            "tv" | "tvshows" | "shows" => Ok(Self::Tv),
            "mixed" => Ok(Self::Mixed),
            other => Err(crate::Error::invalid_input(format!(
                "unknown content hint: {other}"
            ))),
        }
    }
}

/// Kind of catalog entity a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A feature film.
    Movie,
    /// A TV series.
    Tv,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Tv => write!(f, "tv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hint_parse() {
        assert_eq!("movies".parse::<ContentHint>().unwrap(), ContentHint::Movies);
        assert_eq!("TV".parse::<ContentHint>().unwrap(), ContentHint::Tv);
        assert_eq!("mixed".parse::<ContentHint>().unwrap(), ContentHint::Mixed);
        assert!("music".parse::<ContentHint>().is_err());
    }

    #[test]
    fn test_content_hint_display_roundtrip() {
        for hint in [ContentHint::Movies, ContentHint::Tv, ContentHint::Mixed] {
            assert_eq!(hint.to_string().parse::<ContentHint>().unwrap(), hint);
        }
    }
}
