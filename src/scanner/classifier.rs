//! Filename classification into movies and TV episodes.
//!
//! Episode patterns are tried in order and the first one yielding a non-zero
//! season and episode wins:
//!
//! 1. `Name S02E05`
//! 2. `Name 2x05`
//! 3. `Name Season 2 Episode 5`
//! 4. `Name E05` (season 1)
//!
//! Anything else is a movie. Only the file name is inspected; the folder it
//! lives in has no say.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Outcome of classifying a file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classification {
    Movie,
    Episode {
        show: String,
        season: u32,
        episode: u32,
    },
}

/// `Name.S01E02`, `Name - s1e2`, `Name_S01.E02`
static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)[\s._-]+s(\d{1,3})[\s._-]?e(\d{1,4})")
        .expect("Invalid season/episode pattern")
});

/// `Name 1x02`
static CROSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)[\s._-]+(\d{1,2})x(\d{1,3})(?:\D|$)").expect("Invalid NxNN pattern")
});

/// `Name Season 1 Episode 2`
static SPELLED_OUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)[\s._-]+season[\s._-]*(\d{1,3})[\s._-]*episode[\s._-]*(\d{1,4})")
        .expect("Invalid spelled-out pattern")
});

/// `Name E02`
static EPISODE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)[\s._-]+e(\d{1,4})(?:\D|$)").expect("Invalid episode-only pattern")
});

/// Classify a file name as a movie or an episode.
///
/// # Examples
///
/// ```
/// use mediadex::scanner::classifier::{classify, Classification};
///
/// assert_eq!(
///     classify("Show.Name.S02E05.1080p.mkv"),
///     Classification::Episode { show: "Show Name".into(), season: 2, episode: 5 }
/// );
/// assert_eq!(classify("Heat.1995.1080p.mkv"), Classification::Movie);
/// ```
pub fn classify(file_name: &str) -> Classification {
    let two_number = [&*SEASON_EPISODE, &*CROSS, &*SPELLED_OUT];

    for pattern in two_number {
        if let Some(caps) = pattern.captures(file_name) {
            let season = parse_number(caps.get(2).map(|m| m.as_str()));
            let episode = parse_number(caps.get(3).map(|m| m.as_str()));
            if let Some(found) = episode_from(&caps[1], season, episode) {
                return found;
            }
        }
    }

    if let Some(caps) = EPISODE_ONLY.captures(file_name) {
        let episode = parse_number(caps.get(2).map(|m| m.as_str()));
        if let Some(found) = episode_from(&caps[1], Some(1), episode) {
            return found;
        }
    }

    Classification::Movie
}

fn parse_number(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.parse().ok())
}

fn episode_from(raw_name: &str, season: Option<u32>, episode: Option<u32>) -> Option<Classification> {
    let (season, episode) = (season?, episode?);
    if season == 0 || episode == 0 {
        return None;
    }

    let show = clean_show_name(raw_name);
    if show.is_empty() {
        return None;
    }

    Some(Classification::Episode {
        show,
        season,
        episode,
    })
}

/// Turn dot/underscore separated names into spaced ones.
fn clean_show_name(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['-', ' '])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(show: &str, season: u32, episode: u32) -> Classification {
        Classification::Episode {
            show: show.to_string(),
            season,
            episode,
        }
    }

    #[test]
    fn test_season_episode_pattern() {
        assert_eq!(classify("Show.Name.S02E05.1080p.mkv"), episode("Show Name", 2, 5));
        assert_eq!(classify("the_office_s03e12.mp4"), episode("the office", 3, 12));
        assert_eq!(classify("Lost - S01E01 - Pilot.mkv"), episode("Lost", 1, 1));
        assert_eq!(classify("Dark S01.E03.mkv"), episode("Dark", 1, 3));
    }

    #[test]
    fn test_cross_pattern() {
        assert_eq!(classify("Friends 1x02.avi"), episode("Friends", 1, 2));
        assert_eq!(classify("Seinfeld.9x23.mkv"), episode("Seinfeld", 9, 23));
    }

    #[test]
    fn test_spelled_out_pattern() {
        assert_eq!(
            classify("Band of Brothers Season 1 Episode 4.mkv"),
            episode("Band of Brothers", 1, 4)
        );
    }

    #[test]
    fn test_episode_only_defaults_to_season_one() {
        assert_eq!(classify("Chernobyl.E03.mkv"), episode("Chernobyl", 1, 3));
    }

    #[test]
    fn test_movies() {
        assert_eq!(classify("Heat.1995.1080p.BluRay.x264-GROUP.mkv"), Classification::Movie);
        assert_eq!(classify("Inception (2010).mp4"), Classification::Movie);
        assert_eq!(classify("Movie.1920x1080.mkv"), Classification::Movie);
        assert_eq!(classify("S01E01.mkv"), Classification::Movie);
    }

    #[test]
    fn test_zero_numbers_fall_through() {
        // S00E05 is rejected; the trailing E05 is not preceded by a separator
        assert_eq!(classify("Show.S00E05.mkv"), Classification::Movie);
        assert_eq!(classify("Show.E00.mkv"), Classification::Movie);
    }

    #[test]
    fn test_episode_numbers_always_positive() {
        let names = [
            "A.S01E01.mkv",
            "B.0x00.mkv",
            "C Season 0 Episode 1.mkv",
            "D.E1.mkv",
            "E.S10E100.mkv",
        ];
        for name in names {
            if let Classification::Episode { season, episode, .. } = classify(name) {
                assert!(season >= 1 && episode >= 1, "{name}");
            }
        }
    }
}
