//! Release-name cleanup for catalog searches.
//!
//! Scene and P2P file names carry a lot of noise around the actual title:
//! site prefixes, group tags, resolutions, codecs, languages. [`clean_title`]
//! peels those away in a fixed order so the remainder can be sent to the
//! catalog as a search query.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use mediadex_common::paths::is_video_file;

/// `www.Site.com - ` style prefixes left by download sites.
static SITE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:www\.)?[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|net|org|info|tv|to|me|cc|io|ws|se|ru|co|in)\s*-\s*",
    )
    .expect("Invalid site prefix pattern")
});

/// Leading `[Group] ` tags.
static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]*\]\s*").expect("Invalid leading tag pattern"));

/// `AKA` marker introducing an alternate title.
static AKA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s._-]aka[\s._-]").expect("Invalid AKA pattern"));

/// First quality, codec, audio, language, or scene token.
static NOISE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:^|[\s._\-\[\(])
        (?:
            2160p|1080p|1080i|720p|576p|480p|4k|uhd|hdr10\+?|hdr|dolby[\s._-]?vision|
            blu-?ray|bdrip|brrip|bdremux|remux|web-?dl|web-?rip|webrip|hdtv|hdrip|dvdrip|dvdscr|dvd|
            x\.?264|x\.?265|h\.?264|h\.?265|hevc|avc|xvid|divx|av1|10bit|8bit|
            aac(?:2\.0|5\.1)?|ac3|eac3|ddp?(?:5\.1|7\.1|2\.0)?|dts(?:-hd)?|truehd|atmos|flac|mp3|
            multi|dual[\s._-]?audio|vostfr|subbed|dubbed|
            french|german|spanish|italian|hindi|japanese|korean|ita|eng|
            proper|repack|internal|limited|unrated|extended|remastered|imax|
            nf|amzn|dsnp|hmax|atvp
        )
        (?:$|[\s._\-\]\)])",
    )
    .expect("Invalid noise token pattern")
});

static BRACKETED_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\(\[\{]\s*(?:19|20)\d{2}\s*[\)\]\}]").expect("Invalid bracketed year pattern")
});

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]|\([^\)]*\)|\{[^\}]*\}").expect("Invalid bracket pattern")
});

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(?:19|20)\d{2}\s*$").expect("Invalid trailing year pattern"));

static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").expect("Invalid year pattern")
});

/// Reduce a file name to a searchable title.
///
/// # Examples
///
/// ```
/// use mediadex::metadata::title::clean_title;
///
/// assert_eq!(
///     clean_title("www.Site.com - Movie.Name.2020.1080p.BluRay.x264-GROUP.mkv"),
///     "Movie Name"
/// );
/// ```
pub fn clean_title(file_name: &str) -> String {
    let stem = strip_extension(file_name);

    let mut name = stem.to_string();
    loop {
        let stripped = LEADING_TAG.replace(&SITE_PREFIX.replace(&name, ""), "").into_owned();
        if stripped == name {
            break;
        }
        name = stripped;
    }

    if let Some(m) = AKA.find(&name) {
        if m.start() > 0 {
            name.truncate(m.start());
        }
    }

    if let Some(m) = NOISE_TOKEN.find(&name) {
        if m.start() > 0 {
            name.truncate(m.start());
        }
    }

    let name = name.replace(['.', '_'], " ");
    let name = BRACKETED_YEAR.replace_all(&name, " ");
    let name = BRACKETED.replace_all(&name, " ");
    let name = TRAILING_YEAR.replace(&name, "");

    let cleaned = collapse(&name);
    if cleaned.is_empty() {
        // Everything was noise; a spaced-out stem beats an empty query.
        return collapse(&stem.replace(['.', '_'], " "));
    }
    cleaned
}

/// First `19xx`/`20xx` token delimited by non-digits.
///
/// ```
/// use mediadex::metadata::title::extract_year;
///
/// assert_eq!(extract_year("Heat.1995.1080p.mkv"), Some(1995));
/// assert_eq!(extract_year("Movie.12019.mkv"), None);
/// ```
pub fn extract_year(file_name: &str) -> Option<i32> {
    YEAR.captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn strip_extension(file_name: &str) -> &str {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return file_name;
    };
    let looks_like_ext = (2..=4).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic());
    if !stem.is_empty() && (looks_like_ext || is_video_file(Path::new(file_name))) {
        stem
    } else {
        file_name
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}
