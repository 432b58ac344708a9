//! Hashtag normalization.
//!
//! Turns free-text labels from the detail page into tokens Telegram renders as
//! a single hashtag.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Replaces the `/` of a ratio label such as `1/7`.
pub const RATIO_GLYPH: char = '比';

/// Label the site shows for fields it has no value for.
pub const UNKNOWN_LABEL: &str = "未知";

static RATIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+/[0-9]+$").expect("static regex"));

static NON_TAG_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}0-9]").expect("static regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s").expect("static regex"));

/// Normalize one label into a hashtag body (without the leading `#`).
///
/// A ratio keeps its digits and swaps the slash for [`RATIO_GLYPH`]; anything
/// else has every character that is not a letter or an ASCII digit replaced
/// with `_`.
pub fn normalize(raw: &str) -> String {
    if RATIO.is_match(raw) {
        return raw.replacen('/', &RATIO_GLYPH.to_string(), 1);
    }

    NON_TAG_CHAR.replace_all(raw, "_").into_owned()
}

/// Turn raw detail-page labels into `#`-prefixed hashtags.
///
/// Labels are trimmed, inner whitespace becomes `_`, then [`normalize`] runs.
/// Empty results, the [`UNKNOWN_LABEL`] placeholder and repeats are dropped;
/// first-seen order is kept.
pub fn hashtags<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();

    labels
        .into_iter()
        .map(|label| WHITESPACE.replace_all(label.as_ref().trim(), "_").into_owned())
        .map(|label| normalize(&label))
        .filter(|tag| !tag.is_empty() && tag != UNKNOWN_LABEL)
        .filter(|tag| seen.insert(tag.clone()))
        .map(|tag| format!("#{tag}"))
        .collect()
}
