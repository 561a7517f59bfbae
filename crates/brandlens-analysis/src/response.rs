//! Extraction of mention counts and list ranks from raw LLM answers.

use regex::Regex;
use std::sync::LazyLock;

/// Anchored numbered-list marker, e.g. "3." or "3)" at the start of a line.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]").unwrap());

/// English ordinal anywhere in a line, e.g. "ranked 3rd".
static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").unwrap());

/// Evidence extracted from a single LLM response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSignals {
    pub mentions: u32,
    pub rank: Option<u32>,
}

/// Counts brand mentions and finds the brand's list rank in one response.
///
/// Mentions are case-insensitive, non-overlapping substring matches. Plain
/// substring search keeps brand names containing regex metacharacters
/// ("C++ Experts") from blowing up the match.
///
/// The rank scan walks lines top-down and only inspects lines containing the
/// brand: an anchored list marker wins over an ordinal, and the first line
/// that yields a number ends the scan. Brand lines without a number do not
/// stop it.
pub fn analyze_response(response: &str, brand_name: &str) -> ResponseSignals {
    let needle = brand_name.to_lowercase();
    ResponseSignals {
        mentions: count_mentions(&response.to_lowercase(), &needle),
        rank: find_rank(response, &needle),
    }
}

fn count_mentions(haystack: &str, needle: &str) -> u32 {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(needle) {
        count += 1;
        offset += pos + needle.len();
    }
    count
}

fn find_rank(response: &str, lowered_brand: &str) -> Option<u32> {
    if lowered_brand.is_empty() {
        return None;
    }
    for line in response.lines() {
        let lowered = line.to_lowercase();
        if !lowered.contains(lowered_brand) {
            continue;
        }
        if let Some(caps) = LIST_MARKER.captures(&lowered) {
            if let Ok(rank) = caps[1].parse() {
                return Some(rank);
            }
        }
        if let Some(caps) = ORDINAL.captures(&lowered) {
            if let Ok(rank) = caps[1].parse() {
                return Some(rank);
            }
        }
    }
    None
}
