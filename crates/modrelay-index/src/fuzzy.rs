//! Approximate name matching over entity collections.
//!
//! Scores are integers in `0..=100`. Inputs are normalized first: lowercased,
//! non-alphanumerics replaced by spaces, then trimmed.

use std::cmp::Reverse;

/// A candidate paired with its similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored<T> {
    pub score: u8,
    pub item: T,
}

pub fn normalize(input: &str) -> String {
    input
        .chars()
        .flat_map(|c| {
            let kept = if c.is_alphanumeric() { c } else { ' ' };
            kept.to_lowercase()
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

fn raw_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(strsim::normalized_levenshtein(a, b))
}

/// Plain edit-distance similarity of the normalized inputs.
pub fn ratio(a: &str, b: &str) -> u8 {
    raw_ratio(&normalize(a), &normalize(b))
}

/// Best ratio of the shorter input against every equal-length window of the longer.
fn partial_ratio(a: &str, b: &str) -> u8 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 {
        return 0;
    }

    let mut best = 0;
    for window in long_chars.windows(width) {
        let candidate: String = window.iter().collect();
        best = best.max(raw_ratio(short, &candidate));
        if best == 100 {
            break;
        }
    }
    best
}

fn weighted_ratio_normalized(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let base = raw_ratio(a, b);
    let (len_a, len_b) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);
    if len_ratio < 1.5 {
        return base;
    }

    let scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
    let partial = (partial_ratio(a, b) as f64 * scale).round() as u8;
    base.max(partial)
}

/// Ratio that favours substring matches when the lengths differ widely.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    weighted_ratio_normalized(&normalize(a), &normalize(b))
}

/// Rank `candidates` against `query` by the key `key_fn` projects, keeping the
/// best `limit` in descending score order. Equal scores keep input order.
pub fn top_matches_scored<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    key_fn: F,
    limit: usize,
) -> Vec<Scored<&'a T>>
where
    F: Fn(&T) -> &str,
{
    if limit == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let query = normalize(query);
    let mut scored: Vec<Scored<&T>> = candidates
        .iter()
        .map(|item| Scored {
            score: weighted_ratio_normalized(&query, &normalize(key_fn(item))),
            item,
        })
        .collect();

    scored.sort_by_key(|s| Reverse(s.score));
    scored.truncate(limit);
    scored
}

pub fn top_matches<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    key_fn: F,
    limit: usize,
) -> Vec<&'a T>
where
    F: Fn(&T) -> &str,
{
    top_matches_scored(query, candidates, key_fn, limit)
        .into_iter()
        .map(|s| s.item)
        .collect()
}

/// Re-rank an already narrowed result set so the items whose owner is most
/// similar to `owner_hint` come first. Without a hint the order is unchanged.
pub fn reorder_by_affinity<T, F>(
    mut results: Vec<T>,
    owner_hint: Option<&str>,
    owner_fn: F,
) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let Some(hint) = owner_hint else {
        return results;
    };
    let hint = normalize(hint);
    results.sort_by_cached_key(|item| raw_ratio(&normalize(owner_fn(item)), &hint));
    results.reverse();
    results
}
