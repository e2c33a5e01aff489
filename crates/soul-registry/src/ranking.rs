//! Keyword-overlap ranking.
//!
//! A message is reduced to its set of lowercase whitespace tokens. A record's
//! score is the number of its keywords present in that set, multiplied by the
//! record's weight. Records with no overlap are dropped. Ordering is by
//! descending score; equal scores keep their input order.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Lowercase whitespace tokens of a message.
pub fn tokenize(message: &str) -> HashSet<String> {
    message.split_whitespace().map(str::to_lowercase).collect()
}

/// Parses a comma-separated keyword list: trimmed, lowercased, empties dropped.
pub fn parse_keywords(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Number of keywords present among the message tokens.
pub fn overlap(tokens: &HashSet<String>, keywords: &str) -> usize {
    parse_keywords(keywords)
        .iter()
        .filter(|k| tokens.contains(*k))
        .count()
}

/// Ranks `records` against `message`, returning at most `limit`.
///
/// `keywords` yields a record's comma-separated keyword list and `weight`
/// its ranking weight.
pub fn rank<T, K, W>(
    records: impl IntoIterator<Item = T>,
    message: &str,
    limit: usize,
    keywords: K,
    weight: W,
) -> Vec<T>
where
    K: Fn(&T) -> &str,
    W: Fn(&T) -> f64,
{
    let tokens = tokenize(message);

    let mut scored: Vec<(f64, T)> = records
        .into_iter()
        .filter_map(|record| {
            let hits = overlap(&tokens, keywords(&record));
            (hits > 0).then(|| (hits as f64 * weight(&record), record))
        })
        .collect();

    // `sort_by` is stable, so ties keep retrieval order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, record)| record).collect()
}
