//! Text normalization for scraped fragments.

use unicode_normalization::UnicodeNormalization;

/// Characters stripped from both ends of a scraped value.
const EDGE_NOISE: &[char] = &['-', '•', '*', '·', ':', ';'];

/// NFKC-normalize, collapse whitespace runs and trim decorative edges.
pub fn clean(raw: &str) -> String {
    let normalized: String = raw.nfkc().collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || EDGE_NOISE.contains(&c))
        .to_string()
}

/// Clean a value and drop it when nothing is left.
pub fn non_empty(raw: &str) -> Option<String> {
    Some(clean(raw)).filter(|s| !s.is_empty())
}
