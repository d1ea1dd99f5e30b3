//! Keyword matching that tolerates OCR noise ("T0TAL", "SUB-TOTAL", "TOTAL AMOUNT DUE").

/// Lowercase `s` and keep only the letters `a`–`z`.
pub fn normalize_letters(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Sequence similarity in `[0, 1]`: twice the number of characters covered by
/// recursively chosen longest common blocks, over the combined length.
/// Symmetric; two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(a.as_bytes(), b.as_bytes()) as f64 / total as f64
}

/// Whether `candidate` matches any keyword: the normalized keyword occurs inside the
/// normalized candidate, or the two are at least `threshold` similar.
/// Keywords without any letters never match.
pub fn fuzzy_contains<S: AsRef<str>>(candidate: &str, keywords: &[S], threshold: f64) -> bool {
    let candidate = normalize_letters(candidate);
    keywords.iter().any(|kw| {
        let kw = normalize_letters(kw.as_ref());
        !kw.is_empty() && (candidate.contains(&kw) || similarity_ratio(&candidate, &kw) >= threshold)
    })
}

/// Whether any normalized keyword occurs inside the already-normalized candidate.
pub fn contains_keyword<S: AsRef<str>>(normalized: &str, keywords: &[S]) -> bool {
    keywords.iter().any(|kw| {
        let kw = normalize_letters(kw.as_ref());
        !kw.is_empty() && normalized.contains(&kw)
    })
}

/// Highest similarity between the already-normalized candidate and any keyword.
pub fn best_similarity<S: AsRef<str>>(normalized: &str, keywords: &[S]) -> f64 {
    keywords
        .iter()
        .map(|kw| normalize_letters(kw.as_ref()))
        .filter(|kw| !kw.is_empty())
        .map(|kw| similarity_ratio(normalized, &kw))
        .fold(0.0, f64::max)
}

fn matching_characters(a: &[u8], b: &[u8]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; ties go to the block
/// starting earliest in `a`, then earliest in `b`.
fn longest_block(a: &[u8], b: &[u8], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in alo..ahi {
        curr[0] = 0;
        for j in blo..bhi {
            let col = j - blo + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best_k {
                best_k = curr[col];
                best_i = i + 1 - best_k;
                best_j = j + 1 - best_k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_k)
}
