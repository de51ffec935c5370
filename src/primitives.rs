//! Character-level string primitives shared by the diff, match and patch
//! engines: common prefix/suffix/overlap length and a couple of small
//! conversions between `&str` and the `Vec<char>` representation the core
//! algorithms operate on.
//!
//! Strings are treated as sequences of Unicode scalar values (`char`), not
//! UTF-16 code units or bytes, per the character-model decision recorded in
//! DESIGN.md.

/// Returns the length, in `char`s, of the longest common prefix of `a` and `b`.
///
/// The original algorithm binary-searches over substring equality, which is
/// a reasonable trick when substring comparison is a cheap native operation.
/// Comparing `char` slices in Rust has no such shortcut, so a linear scan
/// (which short-circuits on the first mismatch) is both simpler and never
/// slower; see DESIGN.md for this port decision.
pub fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Returns the length, in `char`s, of the longest common suffix of `a` and `b`.
pub fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Returns the largest `k` such that the last `k` chars of `a` equal the
/// first `k` chars of `b`.
///
/// Distinct characters are never treated as equal even if they would
/// visually compose into a ligature: `common_overlap(['f','i'], ['\u{FB01}','i'])`
/// is `0`, not `1`.
pub fn common_overlap(a: &[char], b: &[char]) -> usize {
    let (a_len, b_len) = (a.len(), b.len());
    if a_len == 0 || b_len == 0 {
        return 0;
    }

    // Truncate the longer string so both are the same length; this can only
    // shrink the search space since the overlap can never exceed min(len).
    let (a, b) = if a_len > b_len {
        (&a[a_len - b_len..], b)
    } else {
        (a, &b[..a_len])
    };
    let min_len = a.len();

    if a == b {
        return min_len;
    }

    // Start with a naive guess and extend: find the tail of `a` inside `b`,
    // then verify/grow the matching prefix from that position.
    let mut best = 0;
    for start in 0..min_len {
        let candidate = &a[start..];
        if b.starts_with(candidate) {
            best = candidate.len();
            break;
        }
    }
    best
}

/// Converts a `&str` into its `char` vector.
pub fn to_chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Converts a slice of `char`s back into an owned `String`.
pub fn from_chars(chars: &[char]) -> String {
    chars.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Vec<char> {
        to_chars(s)
    }

    #[test]
    fn prefix_basic() {
        assert_eq!(common_prefix(&v("1234abcdef"), &v("1234xyz")), 4);
        assert_eq!(common_prefix(&v("1234"), &v("1234xyz")), 4);
        assert_eq!(common_prefix(&v(""), &v("abc")), 0);
        assert_eq!(common_prefix(&v("abc"), &v("xyz")), 0);
    }

    #[test]
    fn suffix_basic() {
        assert_eq!(common_suffix(&v("abcdef1234"), &v("xyz1234")), 4);
        assert_eq!(common_suffix(&v("1234"), &v("xyz1234")), 4);
        assert_eq!(common_suffix(&v(""), &v("abc")), 0);
        assert_eq!(common_suffix(&v("abc"), &v("xyz")), 0);
    }

    #[test]
    fn overlap_basic() {
        assert_eq!(common_overlap(&v(""), &v("abcd")), 0);
        assert_eq!(common_overlap(&v("abcd"), &v("")), 0);
        assert_eq!(common_overlap(&v("abcd"), &v("abcd")), 4);
        assert_eq!(common_overlap(&v("123456"), &v("abcd")), 0);
        assert_eq!(common_overlap(&v("fi"), &v("\u{fb01}i")), 0);
        assert_eq!(common_overlap(&v("123456xxx"), &v("xxxabcd")), 3);
    }
}
