//! The half-match speedup: find a long shared substring and recurse on the
//! two remaining halves instead of paying for a full bisection.

use crate::config::Config;
use crate::primitives::{common_prefix, common_suffix};

/// The result of a successful half-match: `text1` and `text2` each split
/// into a prefix/suffix pair around a `common_middle` substring shared by
/// both.
pub struct HalfMatch {
    pub text1_prefix: Vec<char>,
    pub text1_suffix: Vec<char>,
    pub text2_prefix: Vec<char>,
    pub text2_suffix: Vec<char>,
    pub common_middle: Vec<char>,
}

/// Looks for a substring of at least half the length of the longer input
/// that also occurs in the shorter input. Disabled when the diff timeout
/// is unlimited, since it's a speedup that sacrifices minimality.
pub fn diff_half_match(config: &Config, text1: &[char], text2: &[char]) -> Option<HalfMatch> {
    if !config.diff_timeout_enabled() {
        return None;
    }

    let (longer, shorter, text1_is_longer) = if text1.len() > text2.len() {
        (text1, text2, true)
    } else {
        (text2, text1, false)
    };

    if longer.len() < 4 || shorter.len() * 2 < longer.len() {
        return None;
    }

    // Seed at 1/4 and at 1/2 of the longer text; keep whichever extension
    // is longer.
    let seed1 = half_match_i(longer, shorter, (longer.len() + 3) / 4);
    let seed2 = half_match_i(longer, shorter, (longer.len() + 1) / 2);

    let best = match (seed1, seed2) {
        (Some(a), Some(b)) => {
            if a.common_middle.len() > b.common_middle.len() {
                Some(a)
            } else {
                Some(b)
            }
        }
        (a, b) => a.or(b),
    }?;

    // Orient so the first two fields always correspond to text1.
    Some(if text1_is_longer {
        HalfMatch {
            text1_prefix: best.longer_prefix,
            text1_suffix: best.longer_suffix,
            text2_prefix: best.shorter_prefix,
            text2_suffix: best.shorter_suffix,
            common_middle: best.common_middle,
        }
    } else {
        HalfMatch {
            text1_prefix: best.shorter_prefix,
            text1_suffix: best.shorter_suffix,
            text2_prefix: best.longer_prefix,
            text2_suffix: best.longer_suffix,
            common_middle: best.common_middle,
        }
    })
}

struct Seed {
    longer_prefix: Vec<char>,
    longer_suffix: Vec<char>,
    shorter_prefix: Vec<char>,
    shorter_suffix: Vec<char>,
    common_middle: Vec<char>,
}

/// Extracts a quarter-length seed from `longer` starting at `i`, finds
/// every occurrence of that seed in `shorter`, and extends each occurrence
/// left/right as far as it keeps matching. Accepts the best extension
/// found iff it covers at least half of `longer`.
fn half_match_i(longer: &[char], shorter: &[char], i: usize) -> Option<Seed> {
    let seed_len = longer.len() / 4;
    let seed = &longer[i..i + seed_len];

    let mut best_common: Vec<char> = Vec::new();
    let mut best_longer_prefix: Vec<char> = Vec::new();
    let mut best_longer_suffix: Vec<char> = Vec::new();
    let mut best_shorter_prefix: Vec<char> = Vec::new();
    let mut best_shorter_suffix: Vec<char> = Vec::new();

    let mut start = 0;
    while let Some(pos) = find_subslice(&shorter[start..], seed) {
        let j = start + pos;

        let prefix_len = common_prefix(&longer[i..], &shorter[j..]);
        let suffix_len = common_suffix(&longer[..i], &shorter[..j]);

        if best_common.len() < suffix_len + prefix_len {
            best_common = shorter[j - suffix_len..j + prefix_len].to_vec();
            best_longer_prefix = longer[..i - suffix_len].to_vec();
            best_longer_suffix = longer[i + prefix_len..].to_vec();
            best_shorter_prefix = shorter[..j - suffix_len].to_vec();
            best_shorter_suffix = shorter[j + prefix_len..].to_vec();
        }

        start = j + 1;
    }

    if best_common.len() * 2 >= longer.len() {
        Some(Seed {
            longer_prefix: best_longer_prefix,
            longer_suffix: best_longer_suffix,
            shorter_prefix: best_shorter_prefix,
            shorter_suffix: best_shorter_suffix,
            common_middle: best_common,
        })
    } else {
        None
    }
}

fn find_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return if needle.is_empty() { Some(0) } else { None };
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{from_chars, to_chars};
    use pretty_assertions::assert_eq;

    fn hm(a: &str, b: &str) -> Option<(String, String, String, String, String)> {
        let config = Config::default();
        diff_half_match(&config, &to_chars(a), &to_chars(b)).map(|m| {
            (
                from_chars(&m.text1_prefix),
                from_chars(&m.text1_suffix),
                from_chars(&m.text2_prefix),
                from_chars(&m.text2_suffix),
                from_chars(&m.common_middle),
            )
        })
    }

    #[test]
    fn no_match_cases() {
        assert!(hm("4", "1234567890123456789012345678901234567890123456789012345678901234567890")
            .is_none());
        assert!(hm(
            "qHilloHelloHew",
            "xHelloHeHulloy"
        )
        .is_none());
    }

    #[test]
    fn single_match() {
        assert_eq!(
            hm(
                "1234567890123456789012345678901234567890123456789012345678901234567890",
                "abc123456789012345678901234567890234567890234567890234567890234567890abc"
            ),
            Some((
                "123456789012345678901234567890123456789".into(),
                "".into(),
                "abc".into(),
                "abc".into(),
                "0234567890234567890234567890234567890".into(),
            ))
        );

        assert_eq!(
            hm(
                "a345678901234567890123456789012345678901234567890123456789012345678901234567890z",
                "a3456789012345678901234567890345678901234567890345678901234567890345678901234567890z"
            ),
            Some((
                "a".into(),
                "z".into(),
                "a".into(),
                "z".into(),
                "3456789012345678901234567890".into(),
            ))
        );
    }

    #[test]
    fn multiple_matches_keeps_longest() {
        assert_eq!(
            hm(
                "abcd1234567890123456789012345678901234567890123456789012345678901234567890wxyz",
                "cx123456789012345678901234567890123456789012345678901234567890wcz"
            ),
            Some((
                "abcd".into(),
                "wxyz".into(),
                "cx".into(),
                "wcz".into(),
                "123456789012345678901234567890123456789012345678901234567890".into(),
            ))
        );
    }

    #[test]
    fn disabled_without_timeout() {
        let config = Config::default().with_unlimited_diff_timeout();
        let a = to_chars(
            "1234567890123456789012345678901234567890123456789012345678901234567890",
        );
        let b = to_chars(
            "abc123456789012345678901234567890234567890234567890234567890234567890abc",
        );
        assert!(diff_half_match(&config, &a, &b).is_none());
    }
}
