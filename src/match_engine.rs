//! Fuzzy substring search: the Bitap (Shift-Or) algorithm, scored by a
//! weighted combination of edit distance and distance from a hinted
//! location. Used directly by callers and internally by [`crate::patch`]
//! to relocate hunks against drifted source text.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::primitives::to_chars;
use std::collections::HashMap;

/// Finds the best fuzzy match for `pattern` in `text`, starting the search
/// near `loc`. Returns `Ok(None)` if nothing scores within
/// `config.match_threshold`, and `Err` if `pattern` is longer than
/// `config.match_max_bits` chars.
///
/// Exact submatches are tried first; failing that, falls back to
/// [`match_bitap`].
pub fn match_main(config: &Config, text: &str, pattern: &str, loc: usize) -> Result<Option<usize>> {
    let text_chars = to_chars(text);
    let pattern_chars = to_chars(pattern);
    let loc = loc.min(text_chars.len());

    if text_chars == pattern_chars {
        return Ok(Some(0));
    }
    if text_chars.is_empty() {
        return Ok(None);
    }
    let end = (loc + pattern_chars.len()).min(text_chars.len());
    if end >= loc && text_chars[loc..end] == pattern_chars[..] {
        return Ok(Some(loc));
    }

    match_bitap(config, &text_chars, &pattern_chars, loc)
}

/// Builds the per-character bitmask used by [`match_bitap`]: for each
/// distinct char in `pattern`, a mask with a zero bit at every position
/// that char occupies (and ones everywhere else).
pub fn match_alphabet(pattern: &[char]) -> HashMap<char, u32> {
    let mut s: HashMap<char, u32> = HashMap::new();
    for &c in pattern {
        s.entry(c).or_insert(0);
    }
    for (i, &c) in pattern.iter().enumerate() {
        *s.get_mut(&c).unwrap() |= 1 << (pattern.len() - i - 1);
    }
    s
}

/// The bit-parallel fuzzy search proper: a banded dynamic-programming scan
/// over increasing edit distances `d`, pruned each round by a binary
/// search over how wide the band needs to be to still beat the running
/// best score.
pub fn match_bitap(
    config: &Config,
    text: &[char],
    pattern: &[char],
    loc: usize,
) -> Result<Option<usize>> {
    if pattern.len() > config.match_max_bits {
        return Err(Error::PatternTooLong {
            len: pattern.len(),
            max_bits: config.match_max_bits,
        });
    }

    let alphabet = match_alphabet(pattern);

    let score = |e: usize, x: isize| -> f64 {
        let accuracy = e as f64 / pattern.len() as f64;
        let proximity = (loc as isize - x).unsigned_abs() as f64;
        if config.match_distance == 0 {
            if proximity > 0.0 {
                1.0
            } else {
                accuracy
            }
        } else {
            accuracy + proximity / config.match_distance as f64
        }
    };

    let mut score_threshold = config.match_threshold;

    if let Some(pos) = index_of(text, pattern, loc) {
        score_threshold = score_threshold.min(score(0, pos as isize));
        if let Some(pos2) = last_index_of(text, pattern, loc + pattern.len()) {
            score_threshold = score_threshold.min(score(0, pos2 as isize));
        }
    }

    let match_mask: u32 = 1 << (pattern.len() - 1);
    let mut best_loc: Option<usize> = None;

    let mut bin_max: isize = (pattern.len() + text.len()) as isize;
    let mut last_rd: Vec<u32> = Vec::new();

    for d in 0..pattern.len() {
        let mut bin_min: isize = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if score(d, loc as isize + bin_mid) <= score_threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = ((loc as isize) - bin_mid + 1).max(1) as usize;
        let finish = ((loc + bin_mid.max(0) as usize).min(text.len())) + pattern.len();

        let mut rd = vec![0u32; finish + 2];
        rd[finish + 1] = (1u32 << d).wrapping_sub(1);

        let mut j = finish as isize;
        while j >= start as isize {
            let jx = j as usize;
            let char_match = text
                .get(jx - 1)
                .and_then(|c| alphabet.get(c).copied())
                .unwrap_or(0);

            let rd_next = rd[jx + 1];
            rd[jx] = if d == 0 {
                ((rd_next << 1) | 1) & char_match
            } else {
                let last_next = last_rd.get(jx + 1).copied().unwrap_or(0);
                let last_here = last_rd.get(jx).copied().unwrap_or(0);
                (((rd_next << 1) | 1) & char_match)
                    | (((last_next | last_here) << 1) | 1)
                    | last_next
            };

            if rd[jx] & match_mask != 0 {
                let s = score(d, j - 1);
                if s <= score_threshold {
                    score_threshold = s;
                    best_loc = Some((j - 1) as usize);
                    if best_loc.unwrap() > loc {
                        start = (2 * loc as isize - j + 1).max(1) as usize;
                    } else {
                        break;
                    }
                }
            }
            j -= 1;
        }

        if score(d + 1, loc as isize) > score_threshold {
            break;
        }
        last_rd = rd;
    }

    Ok(best_loc)
}

fn index_of(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn last_index_of(haystack: &[char], needle: &[char], upto: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(upto.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(i, _)| *i <= upto)
        .map(|(i, _)| i)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cfg() -> Config {
        Config::default().with_match_distance(100).with_match_threshold(0.5)
    }

    fn bitap(text: &str, pattern: &str, loc: usize, config: &Config) -> Option<usize> {
        match_bitap(config, &to_chars(text), &to_chars(pattern), loc).unwrap()
    }

    #[test]
    fn alphabet_builds_expected_masks() {
        let expected: HashMap<char, u32> = [('a', 4), ('b', 2), ('c', 1)].into_iter().collect();
        assert_eq!(match_alphabet(&to_chars("abc")), expected);

        let expected: HashMap<char, u32> = [('a', 37), ('b', 18), ('c', 8)].into_iter().collect();
        assert_eq!(match_alphabet(&to_chars("abcaba")), expected);
    }

    #[test]
    fn bitap_finds_fuzzy_matches() {
        let config = cfg();
        assert_eq!(bitap("abcdefghijk", "fgh", 5, &config), Some(5));
        assert_eq!(bitap("abcdefghijk", "fgh", 0, &config), Some(5));
        assert_eq!(bitap("abcdefghijk", "efxhi", 0, &config), Some(4));
        assert_eq!(bitap("abcdefghijk", "cdefxyhijk", 5, &config), Some(2));
        assert_eq!(bitap("abcdefghijk", "bxy", 1, &config), None);
        assert_eq!(bitap("123456789xx0", "3456789x0", 2, &config), Some(2));
        assert_eq!(bitap("abcdef", "xxabc", 4, &config), Some(0));
        assert_eq!(bitap("abcdef", "defyy", 4, &config), Some(3));
        assert_eq!(bitap("abcdef", "xabcdefy", 0, &config), Some(0));
    }

    #[test]
    fn bitap_threshold_controls_acceptance() {
        let config = cfg().with_match_threshold(0.4);
        assert_eq!(bitap("abcdefghijk", "efxyhi", 1, &config), Some(4));

        let config = cfg().with_match_threshold(0.3);
        assert_eq!(bitap("abcdefghijk", "efxyhi", 1, &config), None);

        let config = cfg().with_match_threshold(0.0);
        assert_eq!(bitap("abcdefghijk", "bcdef", 1, &config), Some(1));
    }

    #[test]
    fn bitap_zero_distance_requires_exact_location() {
        let config = cfg().with_match_distance(0);
        assert_eq!(
            bitap("abcdefghijklmnopqrstuvwxyz", "abcdefg", 24, &config),
            None
        );
        assert_eq!(
            bitap("abcdefghijklmnopqrstuvwxyz", "abcdefg", 1, &config),
            Some(0)
        );
    }

    #[test]
    fn main_tries_exact_match_first() {
        let config = cfg();
        assert_eq!(match_main(&config, "abcdef", "abcdef", 1000).unwrap(), Some(0));
        assert_eq!(match_main(&config, "", "abcdef", 1).unwrap(), None);
        assert_eq!(match_main(&config, "abcdef", "", 3).unwrap(), Some(3));
        assert_eq!(match_main(&config, "abcdef", "de", 3).unwrap(), Some(3));
        assert_eq!(match_main(&config, "abcdef", "defy", 4).unwrap(), Some(3));
        assert_eq!(match_main(&config, "abcdef", "abcdefy", 0).unwrap(), Some(0));
    }

    #[test]
    fn main_falls_back_to_bitap() {
        let config = cfg().with_match_threshold(0.7);
        assert_eq!(
            match_main(
                &config,
                "I am the very model of a modern major general.",
                " that berry ",
                5
            )
            .unwrap(),
            Some(4)
        );
    }

    #[test]
    fn rejects_pattern_longer_than_max_bits() {
        let config = Config::default();
        let pattern: String = "a".repeat(config.match_max_bits + 1);
        let err = match_main(&config, "abc", &pattern, 0).unwrap_err();
        assert_eq!(
            err,
            Error::PatternTooLong {
                len: config.match_max_bits + 1,
                max_bits: config.match_max_bits
            }
        );
    }
}
