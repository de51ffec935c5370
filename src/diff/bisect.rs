//! Myers's O(ND) middle-snake bisection, deadline-bounded.
//!
//! This is the algorithm of last resort inside [`super::diff_compute`]: it
//! runs after the empty/substring/half-match/line-mode shortcuts have all
//! failed to apply, on two `char` slices known to share no common affix.

use super::{diff_chars, EditScript, Op};
use crate::config::Config;
use crate::primitives::from_chars;
use std::time::Instant;

/// Finds the middle snake of the edit graph for `text1`/`text2` and
/// recurses on both halves. If `deadline` elapses before an overlap
/// between the forward and reverse frontiers is found, returns the
/// degenerate `[Delete(text1), Insert(text2)]` script.
pub fn diff_bisect(
    config: &Config,
    text1: &[char],
    text2: &[char],
    deadline: Option<Instant>,
) -> EditScript {
    let text1_len = text1.len();
    let text2_len = text2.len();
    let max_d = ((text1_len + text2_len + 1) / 2) as isize;
    let v_offset = max_d;
    let v_len = (2 * max_d) as usize;

    let mut v1 = vec![-1isize; v_len.max(2)];
    let mut v2 = vec![-1isize; v_len.max(2)];
    v1[(v_offset + 1) as usize] = 0;
    v2[(v_offset + 1) as usize] = 0;

    let delta = text1_len as isize - text2_len as isize;
    // If the total number of characters is odd, the forward path can
    // overlap the reverse path; if even, the reverse path can overlap the
    // forward path.
    let front = delta % 2 != 0;

    let mut k1_start = 0isize;
    let mut k1_end = 0isize;
    let mut k2_start = 0isize;
    let mut k2_end = 0isize;

    for d in 0..max_d {
        if super::deadline_exceeded(deadline) {
            tracing::debug!(d, max_d, "diff_bisect: deadline exceeded, bailing out");
            break;
        }

        // Forward path.
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let k1_offset = (v_offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                v1[k1_offset + 1]
            } else {
                v1[k1_offset - 1] + 1
            };
            let mut y1 = x1 - k1;
            while (x1 as usize) < text1_len
                && (y1 as usize) < text2_len
                && text1[x1 as usize] == text2[y1 as usize]
            {
                x1 += 1;
                y1 += 1;
            }
            v1[k1_offset] = x1;

            if x1 > text1_len as isize {
                k1_end += 2;
            } else if y1 > text2_len as isize {
                k1_start += 2;
            } else if front {
                let k2_offset = v_offset + delta - k1;
                if k2_offset >= 0 && (k2_offset as usize) < v_len && v2[k2_offset as usize] != -1 {
                    let x2 = text1_len as isize - v2[k2_offset as usize];
                    if x1 >= x2 {
                        return diff_bisect_split(config, text1, text2, x1, y1, deadline);
                    }
                }
            }
            k1 += 2;
        }

        // Reverse path.
        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let k2_offset = (v_offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                v2[k2_offset + 1]
            } else {
                v2[k2_offset - 1] + 1
            };
            let mut y2 = x2 - k2;
            while (x2 as usize) < text1_len
                && (y2 as usize) < text2_len
                && text1[text1_len - x2 as usize - 1] == text2[text2_len - y2 as usize - 1]
            {
                x2 += 1;
                y2 += 1;
            }
            v2[k2_offset] = x2;

            if x2 > text1_len as isize {
                k2_end += 2;
            } else if y2 > text2_len as isize {
                k2_start += 2;
            } else if !front {
                let k1_offset = v_offset + delta - k2;
                if k1_offset >= 0 && (k1_offset as usize) < v_len && v1[k1_offset as usize] != -1 {
                    let x1 = v1[k1_offset as usize];
                    let y1 = v_offset + x1 - k1_offset;
                    if x1 >= text1_len as isize - x2 {
                        return diff_bisect_split(config, text1, text2, x1, y1, deadline);
                    }
                }
            }
            k2 += 2;
        }
    }

    // No overlap found within the deadline: the best we can do is declare
    // the entirety of text1 deleted and text2 inserted.
    vec![
        Op::Delete(from_chars(text1)),
        Op::Insert(from_chars(text2)),
    ]
}

/// Splits the edit graph at `(x, y)` (the middle snake found by
/// [`diff_bisect`]) and recurses on the two resulting quadrants,
/// concatenating their scripts.
fn diff_bisect_split(
    config: &Config,
    text1: &[char],
    text2: &[char],
    x: isize,
    y: isize,
    deadline: Option<Instant>,
) -> EditScript {
    let x = x as usize;
    let y = y as usize;
    let (text1a, text1b) = text1.split_at(x);
    let (text2a, text2b) = text2.split_at(y);

    let mut diffs = diff_chars(config, text1a, text2a, false, deadline);
    diffs.extend(diff_chars(config, text1b, text2b, false, deadline));
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_text1, diff_text2};
    use crate::primitives::to_chars;
    use pretty_assertions::assert_eq;

    fn bisect_str(a: &str, b: &str) -> EditScript {
        let config = Config::default();
        diff_bisect(&config, &to_chars(a), &to_chars(b), None)
    }

    #[test]
    fn reconstructs_both_texts() {
        let cases = [
            ("ABCABBA", "CBABAC"),
            ("abgdef", "gh"),
            ("bat", "map"),
            ("1A ", "1A B A 2"),
        ];
        for (a, b) in cases {
            let diffs = bisect_str(a, b);
            assert_eq!(diff_text1(&diffs), a);
            assert_eq!(diff_text2(&diffs), b);
        }
    }

    #[test]
    fn timeout_yields_degenerate_script() {
        let config = Config::default();
        let deadline = Some(Instant::now());
        let diffs = diff_bisect(&config, &to_chars("abcdef"), &to_chars("ghijkl"), deadline);
        assert_eq!(
            diffs,
            vec![Op::Delete("abcdef".into()), Op::Insert("ghijkl".into())]
        );
    }
}
