//! The diff engine: [`Op`], [`diff_main`] and the auxiliary functions used
//! to inspect and re-serialize an edit script.
//!
//! `diff_main` strips common affixes, dispatches the remainder to
//! [`bisect::diff_bisect`] (by way of half-match and line-mode speedups),
//! and finishes with [`cleanup::cleanup_merge`].

use crate::config::Config;
use crate::primitives::{common_prefix, common_suffix, from_chars, to_chars};
use std::time::{Duration, Instant};

pub mod bisect;
pub mod cleanup;
pub mod delta;
pub mod halfmatch;
pub mod linemode;

/// One edit operation in an [`EditScript`].
///
/// A tagged variant rather than the original's length-2 indexable tuple;
/// see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Text present in the source but not the destination.
    Delete(String),
    /// Text present in the destination but not the source.
    Insert(String),
    /// Text present, unchanged, in both.
    Equal(String),
}

impl Op {
    /// The text carried by this operation, regardless of kind.
    pub fn text(&self) -> &str {
        match self {
            Op::Delete(t) | Op::Insert(t) | Op::Equal(t) => t,
        }
    }

    pub(crate) fn is_delete(&self) -> bool {
        matches!(self, Op::Delete(_))
    }

    pub(crate) fn is_insert(&self) -> bool {
        matches!(self, Op::Insert(_))
    }

    #[allow(dead_code)]
    pub(crate) fn is_equal(&self) -> bool {
        matches!(self, Op::Equal(_))
    }
}

/// An ordered sequence of [`Op`]s fully describing a transformation from one
/// string to another.
pub type EditScript = Vec<Op>;

/// Computes a minimal edit script transforming `text1` into `text2`.
///
/// `check_lines` enables the line-mode speedup for large inputs; disable it
/// to force character-by-character bisection (useful for tests that need
/// exact parity with a non-line-mode script, per the line-mode-equivalence
/// law in SPEC_FULL.md §8).
pub fn diff_main(config: &Config, text1: &str, text2: &str, check_lines: bool) -> EditScript {
    tracing::trace!(len1 = text1.len(), len2 = text2.len(), "diff_main");

    if text1 == text2 {
        return if text1.is_empty() {
            Vec::new()
        } else {
            vec![Op::Equal(text1.to_owned())]
        };
    }

    let deadline = if config.diff_timeout_enabled() {
        Some(Instant::now() + config.diff_timeout)
    } else {
        None
    };

    let chars1 = to_chars(text1);
    let chars2 = to_chars(text2);

    let mut diffs = diff_chars(config, &chars1, &chars2, check_lines, deadline);
    cleanup::cleanup_merge(&mut diffs);
    diffs
}

/// Core recursive entry point operating on `char` slices, after the
/// equal/empty shortcuts in `diff_main` have been handled. Strips common
/// prefix/suffix, then dispatches to [`diff_compute`].
fn diff_chars(
    config: &Config,
    text1: &[char],
    text2: &[char],
    check_lines: bool,
    deadline: Option<Instant>,
) -> EditScript {
    let prefix_len = common_prefix(text1, text2);
    let (prefix, text1) = text1.split_at(prefix_len);
    let (_, text2) = text2.split_at(prefix_len);

    let suffix_len = common_suffix(text1, text2);
    let (text1, suffix) = text1.split_at(text1.len() - suffix_len);
    let (text2, _) = text2.split_at(text2.len() - suffix_len);

    let mut diffs = Vec::new();
    if prefix_len > 0 {
        diffs.push(Op::Equal(from_chars(prefix)));
    }
    diffs.extend(diff_compute(config, text1, text2, check_lines, deadline));
    if suffix_len > 0 {
        diffs.push(Op::Equal(from_chars(suffix)));
    }
    diffs
}

/// Finds the differences between two `char` slices known to share no
/// common prefix or suffix. Tries, in order: the empty-vs-nonempty
/// shortcuts, the short-inside-long substring shortcut, half-match,
/// line-mode, and finally full bisection.
fn diff_compute(
    config: &Config,
    text1: &[char],
    text2: &[char],
    check_lines: bool,
    deadline: Option<Instant>,
) -> EditScript {
    if text1.is_empty() {
        return if text2.is_empty() {
            Vec::new()
        } else {
            vec![Op::Insert(from_chars(text2))]
        };
    }
    if text2.is_empty() {
        return vec![Op::Delete(from_chars(text1))];
    }

    let (long_text, short_text, long_is_text1) = if text1.len() > text2.len() {
        (text1, text2, true)
    } else {
        (text2, text1, false)
    };

    if let Some(pos) = find_subslice(long_text, short_text) {
        // The short text is a substring of the long one: a pure insertion
        // or deletion bracketing an equality.
        let op = if long_is_text1 { Op::Delete } else { Op::Insert };
        let mut diffs = vec![
            op(from_chars(&long_text[..pos])),
            Op::Equal(from_chars(short_text)),
            op(from_chars(&long_text[pos + short_text.len()..])),
        ];
        diffs.retain(|d| !d.text().is_empty());
        return diffs;
    }

    if short_text.len() == 1 {
        // A single character can't be split further: the minimal script is
        // a flat delete + insert pair.
        return vec![
            Op::Delete(from_chars(text1)),
            Op::Insert(from_chars(text2)),
        ];
    }

    if let Some(hm) = halfmatch::diff_half_match(config, text1, text2) {
        let diffs_a = diff_chars(
            config,
            &hm.text1_prefix,
            &hm.text2_prefix,
            check_lines,
            deadline,
        );
        let mid = Op::Equal(from_chars(&hm.common_middle));
        let diffs_b = diff_chars(
            config,
            &hm.text1_suffix,
            &hm.text2_suffix,
            check_lines,
            deadline,
        );

        let mut diffs = diffs_a;
        diffs.push(mid);
        diffs.extend(diffs_b);
        return diffs;
    }

    if check_lines && text1.len() > 100 && text2.len() > 100 {
        return linemode::diff_line_mode(config, text1, text2, deadline);
    }

    bisect::diff_bisect(config, text1, text2, deadline)
}

/// Returns the char offset of `needle` within `haystack`, or `None`.
fn find_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Concatenates the text of every non-[`Op::Insert`] operation, i.e.
/// reconstructs the source string.
pub fn diff_text1(diffs: &[Op]) -> String {
    let mut out = String::new();
    for d in diffs {
        if !d.is_insert() {
            out.push_str(d.text());
        }
    }
    out
}

/// Concatenates the text of every non-[`Op::Delete`] operation, i.e.
/// reconstructs the destination string.
pub fn diff_text2(diffs: &[Op]) -> String {
    let mut out = String::new();
    for d in diffs {
        if !d.is_delete() {
            out.push_str(d.text());
        }
    }
    out
}

/// The classical Levenshtein distance implied by an edit script, where an
/// adjacent delete/insert run bounded by equalities counts as
/// `max(insertions, deletions)` rather than `insertions + deletions`.
pub fn diff_levenshtein(diffs: &[Op]) -> usize {
    let mut levenshtein = 0;
    let mut insertions = 0;
    let mut deletions = 0;

    for d in diffs {
        match d {
            Op::Insert(t) => insertions += t.chars().count(),
            Op::Delete(t) => deletions += t.chars().count(),
            Op::Equal(_) => {
                levenshtein += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    levenshtein += insertions.max(deletions);
    levenshtein
}

/// Maps a char position in the source text (`text1`) to the equivalent
/// position in the destination text (`text2`), by walking the script and
/// tracking consumed lengths on each side.
pub fn x_index(diffs: &[Op], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut last_op_was_delete = false;

    for d in diffs {
        let len = d.text().chars().count();
        match d {
            Op::Insert(_) => {
                chars2 += len;
            }
            Op::Delete(_) => {
                chars1 += len;
            }
            Op::Equal(_) => {
                chars1 += len;
                chars2 += len;
            }
        }
        if chars1 > loc {
            last_op_was_delete = d.is_delete();
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    if last_op_was_delete {
        return last_chars2;
    }
    last_chars2 + loc.saturating_sub(last_chars1)
}

/// Bails the deadline check out to a degenerate `[Delete, Insert]` script,
/// per SPEC_FULL.md §4.3.
pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    matches!(deadline, Some(d) if Instant::now() >= d)
}

/// Converts a timeout in seconds into the `Duration` the deadline
/// machinery expects, clamping negative/zero values to unlimited.
#[allow(dead_code)]
pub(crate) fn timeout_to_duration(secs: f64) -> Duration {
    if secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(secs)
    }
}
