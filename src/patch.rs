//! The patch engine: build a list of context-bearing [`Patch`] hunks from
//! a diff, serialize/parse them in a unified-diff-like text format, and
//! fuzzily re-apply them against text that may have drifted since the
//! patch was made.

use crate::config::Config;
use crate::diff::delta::{decode_uri, encode_uri};
use crate::diff::{cleanup, diff_main, diff_text1, diff_text2, x_index, EditScript, Op};
use crate::error::{Error, Result};
use crate::match_engine::match_main;
use crate::primitives::{from_chars, to_chars};
use std::fmt;
use std::str::FromStr;

/// One hunk: a run of [`Op`]s together with the source/destination
/// offsets and lengths it was cut from, plus whatever context padding
/// [`patch_add_context`] gave it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patch {
    pub diffs: EditScript,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl Patch {
    /// Builds patches from a source and destination text. Diffs internally
    /// with the line-mode speedup enabled, and runs both semantic and
    /// efficiency cleanup on scripts with more than two ops before cutting
    /// hunks.
    pub fn make_from_texts(config: &Config, text1: &str, text2: &str) -> Vec<Patch> {
        let mut diffs = diff_main(config, text1, text2, true);
        if diffs.len() > 2 {
            cleanup::cleanup_semantic(&mut diffs);
            cleanup::cleanup_efficiency(&mut diffs, config.diff_edit_cost);
        }
        Patch::make_from_text_and_diffs(config, text1, &diffs)
    }

    /// Builds patches from an already-computed edit script, reconstructing
    /// `text1` by concatenating its non-insert operations.
    pub fn make_from_diffs(config: &Config, diffs: &[Op]) -> Vec<Patch> {
        let text1 = diff_text1(diffs);
        Patch::make_from_text_and_diffs(config, &text1, diffs)
    }

    /// Builds patches from a known `text1` and an edit script already
    /// computed against it. The `(text1, text2, diffs)` call shape
    /// forwards here, ignoring `text2` exactly as the original does.
    pub fn make_from_texts_and_diffs(
        config: &Config,
        text1: &str,
        _text2: &str,
        diffs: &[Op],
    ) -> Vec<Patch> {
        Patch::make_from_text_and_diffs(config, text1, diffs)
    }

    /// The core constructor: cuts `diffs` into hunks against a known `text1`,
    /// splitting on equalities at least `2 * patch_margin` chars long and
    /// folding in smaller ones, then pads each hunk with context via
    /// [`patch_add_context`].
    pub fn make_from_text_and_diffs(config: &Config, text1: &str, diffs: &[Op]) -> Vec<Patch> {
        patch_make_from_text_and_diffs(config, text1, diffs)
    }
}

fn patch_make_from_text_and_diffs(config: &Config, text1: &str, diffs: &[Op]) -> Vec<Patch> {
    if diffs.is_empty() {
        return Vec::new();
    }

    let mut patches = Vec::new();
    let mut patch = Patch::default();
    let mut char_count1 = 0usize;
    let mut char_count2 = 0usize;
    let prepatch_chars = to_chars(text1);
    let mut prepatch_text = prepatch_chars.clone();
    let mut postpatch_text = prepatch_chars;

    for (x, d) in diffs.iter().enumerate() {
        let diff_chars = to_chars(d.text());
        let diff_len = diff_chars.len();

        if patch.diffs.is_empty() && !d.is_equal() {
            patch.start1 = char_count1;
            patch.start2 = char_count2;
        }

        match d {
            Op::Insert(_) => {
                patch.length2 += diff_len;
                patch.diffs.push(d.clone());
                let mut new_post = postpatch_text[..char_count2].to_vec();
                new_post.extend_from_slice(&diff_chars);
                new_post.extend_from_slice(&postpatch_text[char_count2..]);
                postpatch_text = new_post;
            }
            Op::Delete(_) => {
                patch.length1 += diff_len;
                patch.diffs.push(d.clone());
                let mut new_post = postpatch_text[..char_count2].to_vec();
                new_post.extend_from_slice(&postpatch_text[char_count2 + diff_len..]);
                postpatch_text = new_post;
            }
            Op::Equal(_) => {
                if diff_len <= 2 * config.patch_margin && !patch.diffs.is_empty() && x + 1 != diffs.len() {
                    patch.diffs.push(d.clone());
                    patch.length1 += diff_len;
                    patch.length2 += diff_len;
                } else if diff_len >= 2 * config.patch_margin && !patch.diffs.is_empty() {
                    patch_add_context(config, &mut patch, &prepatch_text);
                    patches.push(std::mem::take(&mut patch));
                    prepatch_text = postpatch_text.clone();
                    char_count1 = char_count2;
                }
            }
        }

        if !d.is_insert() {
            char_count1 += diff_len;
        }
        if !d.is_delete() {
            char_count2 += diff_len;
        }
    }

    if !patch.diffs.is_empty() {
        patch_add_context(config, &mut patch, &prepatch_text);
        patches.push(patch);
    }

    patches
}

/// Grows `patch` with up to `patch_margin` chars of context on each side
/// (more, if needed, to make the context pattern unique within `text`),
/// adjusting `start1`/`start2`/`length1`/`length2` to match.
fn patch_add_context(config: &Config, patch: &mut Patch, text: &[char]) {
    if text.is_empty() {
        return;
    }

    let mut padding = 0usize;
    let mut pattern_start = patch.start2;
    let mut pattern_end = (patch.start2 + patch.length1).min(text.len());
    let mut pattern = text[pattern_start..pattern_end].to_vec();

    while count_occurrences(text, &pattern) > 1
        && pattern.len() < config.match_max_bits.saturating_sub(2 * config.patch_margin)
    {
        padding += config.patch_margin;
        pattern_start = patch.start2.saturating_sub(padding);
        pattern_end = (patch.start2 + patch.length1 + padding).min(text.len());
        pattern = text[pattern_start..pattern_end].to_vec();
    }
    padding += config.patch_margin;

    let prefix_start = patch.start2.saturating_sub(padding);
    let prefix = text[prefix_start..patch.start2].to_vec();
    if !prefix.is_empty() {
        patch.diffs.insert(0, Op::Equal(from_chars(&prefix)));
    }

    let suffix_start = (patch.start2 + patch.length1).min(text.len());
    let suffix_end = (patch.start2 + patch.length1 + padding).min(text.len());
    let suffix = text[suffix_start..suffix_end].to_vec();
    if !suffix.is_empty() {
        patch.diffs.push(Op::Equal(from_chars(&suffix)));
    }

    patch.start1 = patch.start1.saturating_sub(prefix.len());
    patch.start2 = patch.start2.saturating_sub(prefix.len());
    patch.length1 += prefix.len() + suffix.len();
    patch.length2 += prefix.len() + suffix.len();
}

fn count_occurrences(haystack: &[char], needle: &[char]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Splits any patch whose `length1` exceeds `config.match_max_bits` into
/// several smaller ones, carrying a little overlap context between the
/// pieces so each stays independently appliable.
pub fn patch_split_max(config: &Config, patches: &mut Vec<Patch>) {
    let patch_size = config.match_max_bits;
    let mut x = 0;
    while x < patches.len() {
        if patches[x].length1 <= patch_size {
            x += 1;
            continue;
        }
        let mut bigpatch = patches.remove(x);
        let mut start1 = bigpatch.start1;
        let mut start2 = bigpatch.start2;
        let mut precontext: Vec<char> = Vec::new();
        let mut insert_at = x;

        while !bigpatch.diffs.is_empty() {
            let mut patch = Patch {
                start1: start1.saturating_sub(precontext.len()),
                start2: start2.saturating_sub(precontext.len()),
                ..Patch::default()
            };
            let mut empty = true;

            if !precontext.is_empty() {
                patch.length1 = precontext.len();
                patch.length2 = precontext.len();
                patch.diffs.push(Op::Equal(from_chars(&precontext)));
            }

            while !bigpatch.diffs.is_empty()
                && patch.length1 < patch_size.saturating_sub(config.patch_margin)
            {
                let d = bigpatch.diffs[0].clone();
                let d_chars = to_chars(d.text());

                match &d {
                    Op::Insert(_) => {
                        patch.length2 += d_chars.len();
                        start2 += d_chars.len();
                        patch.diffs.push(d);
                        bigpatch.diffs.remove(0);
                        empty = false;
                    }
                    Op::Delete(_)
                        if patch.diffs.len() == 1
                            && patch.diffs[0].is_equal()
                            && d_chars.len() > 2 * patch_size =>
                    {
                        patch.length1 += d_chars.len();
                        start1 += d_chars.len();
                        empty = false;
                        patch.diffs.push(d);
                        bigpatch.diffs.remove(0);
                    }
                    _ => {
                        let take = d_chars
                            .len()
                            .min(patch_size.saturating_sub(patch.length1).saturating_sub(config.patch_margin));
                        let piece: Vec<char> = d_chars[..take].to_vec();
                        patch.length1 += piece.len();
                        start1 += piece.len();
                        if d.is_equal() {
                            patch.length2 += piece.len();
                            start2 += piece.len();
                        } else {
                            empty = false;
                        }
                        let piece_text = from_chars(&piece);
                        patch.diffs.push(match &d {
                            Op::Equal(_) => Op::Equal(piece_text),
                            Op::Delete(_) => Op::Delete(piece_text),
                            Op::Insert(_) => Op::Insert(piece_text),
                        });
                        if piece.len() == d_chars.len() {
                            bigpatch.diffs.remove(0);
                        } else {
                            let remainder = from_chars(&d_chars[piece.len()..]);
                            bigpatch.diffs[0] = match &d {
                                Op::Equal(_) => Op::Equal(remainder),
                                Op::Delete(_) => Op::Delete(remainder),
                                Op::Insert(_) => Op::Insert(remainder),
                            };
                        }
                    }
                }
            }

            let text2 = to_chars(&diff_text2(&patch.diffs));
            precontext = text2[text2.len().saturating_sub(config.patch_margin)..].to_vec();

            let remaining_text1 = to_chars(&diff_text1(&bigpatch.diffs));
            let postcontext_len = config.patch_margin.min(remaining_text1.len());
            let postcontext = remaining_text1[..postcontext_len].to_vec();
            if !postcontext.is_empty() {
                patch.length1 += postcontext.len();
                patch.length2 += postcontext.len();
                if let Some(Op::Equal(last)) = patch.diffs.last_mut() {
                    last.push_str(&from_chars(&postcontext));
                } else {
                    patch.diffs.push(Op::Equal(from_chars(&postcontext)));
                }
            }

            if !empty {
                patches.insert(insert_at, patch);
                insert_at += 1;
            }
        }
        x = insert_at;
    }
}

/// Pads every patch's hunk with leading/trailing control-character
/// padding, so the first/last context equality is never empty and
/// [`match_main`] always has something to search for at the true
/// document boundaries. Returns the padding string used.
pub fn patch_add_padding(config: &Config, patches: &mut [Patch]) -> String {
    let padding_len = config.patch_margin;
    let null_padding: String = (1..=padding_len as u32)
        .map(|c| char::from_u32(c).expect("control chars 1.. are valid scalars"))
        .collect();

    if patches.is_empty() {
        return null_padding;
    }

    for patch in patches.iter_mut() {
        patch.start1 += padding_len;
        patch.start2 += padding_len;
    }

    {
        let patch = &mut patches[0];
        match patch.diffs.first() {
            None => {
                patch.diffs.insert(0, Op::Equal(null_padding.clone()));
                patch.start1 -= padding_len;
                patch.start2 -= padding_len;
                patch.length1 += padding_len;
                patch.length2 += padding_len;
            }
            Some(Op::Equal(t)) if t.chars().count() < padding_len => {
                let extra = padding_len - t.chars().count();
                let prefix: String = null_padding.chars().skip(t.chars().count()).collect();
                let new_text = format!("{prefix}{t}");
                patch.diffs[0] = Op::Equal(new_text);
                patch.start1 -= extra;
                patch.start2 -= extra;
                patch.length1 += extra;
                patch.length2 += extra;
            }
            Some(_) => {
                patch.diffs.insert(0, Op::Equal(null_padding.clone()));
                patch.start1 -= padding_len;
                patch.start2 -= padding_len;
                patch.length1 += padding_len;
                patch.length2 += padding_len;
            }
        }
    }

    {
        let patch = patches.last_mut().unwrap();
        match patch.diffs.last() {
            None => {
                patch.diffs.push(Op::Equal(null_padding.clone()));
                patch.length1 += padding_len;
                patch.length2 += padding_len;
            }
            Some(Op::Equal(t)) if t.chars().count() < padding_len => {
                let extra = padding_len - t.chars().count();
                let suffix: String = null_padding.chars().take(extra).collect();
                let mut new_text = t.clone();
                new_text.push_str(&suffix);
                let idx = patch.diffs.len() - 1;
                patch.diffs[idx] = Op::Equal(new_text);
                patch.length1 += extra;
                patch.length2 += extra;
            }
            Some(_) => {
                patch.diffs.push(Op::Equal(null_padding.clone()));
                patch.length1 += padding_len;
                patch.length2 += padding_len;
            }
        }
    }

    null_padding
}

/// Applies `patches` against `text`, padding and splitting them first,
/// then for each hunk: relocating it with [`match_main`] against the
/// expected offset (carrying forward any drift from prior hunks), and if
/// the context isn't an exact match, re-diffing and vetoing the hunk when
/// the fuzzy match is too far off per `config.patch_delete_threshold`.
///
/// Returns the resulting text together with one bool per patch recording
/// whether it applied.
pub fn patch_apply(config: &Config, patches: &[Patch], text: &str) -> (String, Vec<bool>) {
    if patches.is_empty() {
        return (text.to_owned(), Vec::new());
    }

    let mut patches = patches.to_vec();
    let null_padding = patch_add_padding(config, &mut patches);
    patch_split_max(config, &mut patches);

    let mut chars: Vec<char> = to_chars(&null_padding);
    chars.extend(to_chars(text));
    chars.extend(to_chars(&null_padding));

    let mut delta: isize = 0;
    let mut results = Vec::with_capacity(patches.len());

    for patch in &patches {
        let expected_loc = (patch.start2 as isize + delta).max(0) as usize;
        let text1 = to_chars(&diff_text1(&patch.diffs));

        let mut start_loc: Option<usize>;
        let mut end_loc: Option<usize> = None;

        if text1.len() > config.match_max_bits {
            let head = from_chars(&text1[..config.match_max_bits]);
            start_loc = match_main(config, &from_chars(&chars), &head, expected_loc).unwrap_or(None);
            if let Some(s) = start_loc {
                let tail_start = text1.len() - config.match_max_bits;
                let tail = from_chars(&text1[tail_start..]);
                end_loc = match_main(
                    config,
                    &from_chars(&chars),
                    &tail,
                    expected_loc + tail_start,
                )
                .unwrap_or(None);
                if end_loc.is_none() || end_loc.unwrap() < s {
                    start_loc = None;
                }
            }
        } else {
            start_loc = match_main(config, &from_chars(&chars), &from_chars(&text1), expected_loc)
                .unwrap_or(None);
        }

        let Some(start_loc) = start_loc else {
            results.push(false);
            delta -= patch.length2 as isize - patch.length1 as isize;
            continue;
        };

        results.push(true);
        delta = start_loc as isize - expected_loc as isize;

        let text2: Vec<char> = if let Some(end) = end_loc {
            chars[start_loc..(end + config.match_max_bits).min(chars.len())].to_vec()
        } else {
            chars[start_loc..(start_loc + text1.len()).min(chars.len())].to_vec()
        };

        if text1 == text2 {
            let insert_text = to_chars(&diff_text2(&patch.diffs));
            let mut new_chars = chars[..start_loc].to_vec();
            new_chars.extend(insert_text);
            new_chars.extend_from_slice(&chars[(start_loc + text1.len()).min(chars.len())..]);
            chars = new_chars;
            continue;
        }

        let mut sub_diffs = crate::diff::diff_main(config, &from_chars(&text1), &from_chars(&text2), false);
        if text1.len() > config.match_max_bits
            && crate::diff::diff_levenshtein(&sub_diffs) as f64 / text1.len() as f64
                > config.patch_delete_threshold
        {
            *results.last_mut().unwrap() = false;
            continue;
        }

        cleanup::cleanup_semantic_lossless(&mut sub_diffs);

        let mut index1 = 0usize;
        for m in &patch.diffs {
            let mut index2 = 0usize;
            if !m.is_equal() {
                index2 = x_index(&sub_diffs, index1);
            }
            match m {
                Op::Insert(t) => {
                    let t_chars = to_chars(t);
                    let at = (start_loc + index2).min(chars.len());
                    let mut new_chars = chars[..at].to_vec();
                    new_chars.extend(t_chars);
                    new_chars.extend_from_slice(&chars[at..]);
                    chars = new_chars;
                }
                Op::Delete(t) => {
                    let end2 = x_index(&sub_diffs, index1 + t.chars().count());
                    let from = (start_loc + index2).min(chars.len());
                    let to = (start_loc + end2).min(chars.len());
                    let mut new_chars = chars[..from].to_vec();
                    new_chars.extend_from_slice(&chars[to..]);
                    chars = new_chars;
                }
                Op::Equal(_) => {}
            }
            if !m.is_delete() {
                index1 += m.text().chars().count();
            }
        }
    }

    let pad_len = to_chars(&null_padding).len();
    let result_chars = &chars[pad_len..chars.len() - pad_len];
    (from_chars(result_chars), results)
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coords1 = match self.length1 {
            0 => format!("{},0", self.start1),
            1 => format!("{}", self.start1 + 1),
            n => format!("{},{}", self.start1 + 1, n),
        };
        let coords2 = match self.length2 {
            0 => format!("{},0", self.start2),
            1 => format!("{}", self.start2 + 1),
            n => format!("{},{}", self.start2 + 1, n),
        };
        writeln!(f, "@@ -{coords1} +{coords2} @@")?;
        for d in &self.diffs {
            let op = match d {
                Op::Insert(_) => '+',
                Op::Delete(_) => '-',
                Op::Equal(_) => ' ',
            };
            writeln!(f, "{op}{}", encode_uri(d.text()))?;
        }
        Ok(())
    }
}

/// Renders a full patch set as the concatenation of each hunk's
/// [`Display`] text.
pub fn patches_to_text(patches: &[Patch]) -> String {
    patches.iter().map(|p| p.to_string()).collect()
}

/// Parses a patch set in the text format produced by [`patches_to_text`].
pub fn patches_from_text(text: &str) -> Result<Vec<Patch>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut patches = Vec::new();
    let lines: Vec<&str> = text.split('\n').collect();
    let mut i = 0;

    while i < lines.len() {
        let header = lines[i];
        if header.is_empty() {
            i += 1;
            continue;
        }
        let (start1, length1, start2, length2) = parse_hunk_header(header)?;
        let mut patch = Patch {
            diffs: EditScript::new(),
            start1,
            start2,
            length1,
            length2,
        };
        i += 1;

        while i < lines.len() {
            let line = lines[i];
            if line.is_empty() {
                i += 1;
                continue;
            }
            let sign = line.chars().next().unwrap();
            if sign == '@' {
                break;
            }
            let payload = decode_uri(&line[sign.len_utf8()..])?;
            match sign {
                '-' => patch.diffs.push(Op::Delete(payload)),
                '+' => patch.diffs.push(Op::Insert(payload)),
                ' ' => patch.diffs.push(Op::Equal(payload)),
                other => return Err(Error::InvalidOp { op: other }),
            }
            i += 1;
        }

        patches.push(patch);
    }

    Ok(patches)
}

fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize)> {
    let invalid = || Error::InvalidPatchHeader {
        line: line.to_owned(),
    };

    let body = line
        .strip_prefix("@@ -")
        .and_then(|s| s.strip_suffix(" @@"))
        .ok_or_else(invalid)?;
    let (left, right) = body.split_once(" +").ok_or_else(invalid)?;

    let (start1, length1) = parse_range(left).ok_or_else(invalid)?;
    let (start2, length2) = parse_range(right).ok_or_else(invalid)?;
    Ok((start1, length1, start2, length2))
}

fn parse_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((a, "0")) => Some((a.parse().ok()?, 0)),
        Some((a, b)) => {
            let start: usize = a.parse().ok()?;
            Some((start.checked_sub(1)?, b.parse().ok()?))
        }
        None => {
            let start: usize = s.parse().ok()?;
            Some((start.checked_sub(1)?, 1))
        }
    }
}

impl FromStr for Patch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut patches = patches_from_text(s)?;
        if patches.len() != 1 {
            return Err(Error::InvalidPatchHeader {
                line: s.to_owned(),
            });
        }
        Ok(patches.remove(0))
    }
}
