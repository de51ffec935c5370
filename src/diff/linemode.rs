//! The line-mode speedup: large inputs are first diffed one line at a
//! time (each distinct line collapsed to a single pseudo-character), then
//! the coarse script is refined by re-diffing each delete/insert run at
//! character granularity.

use super::{cleanup, diff_chars, EditScript, Op};
use crate::config::Config;
use crate::primitives::{from_chars, to_chars};
use std::collections::HashMap;
use std::time::Instant;

/// Runs the line-mode speedup end to end: encode, line-level diff, decode,
/// semantic cleanup, then re-diff each delete/insert run at char
/// granularity.
pub fn diff_line_mode(
    config: &Config,
    text1: &[char],
    text2: &[char],
    deadline: Option<Instant>,
) -> EditScript {
    let encoded = lines_to_chars(text1, text2);

    let mut diffs = diff_chars(config, &encoded.chars1, &encoded.chars2, false, deadline);
    chars_to_lines(&mut diffs, &encoded.line_array);
    cleanup::cleanup_semantic(&mut diffs);

    rediff_runs(config, diffs, deadline)
}

pub struct LinesToChars {
    pub chars1: Vec<char>,
    pub chars2: Vec<char>,
    pub line_array: Vec<Vec<char>>,
}

/// Encodes each distinct line of `text1`/`text2` into a single pseudo-char,
/// so the line-level diff can reuse the character-level diff machinery.
/// `text1` is capped at 40,000 distinct lines, `text2` at 65,535, matching
/// the upstream project's UTF-16-code-unit ceiling.
pub fn lines_to_chars(text1: &[char], text2: &[char]) -> LinesToChars {
    let mut line_array: Vec<Vec<char>> = vec![Vec::new()];
    let mut line_hash: HashMap<Vec<char>, usize> = HashMap::new();

    let chars1 = munge_lines(text1, &mut line_array, &mut line_hash, 40_000);
    let chars2 = munge_lines(text2, &mut line_array, &mut line_hash, 65_535);

    LinesToChars {
        chars1,
        chars2,
        line_array,
    }
}

fn munge_lines(
    text: &[char],
    line_array: &mut Vec<Vec<char>>,
    line_hash: &mut HashMap<Vec<char>, usize>,
    max_lines: usize,
) -> Vec<char> {
    let mut chars = Vec::new();
    let mut line_start = 0;

    while line_start < text.len() {
        let mut line_end = text[line_start..]
            .iter()
            .position(|&c| c == '\n')
            .map(|p| line_start + p)
            .unwrap_or(text.len() - 1);

        let mut line: Vec<char> = text[line_start..=line_end.min(text.len() - 1)].to_vec();

        if let Some(&index) = line_hash.get(&line) {
            chars.push(index_to_char(index as u32));
        } else {
            if line_array.len() == max_lines {
                line = text[line_start..].to_vec();
                line_end = text.len() - 1;
            }
            let index = line_array.len();
            chars.push(index_to_char(index as u32));
            line_hash.insert(line.clone(), index);
            line_array.push(line);
        }

        line_start = line_end + 1;
    }

    chars
}

/// Maps a line index to a private-use pseudo-char, skipping the UTF-16
/// surrogate range so every index below `0x10000` still yields a valid
/// `char`.
fn index_to_char(index: u32) -> char {
    let code_point = if index < 0xD800 { index } else { index + 0x0800 };
    char::from_u32(code_point).expect("line index stays within the scalar value range")
}

/// Replaces each pseudo-char in a line-level edit script with the actual
/// line text it stood for.
fn chars_to_lines(diffs: &mut [Op], line_array: &[Vec<char>]) {
    for d in diffs.iter_mut() {
        let decoded: String = d
            .text()
            .chars()
            .flat_map(|c| line_array[char_to_index(c)].iter())
            .collect();
        *d = match d {
            Op::Delete(_) => Op::Delete(decoded),
            Op::Insert(_) => Op::Insert(decoded),
            Op::Equal(_) => Op::Equal(decoded),
        };
    }
}

fn char_to_index(c: char) -> usize {
    let code_point = c as u32;
    if code_point < 0xD800 {
        code_point as usize
    } else {
        (code_point - 0x0800) as usize
    }
}

/// Walks the decoded, semantically-cleaned script, and replaces every run
/// of consecutive deletes/inserts bounded by equalities with the result of
/// re-diffing that run's text at full character granularity.
fn rediff_runs(config: &Config, diffs: EditScript, deadline: Option<Instant>) -> EditScript {
    let mut out = Vec::with_capacity(diffs.len());
    let mut text_delete: Vec<char> = Vec::new();
    let mut text_insert: Vec<char> = Vec::new();

    for d in diffs.into_iter().chain(std::iter::once(Op::Equal(String::new()))) {
        match &d {
            Op::Insert(t) => text_insert.extend(to_chars(t)),
            Op::Delete(t) => text_delete.extend(to_chars(t)),
            Op::Equal(_) => {
                if !text_delete.is_empty() && !text_insert.is_empty() {
                    out.extend(diff_chars(
                        config,
                        &text_delete,
                        &text_insert,
                        false,
                        deadline,
                    ));
                } else {
                    if !text_delete.is_empty() {
                        out.push(Op::Delete(from_chars(&text_delete)));
                    }
                    if !text_insert.is_empty() {
                        out.push(Op::Insert(from_chars(&text_insert)));
                    }
                }
                text_delete.clear();
                text_insert.clear();
                if !d.text().is_empty() {
                    out.push(d);
                }
            }
        }
    }

    out
}
