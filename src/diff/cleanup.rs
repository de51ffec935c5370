//! The four cleanup passes: [`cleanup_merge`] coalesces and shifts edits
//! into a canonical form, [`cleanup_semantic`] (and its lossless boundary
//! slide) trade minimality for human-readable output, and
//! [`cleanup_efficiency`] trims edits too small to be worth their own hunk.

use super::{EditScript, Op};
use crate::primitives::{common_overlap, common_prefix, common_suffix, from_chars, to_chars};

/// Coalesces adjacent same-kind operations, factors a common affix out of
/// adjacent delete/insert runs into the surrounding equalities, and then
/// slides single edits sideways across an equality when doing so deletes
/// that equality outright. Runs to a fixed point: a shift in the second
/// phase can create new merge opportunities, so the whole pass repeats
/// until a sweep makes no further change (see DESIGN.md for why this is a
/// loop here rather than the original's self-recursion).
pub fn cleanup_merge(diffs: &mut EditScript) {
    loop {
        let merged = merge_pass(std::mem::take(diffs));
        *diffs = merged;
        if !shift_sweep(diffs) {
            break;
        }
    }
}

fn push_equal(out: &mut EditScript, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Op::Equal(prev)) = out.last_mut() {
        prev.push_str(text);
    } else {
        out.push(Op::Equal(text.to_owned()));
    }
}

fn merge_pass(diffs: EditScript) -> EditScript {
    let mut out = EditScript::new();
    let mut i = 0;
    while i < diffs.len() {
        match &diffs[i] {
            Op::Equal(t) => {
                push_equal(&mut out, t);
                i += 1;
            }
            _ => {
                let mut text_delete = String::new();
                let mut text_insert = String::new();
                while i < diffs.len() && !diffs[i].is_equal() {
                    match &diffs[i] {
                        Op::Delete(t) => text_delete.push_str(t),
                        Op::Insert(t) => text_insert.push_str(t),
                        Op::Equal(_) => unreachable!(),
                    }
                    i += 1;
                }

                let mut del_chars = to_chars(&text_delete);
                let mut ins_chars = to_chars(&text_insert);

                if !del_chars.is_empty() && !ins_chars.is_empty() {
                    let prefix_len = common_prefix(&ins_chars, &del_chars);
                    if prefix_len > 0 {
                        push_equal(&mut out, &from_chars(&ins_chars[..prefix_len]));
                        del_chars.drain(..prefix_len);
                        ins_chars.drain(..prefix_len);
                    }
                    let suffix_len = common_suffix(&ins_chars, &del_chars);
                    let suffix_text = if suffix_len > 0 {
                        let s = from_chars(&ins_chars[ins_chars.len() - suffix_len..]);
                        del_chars.truncate(del_chars.len() - suffix_len);
                        ins_chars.truncate(ins_chars.len() - suffix_len);
                        s
                    } else {
                        String::new()
                    };

                    if !del_chars.is_empty() {
                        out.push(Op::Delete(from_chars(&del_chars)));
                    }
                    if !ins_chars.is_empty() {
                        out.push(Op::Insert(from_chars(&ins_chars)));
                    }
                    push_equal(&mut out, &suffix_text);
                } else {
                    if !del_chars.is_empty() {
                        out.push(Op::Delete(from_chars(&del_chars)));
                    }
                    if !ins_chars.is_empty() {
                        out.push(Op::Insert(from_chars(&ins_chars)));
                    }
                }
            }
        }
    }
    out
}

fn set_text(op: &mut Op, text: String) {
    *op = match op {
        Op::Delete(_) => Op::Delete(text),
        Op::Insert(_) => Op::Insert(text),
        Op::Equal(_) => Op::Equal(text),
    };
}

/// A single pass looking for an edit bounded on both sides by equalities
/// where the edit's own text repeats one of those equalities at its near
/// boundary, letting that equality be absorbed and eliminated.
fn shift_sweep(diffs: &mut EditScript) -> bool {
    let mut changed = false;
    let mut pointer = 1usize;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].is_equal() && diffs[pointer + 1].is_equal() {
            let prev_chars = to_chars(diffs[pointer - 1].text());
            let next_chars = to_chars(diffs[pointer + 1].text());
            let cur_chars = to_chars(diffs[pointer].text());

            if prev_chars.len() <= cur_chars.len()
                && cur_chars[cur_chars.len() - prev_chars.len()..] == prev_chars[..]
            {
                let mut new_cur = prev_chars.clone();
                new_cur.extend_from_slice(&cur_chars[..cur_chars.len() - prev_chars.len()]);
                set_text(&mut diffs[pointer], from_chars(&new_cur));

                let mut new_next = prev_chars;
                new_next.extend_from_slice(&next_chars);
                set_text(&mut diffs[pointer + 1], from_chars(&new_next));

                diffs.remove(pointer - 1);
                changed = true;
            } else if next_chars.len() <= cur_chars.len()
                && cur_chars[..next_chars.len()] == next_chars[..]
            {
                let mut new_prev = prev_chars;
                new_prev.extend_from_slice(&next_chars);
                set_text(&mut diffs[pointer - 1], from_chars(&new_prev));

                let mut new_cur = cur_chars[next_chars.len()..].to_vec();
                new_cur.extend_from_slice(&next_chars);
                set_text(&mut diffs[pointer], from_chars(&new_cur));

                diffs.remove(pointer + 1);
                changed = true;
            }
        }
        pointer += 1;
    }
    changed
}

/// Eliminates equalities that are operationally irrelevant: too small,
/// relative to the edits on either side, to be worth keeping whole.
/// Finishes with a boundary slide ([`cleanup_semantic_lossless`]) and an
/// overlap-trimming pass between adjacent delete/insert pairs.
pub fn cleanup_semantic(diffs: &mut EditScript) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    let mut length_insertions1 = 0usize;
    let mut length_deletions1 = 0usize;
    let mut length_insertions2 = 0usize;
    let mut length_deletions2 = 0usize;

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].is_equal() {
            equalities.push(p);
            length_insertions1 = length_insertions2;
            length_deletions1 = length_deletions2;
            length_insertions2 = 0;
            length_deletions2 = 0;
            last_equality = Some(diffs[p].text().to_owned());
        } else {
            let len = diffs[p].text().chars().count();
            if diffs[p].is_insert() {
                length_insertions2 += len;
            } else {
                length_deletions2 += len;
            }
            if let Some(eq) = last_equality.clone() {
                let eq_len = eq.chars().count();
                if eq_len <= length_insertions1.max(length_deletions1)
                    && eq_len <= length_insertions2.max(length_deletions2)
                {
                    let idx = *equalities.last().unwrap();
                    diffs.insert(idx, Op::Delete(eq));
                    let t = diffs[idx + 1].text().to_owned();
                    diffs[idx + 1] = Op::Insert(t);
                    equalities.pop();
                    equalities.pop();
                    pointer = equalities.last().map(|&i| i as isize).unwrap_or(-1);
                    length_insertions1 = 0;
                    length_deletions1 = 0;
                    length_insertions2 = 0;
                    length_deletions2 = 0;
                    last_equality = None;
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }

    cleanup_semantic_lossless(diffs);

    // Trim overlaps between adjacent delete/insert pairs by carving a
    // shared equality out of whichever end they overlap on.
    let mut pointer = 1usize;
    while pointer < diffs.len() {
        if diffs[pointer - 1].is_delete() && diffs[pointer].is_insert() {
            let deletion = to_chars(diffs[pointer - 1].text());
            let insertion = to_chars(diffs[pointer].text());
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);

            if overlap1 >= overlap2 {
                if (overlap1 as f64) >= deletion.len() as f64 / 2.0
                    || (overlap1 as f64) >= insertion.len() as f64 / 2.0
                {
                    diffs.insert(pointer, Op::Equal(from_chars(&insertion[..overlap1])));
                    diffs[pointer - 1] =
                        Op::Delete(from_chars(&deletion[..deletion.len() - overlap1]));
                    diffs[pointer + 1] = Op::Insert(from_chars(&insertion[overlap1..]));
                    pointer += 1;
                }
            } else if (overlap2 as f64) >= deletion.len() as f64 / 2.0
                || (overlap2 as f64) >= insertion.len() as f64 / 2.0
            {
                diffs.insert(pointer, Op::Equal(from_chars(&deletion[..overlap2])));
                diffs[pointer - 1] =
                    Op::Insert(from_chars(&insertion[..insertion.len() - overlap2]));
                diffs[pointer + 1] = Op::Delete(from_chars(&deletion[overlap2..]));
                pointer += 1;
            }
        }
        pointer += 1;
    }

    diffs.retain(|d| !d.text().is_empty());
}

/// Scores how good a boundary is to split an edit at: 0 (mid-word) through
/// 6 (at a text boundary), favoring line breaks and blank lines over plain
/// whitespace over punctuation.
fn semantic_score(one: &[char], two: &[char]) -> u8 {
    if one.is_empty() || two.is_empty() {
        return 6;
    }

    let char1 = *one.last().unwrap();
    let char2 = two[0];

    let non_alnum1 = !char1.is_alphanumeric();
    let non_alnum2 = !char2.is_alphanumeric();
    let whitespace1 = non_alnum1 && char1.is_whitespace();
    let whitespace2 = non_alnum2 && char2.is_whitespace();
    let linebreak1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let linebreak2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blank_line1 = linebreak1 && ends_with_blank_line(one);
    let blank_line2 = linebreak2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if linebreak1 || linebreak2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

fn ends_with_blank_line(text: &[char]) -> bool {
    let n = text.len();
    (n >= 2 && text[n - 2] == '\n' && text[n - 1] == '\n')
        || (n >= 3 && text[n - 3] == '\n' && text[n - 2] == '\r' && text[n - 1] == '\n')
}

fn starts_with_blank_line(text: &[char]) -> bool {
    let n = text.len();
    (n >= 2 && text[0] == '\n' && text[1] == '\n')
        || (n >= 3 && text[0] == '\n' && text[1] == '\r' && text[2] == '\n')
        || (n >= 3 && text[0] == '\r' && text[1] == '\n' && text[2] == '\n')
        || (n >= 4 && text[0] == '\r' && text[1] == '\n' && text[2] == '\r' && text[3] == '\n')
}

/// Slides the boundary of a single edit, bounded on both sides by
/// equalities, left or right as long as doing so doesn't change the
/// strings it reconstructs, choosing the position with the best
/// [`semantic_score`].
pub(crate) fn cleanup_semantic_lossless(diffs: &mut EditScript) {
    let mut pointer: isize = 1;
    while pointer + 1 < diffs.len() as isize {
        let p = pointer as usize;
        if diffs[p - 1].is_equal() && diffs[p + 1].is_equal() {
            let mut equality1 = to_chars(diffs[p - 1].text());
            let mut edit = to_chars(diffs[p].text());
            let mut equality2 = to_chars(diffs[p + 1].text());

            let common_offset = common_suffix(&equality1, &edit);
            if common_offset > 0 {
                let common_string: Vec<char> = edit[edit.len() - common_offset..].to_vec();
                equality1.truncate(equality1.len() - common_offset);
                let mut new_edit = common_string.clone();
                new_edit.extend_from_slice(&edit[..edit.len() - common_offset]);
                edit = new_edit;
                let mut new_eq2 = common_string;
                new_eq2.extend_from_slice(&equality2);
                equality2 = new_eq2;
            }

            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score =
                semantic_score(&equality1, &edit) + semantic_score(&edit, &equality2);

            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                let c = edit.remove(0);
                equality1.push(c);
                let c2 = equality2.remove(0);
                edit.push(c2);

                let score = semantic_score(&equality1, &edit) + semantic_score(&edit, &equality2);
                if score >= best_score {
                    best_score = score;
                    best_equality1 = equality1.clone();
                    best_edit = edit.clone();
                    best_equality2 = equality2.clone();
                }
            }

            if to_chars(diffs[p - 1].text()) != best_equality1 {
                if !best_equality1.is_empty() {
                    set_text(&mut diffs[p - 1], from_chars(&best_equality1));
                } else {
                    diffs.remove(p - 1);
                    pointer -= 1;
                }
                let p = pointer as usize;
                set_text(&mut diffs[p], from_chars(&best_edit));
                if !best_equality2.is_empty() {
                    set_text(&mut diffs[p + 1], from_chars(&best_equality2));
                } else {
                    diffs.remove(p + 1);
                    pointer -= 1;
                }
            }
        }
        pointer += 1;
    }
}

/// Eliminates equalities too small, relative to `edit_cost`, to be worth
/// the overhead of their own unchanged hunk, folding them into the
/// surrounding edit instead. Unlike [`cleanup_semantic`], this is never run
/// implicitly by [`super::diff_main`]; callers opt in explicitly when they
/// intend to render the result as patch hunks.
pub fn cleanup_efficiency(diffs: &mut EditScript, edit_cost: usize) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    let mut pre_ins = false;
    let mut pre_del = false;
    let mut post_ins = false;
    let mut post_del = false;

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].is_equal() {
            let len = diffs[p].text().chars().count();
            if len < edit_cost && (post_ins || post_del) {
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[p].text().to_owned());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[p].is_delete() {
                post_del = true;
            } else {
                post_ins = true;
            }

            let three_of_four =
                [pre_ins, pre_del, post_ins, post_del].iter().filter(|&&b| b).count() == 3;

            if let Some(eq) = last_equality.clone() {
                let eq_len = eq.chars().count();
                if (pre_ins && pre_del && post_ins && post_del)
                    || (eq_len < edit_cost / 2 && three_of_four)
                {
                    let idx = *equalities.last().unwrap();
                    diffs.insert(idx, Op::Delete(eq));
                    let t = diffs[idx + 1].text().to_owned();
                    diffs[idx + 1] = Op::Insert(t);
                    equalities.pop();
                    last_equality = None;

                    if pre_ins && pre_del {
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        equalities.pop();
                        pointer = equalities.last().map(|&i| i as isize).unwrap_or(-1);
                        post_ins = false;
                        post_del = false;
                    }
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_coalesces_adjacent_same_kind() {
        let mut diffs = vec![
            Op::Equal("a".into()),
            Op::Delete("b".into()),
            Op::Delete("c".into()),
            Op::Insert("d".into()),
            Op::Insert("e".into()),
            Op::Equal("f".into()),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Op::Equal("a".into()),
                Op::Delete("bc".into()),
                Op::Insert("de".into()),
                Op::Equal("f".into()),
            ]
        );
    }

    #[test]
    fn merge_factors_common_affix_into_equalities() {
        let mut diffs = vec![
            Op::Equal("a".into()),
            Op::Delete("abc".into()),
            Op::Insert("abd".into()),
            Op::Equal("c".into()),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Op::Equal("aab".into()),
                Op::Delete("c".into()),
                Op::Insert("d".into()),
                Op::Equal("c".into()),
            ]
        );
    }

    #[test]
    fn merge_shift_eliminates_equality() {
        let mut diffs = vec![
            Op::Equal("a".into()),
            Op::Insert("ba".into()),
            Op::Equal("c".into()),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(diffs, vec![Op::Insert("ab".into()), Op::Equal("ac".into())]);
    }

    #[test]
    fn semantic_eliminates_small_equalities() {
        let mut diffs = vec![
            Op::Delete("ab".into()),
            Op::Equal("cd".into()),
            Op::Delete("e".into()),
            Op::Equal("f".into()),
            Op::Insert("g".into()),
        ];
        cleanup_semantic(&mut diffs);
        assert_eq!(
            diffs,
            vec![Op::Delete("abcdef".into()), Op::Insert("cdfg".into())]
        );
    }

    #[test]
    fn semantic_leaves_large_equalities_alone() {
        let mut diffs = vec![
            Op::Delete("ab".into()),
            Op::Equal("cd".into()),
            Op::Delete("e".into()),
            Op::Equal("f".into()),
            Op::Insert("g".into()),
            Op::Equal("xxxxxxxxxxxxxxxxx".into()),
        ];
        cleanup_semantic(&mut diffs);
        assert!(diffs.iter().any(|d| d.text() == "xxxxxxxxxxxxxxxxx"));
    }

    #[test]
    fn lossless_slides_boundary_to_word_edge() {
        let mut diffs = vec![
            Op::Equal("The c".into()),
            Op::Insert("ow and the c".into()),
            Op::Equal("at.".into()),
        ];
        cleanup_semantic(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Op::Equal("The ".into()),
                Op::Insert("cow and the ".into()),
                Op::Equal("cat.".into()),
            ]
        );
    }

    #[test]
    fn efficiency_keeps_equality_at_cost_boundary() {
        let mut diffs = vec![
            Op::Delete("ab".into()),
            Op::Insert("12".into()),
            Op::Equal("wxyz".into()),
            Op::Delete("cd".into()),
            Op::Insert("34".into()),
        ];
        let expected = diffs.clone();
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(diffs, expected);
    }

    #[test]
    fn efficiency_folds_equality_under_cost() {
        let mut diffs = vec![
            Op::Delete("ab".into()),
            Op::Insert("12".into()),
            Op::Equal("xyz".into()),
            Op::Delete("cd".into()),
            Op::Insert("34".into()),
        ];
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(
            diffs,
            vec![Op::Delete("abxyzcd".into()), Op::Insert("12xyz34".into())]
        );
    }

    #[test]
    fn efficiency_folds_equality_when_cost_raised() {
        let mut diffs = vec![
            Op::Delete("ab".into()),
            Op::Insert("12".into()),
            Op::Equal("wxyz".into()),
            Op::Delete("cd".into()),
            Op::Insert("34".into()),
        ];
        cleanup_efficiency(&mut diffs, 5);
        assert_eq!(
            diffs,
            vec![
                Op::Delete("abwxyzcd".into()),
                Op::Insert("12wxyz34".into()),
            ]
        );
    }
}
