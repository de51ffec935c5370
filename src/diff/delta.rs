//! Delta encoding: a compact, text-safe serialization of an [`EditScript`]
//! relative to a known `text1`, used by patches and by callers who want to
//! ship a diff without re-sending the full source text.

use super::{EditScript, Op};
use crate::error::{Error, Result};
use crate::primitives::{from_chars, to_chars};

/// Serializes `diffs` as a tab-separated sequence of `=N`/`-N`/`+text`
/// tokens. Insert payloads are percent-encoded with the same unreserved
/// character set as `encodeURI`, with `%20` rewritten back to a literal
/// space for readability.
pub fn diff_to_delta(diffs: &[Op]) -> String {
    diffs
        .iter()
        .map(|d| match d {
            Op::Insert(t) => format!("+{}", encode_uri(t)),
            Op::Delete(t) => format!("-{}", t.chars().count()),
            Op::Equal(t) => format!("={}", t.chars().count()),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Reconstructs an [`EditScript`] from a `text1` and the delta produced
/// against it by [`diff_to_delta`]. Every `=`/`-` token consumes that many
/// chars of `text1`; the full source must be exhausted exactly by the end
/// of the delta.
pub fn diff_from_delta(text1: &str, delta: &str) -> Result<EditScript> {
    let chars1 = to_chars(text1);
    let mut pointer = 0usize;
    let mut diffs = EditScript::new();

    for token in delta.split('\t') {
        if token.is_empty() {
            continue;
        }
        let mut chars = token.chars();
        let tag = chars.next().expect("token is non-empty");
        let param = chars.as_str();

        match tag {
            '+' => {
                diffs.push(Op::Insert(decode_uri(param)?));
            }
            '-' | '=' => {
                let n: usize = param
                    .parse()
                    .map_err(|_| Error::InvalidOp { op: tag })?;
                if pointer + n > chars1.len() {
                    return Err(Error::DeltaLengthMismatch {
                        delta_len: pointer + n,
                        text_len: chars1.len(),
                    });
                }
                let text = from_chars(&chars1[pointer..pointer + n]);
                pointer += n;
                diffs.push(if tag == '=' {
                    Op::Equal(text)
                } else {
                    Op::Delete(text)
                });
            }
            other => return Err(Error::InvalidOp { op: other }),
        }
    }

    if pointer != chars1.len() {
        return Err(Error::DeltaLengthMismatch {
            delta_len: pointer,
            text_len: chars1.len(),
        });
    }

    Ok(diffs)
}

/// Bytes left unescaped by `encodeURI` in the reference implementation:
/// ASCII alphanumerics plus `- _ . ! ~ * ' ( ) ; / ? : @ & = + $ , #`.
fn is_uri_safe(b: u8) -> bool {
    matches!(
        b,
        b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')'
            | b';' | b'/' | b'?' | b':' | b'@' | b'&' | b'=' | b'+' | b'$' | b',' | b'#'
    )
}

pub(crate) fn encode_uri(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.as_bytes() {
        if is_uri_safe(*b) {
            out.push(*b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out.replace("%20", " ")
}

pub(crate) fn decode_uri(s: &str) -> Result<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return Err(Error::IllegalEscape { offset: i });
            }
            let hi = hex_val(bytes[i + 1]).ok_or(Error::IllegalEscape { offset: i })?;
            let lo = hex_val(bytes[i + 2]).ok_or(Error::IllegalEscape { offset: i })?;
            out.push(hi * 16 + lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| Error::IllegalEscape { offset: 0 })
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_tokens_and_percent_escapes() {
        let diffs = vec![
            Op::Equal("jump".into()),
            Op::Delete("s".into()),
            Op::Insert("ed".into()),
            Op::Equal(" over ".into()),
            Op::Delete("the".into()),
            Op::Insert("a".into()),
            Op::Equal(" lazy".into()),
        ];
        assert_eq!(diff_to_delta(&diffs), "=4\t-1\t+ed\t=6\t-3\t+a\t=5");
    }

    #[test]
    fn encodes_reserved_and_non_ascii() {
        let diffs = vec![Op::Insert("100%\u{2603}\u{00e9}".into())];
        assert_eq!(diff_to_delta(&diffs), "+100%25%E2%98%83%C3%A9");
    }

    #[test]
    fn round_trips_through_delta() {
        let text1 = "jumps over the lazy";
        let diffs = vec![
            Op::Equal("jump".into()),
            Op::Delete("s".into()),
            Op::Insert("ed".into()),
            Op::Equal(" over ".into()),
            Op::Delete("the".into()),
            Op::Insert("a".into()),
            Op::Equal(" lazy".into()),
        ];
        let delta = diff_to_delta(&diffs);
        let decoded = diff_from_delta(text1, &delta).unwrap();
        assert_eq!(decoded, diffs);
    }

    #[test]
    fn rejects_mismatched_source_length() {
        let err = diff_from_delta("short", "=10").unwrap_err();
        assert_eq!(
            err,
            Error::DeltaLengthMismatch {
                delta_len: 10,
                text_len: 5
            }
        );
    }

    #[test]
    fn rejects_unknown_operation() {
        let err = diff_from_delta("abc", "!3").unwrap_err();
        assert_eq!(err, Error::InvalidOp { op: '!' });
    }

    #[test]
    fn rejects_illegal_escape() {
        let err = diff_from_delta("abc", "+%zz").unwrap_err();
        assert_eq!(err, Error::IllegalEscape { offset: 0 });
    }
}
