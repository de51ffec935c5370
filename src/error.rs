//! The stable error taxonomy shared by the delta and patch-text parsers and
//! by the match engine's single runtime precondition.

/// Errors raised while decoding, parsing or matching.
///
/// A missing/absent string argument (the original's `NullInput`) and an
/// unrecognized `patch_make` argument shape (`InvalidCallShape`) have no
/// Rust equivalent: the type system already makes both unrepresentable (see
/// SPEC_FULL.md §7), so neither variant exists here.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// `match_bitap` was asked to search for a pattern longer than
    /// `Config::match_max_bits`.
    #[error("pattern of {len} chars exceeds the {max_bits}-char match_max_bits limit")]
    PatternTooLong {
        /// Length of the offending pattern, in chars.
        len: usize,
        /// The configured limit that was exceeded.
        max_bits: usize,
    },

    /// A `%XX` escape sequence could not be decoded.
    #[error("illegal percent-escape sequence at byte offset {offset}")]
    IllegalEscape {
        /// Byte offset of the offending `%` within the token being decoded.
        offset: usize,
    },

    /// A delta or patch token began with an unrecognized operation character.
    #[error("unknown diff operation character {op:?}")]
    InvalidOp {
        /// The unrecognized character.
        op: char,
    },

    /// The characters consumed out of `text1` while decoding a delta did
    /// not exhaust `text1` exactly.
    #[error("delta length ({delta_len}) does not match source length ({text_len})")]
    DeltaLengthMismatch {
        /// Total length implied by the delta's `=`/`-` tokens.
        delta_len: usize,
        /// Actual length of `text1`.
        text_len: usize,
    },

    /// A line that should have matched `@@ -A[,B] +C[,D] @@` did not.
    #[error("invalid patch hunk header: {line:?}")]
    InvalidPatchHeader {
        /// The offending line, verbatim.
        line: String,
    },
}

/// Convenience alias used throughout the crate's fallible entry points.
pub type Result<T> = std::result::Result<T, Error>;
