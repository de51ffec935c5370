//! Diff, match and patch: compute a minimal edit script between two
//! strings, simplify it for human or machine consumption, serialize it to
//! a compact delta or a unified-diff-style patch text, and fuzzily
//! re-apply that patch against text that has since drifted.
//!
//! The three engines build on each other:
//!
//! - [`diff`] computes an [`diff::EditScript`] between two strings (Myers
//!   bisection, sped up by half-match and line-mode), and offers four
//!   cleanup passes plus delta encode/decode.
//! - [`match_engine`] fuzzily locates a pattern in text via Bitap.
//! - [`patch`] builds, splits, pads, serializes and fuzzily applies
//!   [`patch::Patch`] hunks, using both of the above.
//!
//! Every entry point threads through a caller-held [`Config`] rather than
//! touching global state.

pub mod config;
pub mod diff;
pub mod error;
pub mod html;
pub mod match_engine;
pub mod patch;
pub mod primitives;

pub use config::Config;
pub use diff::{diff_main, EditScript, Op};
pub use error::{Error, Result};
pub use html::diff_pretty_html;
pub use match_engine::match_main;
pub use patch::{
    patch_add_padding, patch_apply, patch_split_max, patches_from_text, patches_to_text, Patch,
};
