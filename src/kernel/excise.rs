//! Removal of complete preprocessor conditional blocks.
//!
//! A block is located by a literal signature (its opening text, e.g.
//! `#ifdef CONFIG_FOO\n\tif (x)`) and extends to the `#endif` that closes it,
//! honouring nested `#if`/`#ifdef`/`#ifndef` blocks.
//!
//! Directives are found by a plain lexical scan. Tokens inside comments or
//! string literals are counted like real directives; the target regions in
//! the kernel sources this tool is used on do not contain such text.

use once_cell::sync::Lazy;
use regex::Regex;

static CONDITIONAL_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#\s*(ifdef|ifndef|if\b|elif|else|endif)").expect("Invalid conditional token regex")
});

/// Result of [`remove_ifdef_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRemoval {
    /// The block was found and removed; carries the new text.
    Removed(String),
    /// The signature does not occur in the text.
    NotFound,
    /// The signature occurs but no matching `#endif` closes it.
    Unbalanced,
}

/// Byte offset just past the `#endif` that closes the block opened at `start`,
/// including one trailing newline.
fn matching_endif(text: &str, start: usize) -> Option<usize> {
    let mut depth: i32 = 0;

    for caps in CONDITIONAL_TOKEN_REGEX.captures_iter(&text[start..]) {
        let (Some(token), Some(keyword)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        match keyword.as_str() {
            "if" | "ifdef" | "ifndef" => depth += 1,
            "endif" => {
                depth -= 1;
                if depth == 0 {
                    let mut end = start + token.end();
                    if text.as_bytes().get(end) == Some(&b'\n') {
                        end += 1;
                    }
                    return Some(end);
                }
            }
            // else / elif
            _ => {}
        }
    }

    None
}

/// Remove the complete `#ifdef ... #endif` block opened by `signature`.
///
/// Only the first occurrence of the signature is considered. The input is
/// never modified; on [`BlockRemoval::Unbalanced`] the caller keeps its text.
///
/// # Examples
///
/// ```
/// use susfs_fixup::kernel::excise::{remove_ifdef_block, BlockRemoval};
///
/// let src = "#ifdef A\nX\n#ifdef B\nY\n#endif\nZ\n#endif\nTAIL";
/// assert_eq!(
///     remove_ifdef_block(src, "#ifdef A"),
///     BlockRemoval::Removed("TAIL".to_string())
/// );
/// ```
pub fn remove_ifdef_block(text: &str, signature: &str) -> BlockRemoval {
    let Some(start) = text.find(signature) else {
        return BlockRemoval::NotFound;
    };

    match matching_endif(text, start) {
        Some(end) => {
            let mut result = String::with_capacity(text.len() - (end - start));
            result.push_str(&text[..start]);
            result.push_str(&text[end..]);
            BlockRemoval::Removed(result)
        }
        None => BlockRemoval::Unbalanced,
    }
}
