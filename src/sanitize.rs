//! Snippet sanitization for inbox summaries
//!
//! Inbox bodies are usually HTML mixed with quoted-printable residue. The
//! sanitizer reduces a body fragment to compact 7-bit text of at most
//! [`SNIPPET_MAX_CHARS`] characters.

use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on sanitized snippet length, in characters
pub const SNIPPET_MAX_CHARS: usize = 300;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static URL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static SOFT_ENCODING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=3D|=0A|=20|=C2|=A0|=E2").expect("valid encoding regex"));
static BOUNDARY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)--.*?--").expect("valid boundary regex"));
static BRACKET_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid placeholder regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Sanitize a raw email body fragment
///
/// Applies, in order: `<style>` block removal, tag removal, URL removal,
/// soft-encoding artifact replacement, `--...--` boundary removal, `[...]`
/// placeholder removal, non-ASCII removal, whitespace collapse and trim.
///
/// A later step can expose text an earlier step would have removed (for
/// example dropping a non-ASCII byte that split `http://`), so the pass is
/// repeated until the text stops changing. Every effective pass after the
/// first shrinks the text, which bounds the loop. The stable text is then
/// cut to [`SNIPPET_MAX_CHARS`], which makes `sanitize` idempotent.
pub fn sanitize(raw: &str) -> String {
    let mut current = sanitize_pass(raw);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }

    // Output is pure ASCII here, so the char cut is also a byte cut.
    current.truncate(SNIPPET_MAX_CHARS.min(current.len()));
    current.trim_end().to_owned()
}

fn sanitize_pass(input: &str) -> String {
    let text = STYLE_BLOCK.replace_all(input, "");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = URL_TOKEN.replace_all(&text, "");
    let text = SOFT_ENCODING.replace_all(&text, " ");
    let text = BOUNDARY_MARKER.replace_all(&text, "");
    let text = BRACKET_PLACEHOLDER.replace_all(&text, "");
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    WHITESPACE_RUN.replace_all(&ascii, " ").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{SNIPPET_MAX_CHARS, sanitize};

    #[test]
    fn strips_markup_urls_placeholders_and_artifacts() {
        assert_eq!(
            sanitize("<p>Hello <b>World</b></p> http://x.com [tag] =3D"),
            "Hello World"
        );
    }

    #[test]
    fn removes_style_blocks_across_lines_case_insensitively() {
        let raw = "<STYLE type=\"text/css\">\n.a { color: red; }\n</Style><div>Body</div>";
        assert_eq!(sanitize(raw), "Body");
    }

    #[test]
    fn removes_boundary_markers_and_non_ascii() {
        let raw = "Hi --boundary_42-- caf\u{e9} \u{1f600} there";
        assert_eq!(sanitize(raw), "Hi caf there");
    }

    #[test]
    fn soft_line_breaks_become_spaces() {
        assert_eq!(sanitize("line=0Aone=20two"), "line one two");
    }

    #[test]
    fn url_split_by_non_ascii_is_still_removed() {
        assert_eq!(sanitize("see h\u{e9}ttps://example.com/x now"), "see now");
    }

    #[test]
    fn truncates_to_bound_without_trailing_space() {
        let raw = format!("{} tail", "a ".repeat(400));
        let out = sanitize(&raw);
        assert!(out.len() <= SNIPPET_MAX_CHARS);
        assert!(!out.ends_with(' '));
        assert_eq!(sanitize(&out), out);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\t "), "");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(raw in "\\PC{0,600}") {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn output_is_bounded_ascii(raw in ".{0,900}") {
            let out = sanitize(&raw);
            prop_assert!(out.chars().count() <= SNIPPET_MAX_CHARS);
            prop_assert!(out.is_ascii());
        }

        #[test]
        fn markup_heavy_input_is_idempotent(
            raw in "(<[a-z]{1,4}>|</[a-z]{1,4}>|--|\\[|\\]|=3D|=20|http://|[a-z ]{1,6}|\u{e9}|\n){0,80}"
        ) {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
