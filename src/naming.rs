//! Source-to-output filename mapping.
//!
//! Every markdown source is written out as `<stem>.html`, where the stem is
//! the file name with its recognized suffix removed:
//! - `intro.md` → `intro.html`
//! - `release-notes.markdown` → `release-notes.html`
//! - `v1.2.md` → `v1.2.html`
//!
//! Only a trailing suffix counts, so `draft.md.bak` is not a source file.
//! Matching is case-sensitive.

use thiserror::Error;

/// Suffixes recognized as markdown when nothing else is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".md", ".markdown"];

/// Extension appended to every output file.
pub const OUTPUT_EXTENSION: &str = ".html";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("No recognized markdown extension on {0}")]
    UnknownExtension(String),
}

/// Find the recognized suffix `name` ends with.
///
/// When several suffixes match, the longest wins. A name that is nothing but
/// the suffix (`.md`) has no stem and does not match.
pub fn matching_suffix<'a, S: AsRef<str>>(name: &str, extensions: &'a [S]) -> Option<&'a str> {
    extensions
        .iter()
        .map(AsRef::as_ref)
        .filter(|ext| !ext.is_empty() && name.len() > ext.len() && name.ends_with(ext))
        .max_by_key(|ext| ext.len())
}

/// Whether `name` carries one of the recognized suffixes.
pub fn is_recognized<S: AsRef<str>>(name: &str, extensions: &[S]) -> bool {
    matching_suffix(name, extensions).is_some()
}

/// The file name with its recognized suffix removed.
pub fn stem<'n, S: AsRef<str>>(name: &'n str, extensions: &[S]) -> Option<&'n str> {
    matching_suffix(name, extensions).map(|ext| &name[..name.len() - ext.len()])
}

/// Map a source file name to the name of its HTML output.
pub fn output_name<S: AsRef<str>>(name: &str, extensions: &[S]) -> Result<String, NamingError> {
    stem(name, extensions)
        .map(|s| format!("{s}{OUTPUT_EXTENSION}"))
        .ok_or_else(|| NamingError::UnknownExtension(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md_becomes_html() {
        assert_eq!(output_name("intro.md", DEFAULT_EXTENSIONS).unwrap(), "intro.html");
    }

    #[test]
    fn markdown_becomes_html() {
        assert_eq!(
            output_name("release-notes.markdown", DEFAULT_EXTENSIONS).unwrap(),
            "release-notes.html"
        );
    }

    #[test]
    fn inner_dots_are_kept() {
        assert_eq!(output_name("v1.2.md", DEFAULT_EXTENSIONS).unwrap(), "v1.2.html");
    }

    #[test]
    fn only_trailing_suffix_counts() {
        let err = output_name("draft.md.bak", DEFAULT_EXTENSIONS).unwrap_err();
        assert_eq!(err, NamingError::UnknownExtension("draft.md.bak".into()));
    }

    #[test]
    fn own_output_is_rejected() {
        let html = output_name("a.md", DEFAULT_EXTENSIONS).unwrap();
        assert!(matches!(
            output_name(&html, DEFAULT_EXTENSIONS),
            Err(NamingError::UnknownExtension(name)) if name == "a.html"
        ));
    }

    #[test]
    fn bare_suffix_is_not_a_source() {
        assert!(!is_recognized(".md", DEFAULT_EXTENSIONS));
    }

    #[test]
    fn longest_suffix_wins() {
        let exts = [".md", ".page.md"];
        assert_eq!(stem("home.page.md", &exts), Some("home"));
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert!(!is_recognized("README.MD", DEFAULT_EXTENSIONS));
    }

    #[test]
    fn custom_extensions() {
        let exts = vec![".txt".to_string()];
        assert_eq!(output_name("notes.txt", &exts).unwrap(), "notes.html");
        assert!(output_name("notes.md", &exts).is_err());
    }
}
