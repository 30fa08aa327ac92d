//! Document transformation.
//!
//! Each page goes through the same fixed sequence of pure byte transforms:
//!
//! ```text
//! content ──► menu ++ content ──► render ──► style ++ html ──► charset ++ …
//! ```
//!
//! The order is part of the output format. Every generated page starts with
//! [`CHARSET`], immediately followed by the stylesheet block, then the
//! rendered body.
//!
//! Markdown is rendered with [pulldown-cmark](https://docs.rs/pulldown-cmark)
//! using the GitHub-flavoured extensions (tables, strikethrough, task lists,
//! footnotes).

use pulldown_cmark::{Options, Parser, html as md_html};

/// Charset declaration that opens every generated page.
pub const CHARSET: &[u8] = br#"<meta charset="UTF-8">"#;

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Render markdown to HTML. Invalid UTF-8 sequences become U+FFFD.
pub fn compile_markdown(text: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(text);
    let parser = Parser::new_ext(&text, markdown_options());
    let mut html = String::with_capacity(text.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html.into_bytes()
}

fn prepend(head: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len() + body.len());
    out.extend_from_slice(head);
    out.extend_from_slice(body);
    out
}

/// Put the stylesheet block in front of the rendered page.
pub fn inject_style(style: &[u8], html: &[u8]) -> Vec<u8> {
    prepend(style, html)
}

/// Put the charset declaration in front of the page.
pub fn inject_charset(html: &[u8]) -> Vec<u8> {
    prepend(CHARSET, html)
}

/// Turn one markdown document into a complete page.
///
/// `menu` is ignored when `skip_menu` is set.
pub fn transform(content: &[u8], menu: &[u8], style: &[u8], skip_menu: bool) -> Vec<u8> {
    let markdown = if skip_menu {
        content.to_vec()
    } else {
        prepend(menu, content)
    };
    let html = compile_markdown(&markdown);
    let styled = inject_style(style, &html);
    inject_charset(&styled)
}
