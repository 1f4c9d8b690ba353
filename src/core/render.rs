//! Markdown to HTML for chat bubbles.

use pulldown_cmark::{Event, Options, Parser, html};

/// Renders answer text as HTML. Raw HTML in the source is dropped, and single line breaks are
/// kept as `<br />` so multi-line answers display the way they were authored.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::SoftBreak => Some(Event::HardBreak),
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
