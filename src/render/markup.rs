use pulldown_cmark::{html, Event, Options, Parser};

/// Turns the accumulated response text into display markup.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait Markup {
    fn render(&self, source: &str) -> String;
}

impl<T: Markup + ?Sized> Markup for &T {
    fn render(&self, source: &str) -> String {
        (**self).render(source)
    }
}

impl<T: Markup + ?Sized> Markup for Box<T> {
    fn render(&self, source: &str) -> String {
        (**self).render(source)
    }
}

/// CommonMark to HTML. Raw HTML in the source is escaped, never passed through.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownHtml {
    options: Options,
}

impl Default for MarkdownHtml {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl Markup for MarkdownHtml {
    fn render(&self, source: &str) -> String {
        let events = Parser::new_ext(source, self.options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });

        let mut out = String::with_capacity(source.len() + source.len() / 2);
        html::push_html(&mut out, events);
        out
    }
}

/// Leaves the text as is; for surfaces that show plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Markup for Passthrough {
    fn render(&self, source: &str) -> String {
        source.to_string()
    }
}
