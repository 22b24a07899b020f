//! Markdown-to-terminal projection for assistant messages. A deliberately
//! small subset: headings, paragraphs, lists, code, emphasis, links. Width
//! handling is left to the surrounding paragraph widget.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = MarkdownRenderer::default();
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 | HeadingLevel::H2 => style.fg(Color::Cyan),
        _ => style,
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn link_url_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::UNDERLINED)
}

#[derive(Default)]
struct MarkdownRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    bold: usize,
    italic: usize,
    strike: usize,
    heading: Option<HeadingLevel>,
    in_code_block: bool,
    code_buffer: String,
    /// One entry per open list; `Some` carries the next ordered-item number.
    list_stack: Vec<Option<u64>>,
    link_url: Option<String>,
}

impl MarkdownRenderer {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line();
                self.heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.heading = None;
                self.blank_line();
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                let mut code_lines: Vec<&str> = self.code_buffer.split('\n').collect();
                // The fenced block's trailing newline is not a line.
                if code_lines.last() == Some(&"") {
                    code_lines.pop();
                }
                for line in code_lines {
                    self.lines
                        .push(Line::from(Span::styled(line.to_string(), code_style())));
                }
                self.code_buffer.clear();
                self.blank_line();
            }
            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::raw(format!("{indent}{marker}")));
            }
            Event::End(TagEnd::Item) => self.flush_line(),
            Event::Start(Tag::Emphasis) => self.italic += 1,
            Event::End(TagEnd::Emphasis) => self.italic = self.italic.saturating_sub(1),
            Event::Start(Tag::Strong) => self.bold += 1,
            Event::End(TagEnd::Strong) => self.bold = self.bold.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => self.strike += 1,
            Event::End(TagEnd::Strikethrough) => self.strike = self.strike.saturating_sub(1),
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link_url = Some(dest_url.into_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = self.link_url.take() {
                    if !url.is_empty() {
                        self.spans
                            .push(Span::styled(format!(" ({url})"), link_url_style()));
                    }
                }
            }
            Event::Text(text) => {
                if self.in_code_block {
                    self.code_buffer.push_str(&text);
                } else {
                    let style = self.current_style();
                    self.spans.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(text) => {
                self.spans
                    .push(Span::styled(text.into_string(), code_style()));
            }
            Event::SoftBreak | Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled(
                    "────────".to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank_line();
            }
            _ => {}
        }
    }

    fn current_style(&self) -> Style {
        let mut style = match self.heading {
            Some(level) => heading_style(level),
            None => Style::default(),
        };
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        if !self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.iter().all(|s| s.content.is_empty()))
        {
            self.lines.pop();
        }
        self.lines
    }
}
