//! Pure projection of application state onto the terminal: the transcript
//! pane, the session sidebar, and the input control. Nothing here mutates
//! the app; every frame is rebuilt from the registry and the in-flight
//! exchange.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::core::app::App;
use crate::core::constants::THINKING_INDICATOR;
use crate::core::message::Role;
use crate::ui::markdown::render_markdown;

const SIDEBAR_WIDTH: u16 = 30;
const INPUT_HEIGHT: u16 = 3;
const USER_PREFIX: &str = "You: ";
const USER_CONTINUATION: &str = "     ";

pub fn draw(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(f.area());

    draw_sidebar(f, app, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)])
        .split(columns[1]);

    draw_transcript(f, app, rows[0]);
    f.render_widget(&app.ui.input, rows[1]);
}

/// Message list for the active session, plus the in-flight accumulator when
/// it belongs to the visible conversation. User turns are split on newlines
/// and shown plain; assistant turns go through the markdown projection.
pub fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let Some(session) = app.store.active() else {
        return lines;
    };

    for msg in &session.history {
        match msg.role {
            Role::User => {
                let mut first = true;
                for part in msg.content.lines() {
                    let prefix = if first {
                        Span::styled(
                            USER_PREFIX,
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Span::raw(USER_CONTINUATION)
                    };
                    first = false;
                    lines.push(Line::from(vec![
                        prefix,
                        Span::styled(part.to_string(), Style::default().fg(Color::Cyan)),
                    ]));
                }
                lines.push(Line::from(""));
            }
            Role::Assistant => {
                lines.extend(render_markdown(&msg.content));
                lines.push(Line::from(""));
            }
        }
    }

    if let Some(in_flight) = &app.in_flight {
        if Some(in_flight.session_id.as_str()) == app.store.active_id() {
            if in_flight.buffer.is_empty() && in_flight.resolved.is_none() {
                lines.push(Line::from(Span::styled(
                    THINKING_INDICATOR,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            } else {
                // Partial output stays plain text until the exchange ends.
                for part in in_flight.buffer.lines() {
                    lines.push(Line::from(part.to_string()));
                }
            }
            lines.push(Line::from(""));
        }
    }

    lines
}

/// Sidebar rows as (title, preview) pairs, in registry order.
pub fn session_rows(app: &App) -> Vec<(String, String)> {
    app.store
        .sessions()
        .iter()
        .map(|s| (s.title.clone(), s.preview()))
        .collect()
}

pub fn active_index(app: &App) -> Option<usize> {
    let active = app.store.active_id()?;
    app.store.sessions().iter().position(|s| s.id == active)
}

pub fn max_scroll_offset(app: &App, viewport_height: u16) -> u16 {
    (transcript_lines(app).len() as u16).saturating_sub(viewport_height)
}

/// Transcript rows available once the input box and the title row are taken.
pub fn transcript_viewport_height(terminal_height: u16) -> u16 {
    terminal_height.saturating_sub(INPUT_HEIGHT).saturating_sub(1)
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = transcript_lines(app);
    let viewport = area.height.saturating_sub(1);
    let max_offset = (lines.len() as u16).saturating_sub(viewport);
    let offset = if app.ui.auto_scroll {
        max_offset
    } else {
        app.ui.scroll_offset.min(max_offset)
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Chinwag"))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(paragraph, area);
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = session_rows(app)
        .into_iter()
        .map(|(title, preview)| {
            ListItem::new(Text::from(vec![
                Line::from(Span::styled(
                    title,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(preview, Style::default().fg(Color::DarkGray))),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Chats (Ctrl+N new, Ctrl+X delete)"),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(active_index(app));
    f.render_stateful_widget(list, area, &mut state);
}
