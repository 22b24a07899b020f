//! The interactive event loop: draw a frame, poll the keyboard, drain
//! events from the network task, repeat.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::core::app::App;
use crate::core::config::ChatConfig;
use crate::core::exchange::{ExchangeEvent, ExchangeService};
use crate::core::store::{default_store_path, SessionStore};
use crate::ui::renderer;

pub async fn run_chat(config: ChatConfig) -> Result<(), Box<dyn Error>> {
    let store = SessionStore::new(default_store_path());
    let (service, mut rx) = ExchangeService::new();
    let mut app = App::new(store, service, reqwest::Client::new(), &config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, &mut rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<(ExchangeEvent, u64)>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| renderer::draw(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let viewport = renderer::transcript_viewport_height(terminal.size()?.height);
                    if handle_key(app, key, viewport) {
                        return Ok(());
                    }
                }
            }
        }

        // Drain everything the network task produced before redrawing.
        let mut received_any = false;
        while let Ok((event, exchange_id)) = rx.try_recv() {
            app.apply_event(event, exchange_id);
            received_any = true;
        }
        if received_any {
            continue;
        }
    }
}

/// Returns true when the user asked to quit. While an exchange is in flight
/// only quitting, scrolling, and session navigation stay live; keystrokes
/// bound for the input control are dropped.
fn handle_key(app: &mut App, key: KeyEvent, viewport: u16) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => app.new_session(),
        KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.delete_current()
        }
        KeyCode::Up if key.modifiers.contains(KeyModifiers::ALT) => app.switch_prev(),
        KeyCode::Down if key.modifiers.contains(KeyModifiers::ALT) => app.switch_next(),
        KeyCode::Up => scroll_up(app, 1, viewport),
        KeyCode::Down => scroll_down(app, 1, viewport),
        KeyCode::PageUp => scroll_up(app, viewport.max(1), viewport),
        KeyCode::PageDown => scroll_down(app, viewport.max(1), viewport),
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            if !app.is_sending() {
                app.ui.input.insert_newline();
            }
        }
        KeyCode::Enter => {
            app.begin_send();
        }
        _ => {
            if !app.is_sending() {
                app.ui.input.input(key);
            }
        }
    }
    false
}

fn current_offset(app: &App, max: u16) -> u16 {
    if app.ui.auto_scroll {
        max
    } else {
        app.ui.scroll_offset.min(max)
    }
}

fn scroll_up(app: &mut App, amount: u16, viewport: u16) {
    let max = renderer::max_scroll_offset(app, viewport);
    app.ui.scroll_offset = current_offset(app, max).saturating_sub(amount);
    app.ui.auto_scroll = false;
}

fn scroll_down(app: &mut App, amount: u16, viewport: u16) {
    let max = renderer::max_scroll_offset(app, viewport);
    let next = current_offset(app, max).saturating_add(amount).min(max);
    app.ui.scroll_offset = next;
    if next >= max {
        app.ui.auto_scroll = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::SessionStore;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let (service, _rx) = ExchangeService::new();
        App::new(
            store,
            service,
            reqwest::Client::new(),
            &ChatConfig::default(),
        )
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_quits() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        assert!(handle_key(
            &mut app,
            key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            20
        ));
    }

    #[test]
    fn typing_reaches_the_input_when_idle() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key(&mut app, key(KeyCode::Char('h'), KeyModifiers::NONE), 20);
        handle_key(&mut app, key(KeyCode::Char('i'), KeyModifiers::NONE), 20);
        assert_eq!(app.ui.input_text(), "hi");
    }

    #[test]
    fn typing_is_dropped_while_sending() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.ui.input.insert_str("hi");
        app.prepare_send().unwrap();

        handle_key(&mut app, key(KeyCode::Char('x'), KeyModifiers::NONE), 20);
        assert_eq!(app.ui.input_text(), "");
    }

    #[test]
    fn ctrl_n_creates_a_session() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        handle_key(&mut app, key(KeyCode::Char('n'), KeyModifiers::CONTROL), 20);
        assert_eq!(app.store.sessions().len(), 2);
    }

    #[test]
    fn scrolling_up_disables_auto_scroll_and_bottom_restores_it() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        assert!(app.ui.auto_scroll);

        handle_key(&mut app, key(KeyCode::Up, KeyModifiers::NONE), 1);
        assert!(!app.ui.auto_scroll);

        handle_key(&mut app, key(KeyCode::PageDown, KeyModifiers::NONE), 1);
        assert!(app.ui.auto_scroll);
    }
}
