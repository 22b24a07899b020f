use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders};
use tui_textarea::TextArea;

use crate::api::Reasoning;
use crate::core::config::ChatConfig;
use crate::core::exchange::ExchangeService;
use crate::core::store::SessionStore;

/// Terminal-side state: the input control and transcript scrolling.
pub struct UiState {
    pub input: TextArea<'static>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
}

impl UiState {
    pub fn new() -> Self {
        let mut ui = Self {
            input: TextArea::default(),
            scroll_offset: 0,
            auto_scroll: true,
        };
        ui.configure_input(false);
        ui
    }

    pub fn input_text(&self) -> String {
        self.input.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.input = TextArea::default();
        self.configure_input(false);
    }

    /// Lock or unlock the input control. While locked the event loop drops
    /// keystrokes destined for it, so the styling is the whole story.
    pub fn set_sending(&mut self, sending: bool) {
        self.configure_input(sending);
    }

    fn configure_input(&mut self, sending: bool) {
        let title = if sending {
            "Waiting for reply…"
        } else {
            "Message (Enter to send)"
        };
        let style = if sending {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        self.input
            .set_block(Block::default().borders(Borders::ALL).title(title));
        self.input.set_style(style);
        self.input.set_cursor_line_style(Style::default());
        self.input.set_placeholder_text("Type a message…");
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// The one exchange that may be outstanding, with its accumulator. The
/// session is remembered by id so the reply lands in the conversation that
/// started it, wherever the user has navigated since.
pub struct InFlightExchange {
    pub exchange_id: u64,
    pub session_id: String,
    /// Text accumulated from streamed lines, rendered plain while partial.
    pub buffer: String,
    /// Final text of a whole-document response.
    pub resolved: Option<String>,
    pub failed: bool,
}

pub struct App {
    pub store: SessionStore,
    pub ui: UiState,
    pub in_flight: Option<InFlightExchange>,
    pub(crate) service: ExchangeService,
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) reasoning: Option<Reasoning>,
    pub(crate) next_exchange_id: u64,
}

impl App {
    pub fn new(
        mut store: SessionStore,
        service: ExchangeService,
        client: reqwest::Client,
        config: &ChatConfig,
    ) -> Self {
        store.ensure_active();
        Self {
            store,
            ui: UiState::new(),
            in_flight: None,
            service,
            client,
            base_url: config.base_url.clone(),
            reasoning: config.reasoning(),
            next_exchange_id: 0,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }
}
